use sqlx::types::Json as SqlxJson;

use crate::db::models::Question;

pub(crate) const COLUMNS: &str = "\
    id, type_slug, section, input_mode, prompt, stem, stimulus, options, blanks, \
    correct_answer, rubric, categories, difficulty, tags, created_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_by_ids(
    executor: impl sqlx::PgExecutor<'_>,
    ids: &[String],
) -> Result<Vec<Question>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(executor)
        .await
}

/// Candidate pool for one question type, in authoring order.
pub(crate) async fn list_ids_by_type(
    executor: impl sqlx::PgExecutor<'_>,
    type_slug: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT id
         FROM questions
         WHERE type_slug = $1
         ORDER BY created_at, id",
    )
    .bind(type_slug)
    .fetch_all(executor)
    .await
}

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    question: &Question,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO questions (
            id, type_slug, section, input_mode, prompt, stem, stimulus, options, blanks,
            correct_answer, rubric, categories, difficulty, tags, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)",
    )
    .bind(&question.id)
    .bind(&question.type_slug)
    .bind(question.section)
    .bind(question.input_mode)
    .bind(&question.prompt)
    .bind(&question.stem)
    .bind(question.stimulus.as_ref().map(|value| SqlxJson(&value.0)))
    .bind(SqlxJson(&question.options.0))
    .bind(SqlxJson(&question.blanks.0))
    .bind(question.correct_answer.as_ref().map(|value| SqlxJson(&value.0)))
    .bind(question.rubric.as_ref().map(|value| SqlxJson(&value.0)))
    .bind(SqlxJson(&question.categories.0))
    .bind(&question.difficulty)
    .bind(SqlxJson(&question.tags.0))
    .bind(question.created_at)
    .execute(executor)
    .await?;
    Ok(())
}
