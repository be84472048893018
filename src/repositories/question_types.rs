use sqlx::types::Json as SqlxJson;

use crate::db::models::{Category, QuestionType};

pub(crate) const COLUMNS: &str =
    "slug, name, section, description, scoring, time_limit_sec, traits, created_at";

pub(crate) async fn list_all(
    executor: impl sqlx::PgExecutor<'_>,
) -> Result<Vec<QuestionType>, sqlx::Error> {
    sqlx::query_as::<_, QuestionType>(&format!("SELECT {COLUMNS} FROM question_types ORDER BY slug"))
        .fetch_all(executor)
        .await
}

pub(crate) async fn exists_any(executor: impl sqlx::PgExecutor<'_>) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM question_types)").fetch_one(executor).await
}

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    question_type: &QuestionType,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO question_types (
            slug, name, section, description, scoring, time_limit_sec, traits, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
    )
    .bind(&question_type.slug)
    .bind(&question_type.name)
    .bind(question_type.section)
    .bind(&question_type.description)
    .bind(SqlxJson(&question_type.scoring.0))
    .bind(question_type.time_limit_sec)
    .bind(SqlxJson(&question_type.traits.0))
    .bind(question_type.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn insert_category(
    executor: impl sqlx::PgExecutor<'_>,
    category: &Category,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO categories (slug, label, description, created_at)
         VALUES ($1,$2,$3,$4)",
    )
    .bind(&category.slug)
    .bind(&category.label)
    .bind(&category.description)
    .bind(category.created_at)
    .execute(executor)
    .await?;
    Ok(())
}
