use sqlx::types::Json as SqlxJson;
use time::PrimitiveDateTime;

use crate::db::models::{ScoreSummary, TestSession};
use crate::db::types::SessionStatus;

pub(crate) const COLUMNS: &str = "\
    id, user_id, blueprint_slug, status, started_at, completed_at, current_index, seed, \
    score_summary";

pub(crate) struct CreateSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: Option<&'a str>,
    pub(crate) blueprint_slug: &'a str,
    pub(crate) seed: u32,
    pub(crate) started_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    session: CreateSession<'_>,
) -> Result<TestSession, sqlx::Error> {
    sqlx::query_as::<_, TestSession>(&format!(
        "INSERT INTO test_sessions (
            id, user_id, blueprint_slug, status, started_at, current_index, seed
         ) VALUES ($1,$2,$3,$4,$5,0,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(session.id)
    .bind(session.user_id)
    .bind(session.blueprint_slug)
    .bind(SessionStatus::InProgress)
    .bind(session.started_at)
    .bind(i64::from(session.seed))
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<TestSession>, sqlx::Error> {
    sqlx::query_as::<_, TestSession>(&format!("SELECT {COLUMNS} FROM test_sessions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn advance_progress(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE test_sessions SET current_index = current_index + 1 WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn complete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    summary: &ScoreSummary,
    completed_at: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE test_sessions
         SET status = $1,
             completed_at = $2,
             score_summary = $3
         WHERE id = $4",
    )
    .bind(SessionStatus::Completed)
    .bind(completed_at)
    .bind(SqlxJson(summary))
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
