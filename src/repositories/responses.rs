use std::collections::BTreeMap;

use sqlx::types::Json as SqlxJson;
use time::PrimitiveDateTime;

use crate::db::models::Response;

pub(crate) const COLUMNS: &str = "\
    id, session_id, question_id, answer, transcript, raw_score, max_score, trait_scores, \
    created_at, updated_at";

pub(crate) struct UpsertResponse<'a> {
    pub(crate) id: &'a str,
    pub(crate) session_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) answer: &'a serde_json::Value,
    pub(crate) transcript: Option<&'a str>,
    pub(crate) raw_score: f64,
    pub(crate) max_score: f64,
    pub(crate) trait_scores: &'a BTreeMap<String, f64>,
    pub(crate) now: PrimitiveDateTime,
}

/// Inserts or replaces the response for a (session, question) pair.
/// Returns `true` when a new row was inserted.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertResponse<'_>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO responses (
            id, session_id, question_id, answer, transcript, raw_score, max_score, trait_scores,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
         ON CONFLICT (session_id, question_id) DO UPDATE SET
            answer = EXCLUDED.answer,
            transcript = EXCLUDED.transcript,
            raw_score = EXCLUDED.raw_score,
            max_score = EXCLUDED.max_score,
            trait_scores = EXCLUDED.trait_scores,
            updated_at = EXCLUDED.updated_at
         RETURNING (xmax = 0) AS inserted",
    )
    .bind(params.id)
    .bind(params.session_id)
    .bind(params.question_id)
    .bind(SqlxJson(params.answer))
    .bind(params.transcript)
    .bind(params.raw_score)
    .bind(params.max_score)
    .bind(SqlxJson(params.trait_scores))
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_session(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<Vec<Response>, sqlx::Error> {
    sqlx::query_as::<_, Response>(&format!(
        "SELECT {COLUMNS}
         FROM responses
         WHERE session_id = $1
         ORDER BY created_at, id"
    ))
    .bind(session_id)
    .fetch_all(executor)
    .await
}
