//! Storage boundary for the session engine.
//!
//! Every method is one unit of work: implementations must apply each call atomically,
//! so the engine never observes a half-created session or a response without its
//! progress update.

#[cfg(test)]
pub(crate) mod memory;
pub(crate) mod postgres;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::{
    Category, Question, QuestionType, Response, ScoreSummary, TestBlueprint, TestItem, TestSession,
};

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub(crate) struct NewTestSession {
    pub(crate) id: String,
    pub(crate) user_id: Option<String>,
    pub(crate) blueprint_slug: String,
    pub(crate) seed: u32,
    pub(crate) started_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct ResponseUpsert {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) question_id: String,
    pub(crate) answer: serde_json::Value,
    pub(crate) transcript: Option<String>,
    pub(crate) raw_score: f64,
    pub(crate) max_score: f64,
    pub(crate) trait_scores: BTreeMap<String, f64>,
    pub(crate) now: PrimitiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpsertOutcome {
    Inserted,
    Replaced,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct QuestionBank {
    pub(crate) categories: Vec<Category>,
    pub(crate) question_types: Vec<QuestionType>,
    pub(crate) blueprints: Vec<TestBlueprint>,
    pub(crate) questions: Vec<Question>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeedOutcome {
    Seeded,
    AlreadySeeded,
}

#[async_trait]
pub(crate) trait ExamStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn find_blueprint(&self, slug: &str) -> StoreResult<Option<TestBlueprint>>;

    async fn list_question_types(&self) -> StoreResult<Vec<QuestionType>>;

    /// Question ids of one type, in a stable authoring order.
    async fn list_question_ids_by_type(&self, type_slug: &str) -> StoreResult<Vec<String>>;

    async fn find_question(&self, id: &str) -> StoreResult<Option<Question>>;

    async fn find_questions(&self, ids: &[String]) -> StoreResult<Vec<Question>>;

    /// Persists the session together with its full ordered item list.
    async fn create_session(
        &self,
        session: &NewTestSession,
        items: &[TestItem],
    ) -> StoreResult<TestSession>;

    async fn find_session(&self, id: &str) -> StoreResult<Option<TestSession>>;

    async fn list_items(&self, session_id: &str) -> StoreResult<Vec<TestItem>>;

    async fn list_responses(&self, session_id: &str) -> StoreResult<Vec<Response>>;

    /// Inserts or replaces the response keyed by (session, question). Progress on the
    /// session advances only when a new row is inserted.
    async fn upsert_response(&self, response: &ResponseUpsert) -> StoreResult<UpsertOutcome>;

    /// Returns `false` when no session with `id` exists.
    async fn complete_session(
        &self,
        id: &str,
        summary: &ScoreSummary,
        completed_at: PrimitiveDateTime,
    ) -> StoreResult<bool>;

    /// Loads reference data unless any question type already exists.
    async fn seed_bank(&self, bank: &QuestionBank) -> StoreResult<SeedOutcome>;
}
