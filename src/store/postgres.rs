use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{
    Question, QuestionType, Response, ScoreSummary, TestBlueprint, TestItem, TestSession,
};
use crate::repositories;
use crate::store::{
    ExamStore, NewTestSession, QuestionBank, ResponseUpsert, SeedOutcome, StoreResult,
    UpsertOutcome,
};

#[derive(Clone)]
pub(crate) struct PgExamStore {
    pool: PgPool,
}

impl PgExamStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExamStore for PgExamStore {
    async fn ping(&self) -> StoreResult<()> {
        repositories::health::ping(&self.pool).await?;
        Ok(())
    }

    async fn find_blueprint(&self, slug: &str) -> StoreResult<Option<TestBlueprint>> {
        Ok(repositories::blueprints::find_by_slug(&self.pool, slug).await?)
    }

    async fn list_question_types(&self) -> StoreResult<Vec<QuestionType>> {
        Ok(repositories::question_types::list_all(&self.pool).await?)
    }

    async fn list_question_ids_by_type(&self, type_slug: &str) -> StoreResult<Vec<String>> {
        Ok(repositories::questions::list_ids_by_type(&self.pool, type_slug).await?)
    }

    async fn find_question(&self, id: &str) -> StoreResult<Option<Question>> {
        Ok(repositories::questions::find_by_id(&self.pool, id).await?)
    }

    async fn find_questions(&self, ids: &[String]) -> StoreResult<Vec<Question>> {
        Ok(repositories::questions::find_by_ids(&self.pool, ids).await?)
    }

    async fn create_session(
        &self,
        session: &NewTestSession,
        items: &[TestItem],
    ) -> StoreResult<TestSession> {
        let mut tx = self.pool.begin().await?;
        let created = repositories::sessions::create(
            &mut *tx,
            repositories::sessions::CreateSession {
                id: &session.id,
                user_id: session.user_id.as_deref(),
                blueprint_slug: &session.blueprint_slug,
                seed: session.seed,
                started_at: session.started_at,
            },
        )
        .await?;
        repositories::test_items::insert_items(&mut tx, items).await?;
        tx.commit().await?;

        Ok(created)
    }

    async fn find_session(&self, id: &str) -> StoreResult<Option<TestSession>> {
        Ok(repositories::sessions::find_by_id(&self.pool, id).await?)
    }

    async fn list_items(&self, session_id: &str) -> StoreResult<Vec<TestItem>> {
        Ok(repositories::test_items::list_by_session(&self.pool, session_id).await?)
    }

    async fn list_responses(&self, session_id: &str) -> StoreResult<Vec<Response>> {
        Ok(repositories::responses::list_by_session(&self.pool, session_id).await?)
    }

    async fn upsert_response(&self, response: &ResponseUpsert) -> StoreResult<UpsertOutcome> {
        let mut tx = self.pool.begin().await?;
        let inserted = repositories::responses::upsert(
            &mut *tx,
            repositories::responses::UpsertResponse {
                id: &response.id,
                session_id: &response.session_id,
                question_id: &response.question_id,
                answer: &response.answer,
                transcript: response.transcript.as_deref(),
                raw_score: response.raw_score,
                max_score: response.max_score,
                trait_scores: &response.trait_scores,
                now: response.now,
            },
        )
        .await?;

        if inserted {
            repositories::sessions::advance_progress(&mut *tx, &response.session_id).await?;
        }
        tx.commit().await?;

        Ok(if inserted { UpsertOutcome::Inserted } else { UpsertOutcome::Replaced })
    }

    async fn complete_session(
        &self,
        id: &str,
        summary: &ScoreSummary,
        completed_at: PrimitiveDateTime,
    ) -> StoreResult<bool> {
        Ok(repositories::sessions::complete(&self.pool, id, summary, completed_at).await?)
    }

    async fn seed_bank(&self, bank: &QuestionBank) -> StoreResult<SeedOutcome> {
        let mut tx = self.pool.begin().await?;
        if repositories::question_types::exists_any(&mut *tx).await? {
            return Ok(SeedOutcome::AlreadySeeded);
        }

        for category in &bank.categories {
            repositories::question_types::insert_category(&mut *tx, category).await?;
        }
        for question_type in &bank.question_types {
            repositories::question_types::insert(&mut *tx, question_type).await?;
        }
        for blueprint in &bank.blueprints {
            repositories::blueprints::insert(&mut *tx, blueprint).await?;
        }
        for question in &bank.questions {
            repositories::questions::insert(&mut *tx, question).await?;
        }
        tx.commit().await?;

        Ok(SeedOutcome::Seeded)
    }
}
