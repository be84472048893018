use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::types::Json;
use time::PrimitiveDateTime;
use tokio::sync::Mutex;

use crate::db::models::{
    Question, QuestionType, Response, ScoreSummary, TestBlueprint, TestItem, TestSession,
};
use crate::db::types::SessionStatus;
use crate::store::{
    ExamStore, NewTestSession, QuestionBank, ResponseUpsert, SeedOutcome, StoreResult,
    UpsertOutcome,
};

#[derive(Default)]
struct MemoryState {
    bank: QuestionBank,
    sessions: HashMap<String, TestSession>,
    items: Vec<TestItem>,
    responses: Vec<Response>,
}

/// In-process store for tests. Each call holds the lock for its whole duration.
#[derive(Default)]
pub(crate) struct MemoryExamStore {
    state: Mutex<MemoryState>,
}

impl MemoryExamStore {
    pub(crate) async fn response_count(&self, session_id: &str) -> usize {
        let state = self.state.lock().await;
        state.responses.iter().filter(|response| response.session_id == session_id).count()
    }
}

#[async_trait]
impl ExamStore for MemoryExamStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_blueprint(&self, slug: &str) -> StoreResult<Option<TestBlueprint>> {
        let state = self.state.lock().await;
        Ok(state.bank.blueprints.iter().find(|blueprint| blueprint.slug == slug).cloned())
    }

    async fn list_question_types(&self) -> StoreResult<Vec<QuestionType>> {
        Ok(self.state.lock().await.bank.question_types.clone())
    }

    async fn list_question_ids_by_type(&self, type_slug: &str) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        let mut pool: Vec<&Question> =
            state.bank.questions.iter().filter(|question| question.type_slug == type_slug).collect();
        pool.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(pool.into_iter().map(|question| question.id.clone()).collect())
    }

    async fn find_question(&self, id: &str) -> StoreResult<Option<Question>> {
        let state = self.state.lock().await;
        Ok(state.bank.questions.iter().find(|question| question.id == id).cloned())
    }

    async fn find_questions(&self, ids: &[String]) -> StoreResult<Vec<Question>> {
        let state = self.state.lock().await;
        Ok(state.bank.questions.iter().filter(|question| ids.contains(&question.id)).cloned().collect())
    }

    async fn create_session(
        &self,
        session: &NewTestSession,
        items: &[TestItem],
    ) -> StoreResult<TestSession> {
        let mut state = self.state.lock().await;
        let created = TestSession {
            id: session.id.clone(),
            user_id: session.user_id.clone(),
            blueprint_slug: session.blueprint_slug.clone(),
            status: SessionStatus::InProgress,
            started_at: session.started_at,
            completed_at: None,
            current_index: 0,
            seed: i64::from(session.seed),
            score_summary: None,
        };
        state.sessions.insert(created.id.clone(), created.clone());
        state.items.extend_from_slice(items);
        Ok(created)
    }

    async fn find_session(&self, id: &str) -> StoreResult<Option<TestSession>> {
        Ok(self.state.lock().await.sessions.get(id).cloned())
    }

    async fn list_items(&self, session_id: &str) -> StoreResult<Vec<TestItem>> {
        let state = self.state.lock().await;
        let mut items: Vec<TestItem> =
            state.items.iter().filter(|item| item.session_id == session_id).cloned().collect();
        items.sort_by_key(|item| item.order_index);
        Ok(items)
    }

    async fn list_responses(&self, session_id: &str) -> StoreResult<Vec<Response>> {
        let state = self.state.lock().await;
        Ok(state
            .responses
            .iter()
            .filter(|response| response.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn upsert_response(&self, response: &ResponseUpsert) -> StoreResult<UpsertOutcome> {
        let mut state = self.state.lock().await;
        let existing = state.responses.iter_mut().find(|row| {
            row.session_id == response.session_id && row.question_id == response.question_id
        });

        if let Some(row) = existing {
            row.answer = Json(response.answer.clone());
            row.transcript = response.transcript.clone();
            row.raw_score = response.raw_score;
            row.max_score = response.max_score;
            row.trait_scores = Json(response.trait_scores.clone());
            row.updated_at = response.now;
            return Ok(UpsertOutcome::Replaced);
        }

        state.responses.push(Response {
            id: response.id.clone(),
            session_id: response.session_id.clone(),
            question_id: response.question_id.clone(),
            answer: Json(response.answer.clone()),
            transcript: response.transcript.clone(),
            raw_score: response.raw_score,
            max_score: response.max_score,
            trait_scores: Json(response.trait_scores.clone()),
            created_at: response.now,
            updated_at: response.now,
        });
        if let Some(session) = state.sessions.get_mut(&response.session_id) {
            session.current_index += 1;
        }

        Ok(UpsertOutcome::Inserted)
    }

    async fn complete_session(
        &self,
        id: &str,
        summary: &ScoreSummary,
        completed_at: PrimitiveDateTime,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(id) else {
            return Ok(false);
        };
        session.status = SessionStatus::Completed;
        session.completed_at = Some(completed_at);
        session.score_summary = Some(Json(summary.clone()));
        Ok(true)
    }

    async fn seed_bank(&self, bank: &QuestionBank) -> StoreResult<SeedOutcome> {
        let mut state = self.state.lock().await;
        if !state.bank.question_types.is_empty() {
            return Ok(SeedOutcome::AlreadySeeded);
        }
        state.bank = bank.clone();
        Ok(SeedOutcome::Seeded)
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::core::time::primitive_now_utc;
    use crate::test_support::sample_bank;

    #[tokio::test]
    async fn question_pools_follow_creation_time_then_id() {
        let mut bank = sample_bank();
        let base = primitive_now_utc();
        for question in bank.questions.iter_mut().filter(|q| q.type_slug == "reading_mcq_single") {
            question.created_at = match question.id.as_str() {
                "rms-1" => base + Duration::seconds(5),
                _ => base,
            };
        }
        bank.questions.reverse();

        let store = MemoryExamStore::default();
        store.seed_bank(&bank).await.unwrap();

        let pool = store.list_question_ids_by_type("reading_mcq_single").await.unwrap();
        assert_eq!(pool, vec!["rms-2", "rms-3", "rms-1"]);
    }

    #[tokio::test]
    async fn completing_unknown_session_reports_no_match() {
        let store = MemoryExamStore::default();
        let summary = crate::services::aggregate::summarize(&[], &HashMap::new());

        let matched =
            store.complete_session("missing", &summary, primitive_now_utc()).await.unwrap();
        assert!(!matched);
    }
}
