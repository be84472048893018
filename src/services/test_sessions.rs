use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::{Question, Response, ScoreSummary, TestBlueprint, TestItem, TestSession};
use crate::db::types::Section;
use crate::services::{aggregate, sampler, scoring};
use crate::store::{ExamStore, NewTestSession, ResponseUpsert, StoreError, UpsertOutcome};

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub(crate) type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone)]
pub(crate) struct CreateSessionParams<'a> {
    pub(crate) blueprint_slug: &'a str,
    pub(crate) user_id: Option<&'a str>,
    pub(crate) seed: Option<u32>,
    pub(crate) default_time_limit_sec: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CreatedSession {
    pub(crate) session_id: String,
    pub(crate) seed: u32,
    pub(crate) total_items: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionItem {
    pub(crate) order_index: i32,
    pub(crate) time_limit_sec: i32,
    pub(crate) question: Question,
    pub(crate) response: Option<Response>,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionDetail {
    pub(crate) session: TestSession,
    pub(crate) items: Vec<SessionItem>,
}

#[derive(Debug, Clone)]
pub(crate) struct SubmitParams<'a> {
    pub(crate) session_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) answer: serde_json::Value,
    pub(crate) transcript: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct BlueprintSummary {
    pub(crate) blueprint: TestBlueprint,
    pub(crate) counts_by_section: BTreeMap<Section, u64>,
}

/// Samples a fresh session from a blueprint and persists it with its ordered items.
pub(crate) async fn create_session(
    store: &dyn ExamStore,
    params: CreateSessionParams<'_>,
) -> SessionResult<CreatedSession> {
    let blueprint = store
        .find_blueprint(params.blueprint_slug)
        .await?
        .ok_or(SessionError::NotFound("blueprint"))?;

    let unknown = sampler::unknown_type_slugs(&blueprint.counts_by_type.0);
    if !unknown.is_empty() {
        tracing::warn!(
            blueprint = %blueprint.slug,
            unknown = ?unknown,
            "Blueprint lists question types outside the canonical order"
        );
    }

    let time_limits: HashMap<String, i32> = store
        .list_question_types()
        .await?
        .into_iter()
        .map(|question_type| {
            let limit = question_type.time_limit_sec.unwrap_or(params.default_time_limit_sec);
            (question_type.slug, limit)
        })
        .collect();

    let mut pools = HashMap::new();
    for type_slug in sampler::QUESTION_TYPE_ORDER {
        let count = blueprint.counts_by_type.0.get(type_slug).copied().unwrap_or(0);
        if count == 0 {
            continue;
        }
        let pool = store.list_question_ids_by_type(type_slug).await?;
        if (pool.len() as u64) < u64::from(count) {
            tracing::debug!(type_slug, available = pool.len(), requested = count, "Small pool");
        }
        pools.insert(type_slug.to_string(), pool);
    }

    let seed = params.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let picks = sampler::assemble(&blueprint.counts_by_type.0, &pools, seed);

    let session_id = Uuid::new_v4().to_string();
    let items: Vec<TestItem> = picks
        .into_iter()
        .enumerate()
        .map(|(order_index, pick)| TestItem {
            session_id: session_id.clone(),
            time_limit_sec: time_limits
                .get(pick.type_slug)
                .copied()
                .unwrap_or(params.default_time_limit_sec),
            question_id: pick.question_id,
            order_index: order_index as i32,
        })
        .collect();

    if (items.len() as i64) < i64::from(blueprint.total_items) {
        tracing::warn!(
            blueprint = %blueprint.slug,
            expected = blueprint.total_items,
            sampled = items.len(),
            "Session is shorter than its blueprint"
        );
    }

    store
        .create_session(
            &NewTestSession {
                id: session_id.clone(),
                user_id: params.user_id.map(str::to_string),
                blueprint_slug: blueprint.slug.clone(),
                seed,
                started_at: primitive_now_utc(),
            },
            &items,
        )
        .await?;

    metrics::counter!("test_sessions_created_total").increment(1);
    tracing::info!(
        session_id = %session_id,
        blueprint = %blueprint.slug,
        seed,
        total_items = items.len(),
        "Test session created"
    );

    Ok(CreatedSession { session_id, seed, total_items: items.len() })
}

pub(crate) async fn session_detail(
    store: &dyn ExamStore,
    session_id: &str,
) -> SessionResult<Option<SessionDetail>> {
    let Some(session) = store.find_session(session_id).await? else {
        return Ok(None);
    };

    let items = store.list_items(session_id).await?;
    let ids: Vec<String> = items.iter().map(|item| item.question_id.clone()).collect();
    let questions = index_questions(store.find_questions(&ids).await?);
    let responses: HashMap<String, Response> = store
        .list_responses(session_id)
        .await?
        .into_iter()
        .map(|response| (response.question_id.clone(), response))
        .collect();

    let mut detail_items = Vec::with_capacity(items.len());
    for item in items {
        let Some(question) = questions.get(&item.question_id) else {
            tracing::warn!(session_id, question_id = %item.question_id, "Item question is missing");
            continue;
        };
        // A question drawn twice shares one response row.
        let response = responses.get(&item.question_id).cloned();
        detail_items.push(SessionItem {
            order_index: item.order_index,
            time_limit_sec: item.time_limit_sec,
            question: question.clone(),
            response,
        });
    }

    Ok(Some(SessionDetail { session, items: detail_items }))
}

/// Scores and records one answer. Resubmitting a question replaces the earlier response.
pub(crate) async fn submit_response(
    store: &dyn ExamStore,
    params: SubmitParams<'_>,
) -> SessionResult<scoring::ScoreOutcome> {
    store.find_session(params.session_id).await?.ok_or(SessionError::NotFound("session"))?;
    let question = store
        .find_question(params.question_id)
        .await?
        .ok_or(SessionError::NotFound("question"))?;

    let outcome =
        scoring::score_response(&question, &params.answer, params.transcript.as_deref());

    let upsert = store
        .upsert_response(&ResponseUpsert {
            id: Uuid::new_v4().to_string(),
            session_id: params.session_id.to_string(),
            question_id: question.id.clone(),
            answer: params.answer,
            transcript: params.transcript,
            raw_score: outcome.raw_score,
            max_score: outcome.max_score,
            trait_scores: outcome.trait_scores.clone(),
            now: primitive_now_utc(),
        })
        .await?;

    metrics::counter!(
        "test_responses_submitted_total",
        "input_mode" => question.input_mode.as_str()
    )
    .increment(1);
    tracing::info!(
        session_id = params.session_id,
        question_id = %question.id,
        raw_score = outcome.raw_score,
        max_score = outcome.max_score,
        resubmitted = upsert == UpsertOutcome::Replaced,
        "Response scored"
    );

    Ok(outcome)
}

/// Aggregates every response and marks the session completed. Finishing again recomputes.
pub(crate) async fn finish_session(
    store: &dyn ExamStore,
    session_id: &str,
) -> SessionResult<ScoreSummary> {
    store.find_session(session_id).await?.ok_or(SessionError::NotFound("session"))?;

    let responses = store.list_responses(session_id).await?;
    let ids: Vec<String> = responses.iter().map(|response| response.question_id.clone()).collect();
    let questions = index_questions(store.find_questions(&ids).await?);

    let summary = aggregate::summarize(&responses, &questions);
    if !store.complete_session(session_id, &summary, primitive_now_utc()).await? {
        return Err(SessionError::NotFound("session"));
    }

    metrics::counter!("test_sessions_finished_total").increment(1);
    tracing::info!(
        session_id,
        responses = responses.len(),
        overall = summary.overall.score,
        "Test session finished"
    );

    Ok(summary)
}

pub(crate) async fn blueprint_summary(
    store: &dyn ExamStore,
    slug: &str,
) -> SessionResult<Option<BlueprintSummary>> {
    let Some(blueprint) = store.find_blueprint(slug).await? else {
        return Ok(None);
    };

    let sections: HashMap<String, Section> = store
        .list_question_types()
        .await?
        .into_iter()
        .map(|question_type| (question_type.slug, question_type.section))
        .collect();

    let mut counts_by_section: BTreeMap<Section, u64> =
        Section::ALL.iter().map(|section| (*section, 0)).collect();
    for (type_slug, count) in blueprint.counts_by_type.0.iter() {
        if let Some(section) = sections.get(type_slug) {
            let total = counts_by_section.entry(*section).or_default();
            *total = total.saturating_add(u64::from(*count));
        }
    }

    Ok(Some(BlueprintSummary { blueprint, counts_by_section }))
}

fn index_questions(questions: Vec<Question>) -> HashMap<String, Question> {
    questions.into_iter().map(|question| (question.id.clone(), question)).collect()
}
