use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{
    Question, QuestionOption, Response, ScoreSummary, Stimulus, TestBlueprint, TestSession,
};
use crate::db::types::{InputMode, Section, SessionStatus};
use crate::services::test_sessions::{BlueprintSummary, SessionDetail, SessionItem};

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct CreateSessionRequest {
    #[serde(default)]
    #[serde(alias = "blueprintSlug")]
    #[validate(length(min = 1, max = 100, message = "blueprint_slug must be 1-100 characters"))]
    pub(crate) blueprint_slug: Option<String>,
    #[serde(default)]
    #[serde(alias = "userId")]
    #[validate(length(min = 1, max = 128, message = "user_id must be 1-128 characters"))]
    pub(crate) user_id: Option<String>,
    #[serde(default)]
    pub(crate) seed: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateSessionResponse {
    pub(crate) session_id: String,
    pub(crate) seed: u32,
    pub(crate) total_items: usize,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitResponseRequest {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    pub(crate) answer: serde_json::Value,
    #[serde(default)]
    #[validate(length(max = 20000, message = "transcript is too long"))]
    pub(crate) transcript: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) user_id: Option<String>,
    pub(crate) blueprint_slug: String,
    pub(crate) status: SessionStatus,
    pub(crate) started_at: String,
    pub(crate) completed_at: Option<String>,
    pub(crate) current_index: i32,
    pub(crate) seed: i64,
    pub(crate) score_summary: Option<ScoreSummary>,
}

impl From<TestSession> for SessionResponse {
    fn from(session: TestSession) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id,
            blueprint_slug: session.blueprint_slug,
            status: session.status,
            started_at: format_primitive(session.started_at),
            completed_at: session.completed_at.map(format_primitive),
            current_index: session.current_index,
            seed: session.seed,
            score_summary: session.score_summary.map(|summary| summary.0),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BlankView {
    pub(crate) id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) choices: Option<Vec<String>>,
}

/// Candidate-facing question. Answer keys, blank answers and rubrics stay server-side.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) type_slug: String,
    pub(crate) section: Section,
    pub(crate) input_mode: InputMode,
    pub(crate) prompt: String,
    pub(crate) stem: Option<String>,
    pub(crate) stimulus: Option<Stimulus>,
    pub(crate) options: Vec<QuestionOption>,
    pub(crate) blanks: Vec<BlankView>,
    pub(crate) difficulty: String,
    pub(crate) tags: Vec<String>,
}

impl From<Question> for QuestionView {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            type_slug: question.type_slug,
            section: question.section,
            input_mode: question.input_mode,
            prompt: question.prompt,
            stem: question.stem,
            stimulus: question.stimulus.map(|stimulus| stimulus.0),
            options: question.options.0,
            blanks: question
                .blanks
                .0
                .into_iter()
                .map(|blank| BlankView { id: blank.id, choices: blank.choices })
                .collect(),
            difficulty: question.difficulty,
            tags: question.tags.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseView {
    pub(crate) question_id: String,
    pub(crate) answer: serde_json::Value,
    pub(crate) transcript: Option<String>,
    pub(crate) raw_score: f64,
    pub(crate) max_score: f64,
    pub(crate) trait_scores: BTreeMap<String, f64>,
    pub(crate) updated_at: String,
}

impl From<Response> for ResponseView {
    fn from(response: Response) -> Self {
        Self {
            question_id: response.question_id,
            answer: response.answer.0,
            transcript: response.transcript,
            raw_score: response.raw_score,
            max_score: response.max_score,
            trait_scores: response.trait_scores.0,
            updated_at: format_primitive(response.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionItemResponse {
    pub(crate) order_index: i32,
    pub(crate) time_limit_sec: i32,
    pub(crate) question: QuestionView,
    pub(crate) response: Option<ResponseView>,
}

impl From<SessionItem> for SessionItemResponse {
    fn from(item: SessionItem) -> Self {
        Self {
            order_index: item.order_index,
            time_limit_sec: item.time_limit_sec,
            question: item.question.into(),
            response: item.response.map(ResponseView::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionDetailResponse {
    pub(crate) session: SessionResponse,
    pub(crate) items: Vec<SessionItemResponse>,
}

impl From<SessionDetail> for SessionDetailResponse {
    fn from(detail: SessionDetail) -> Self {
        Self {
            session: detail.session.into(),
            items: detail.items.into_iter().map(SessionItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BlueprintResponse {
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) counts_by_type: BTreeMap<String, u32>,
    pub(crate) time_by_section_sec: BTreeMap<Section, u32>,
    pub(crate) total_items: i32,
    pub(crate) created_at: String,
}

impl From<TestBlueprint> for BlueprintResponse {
    fn from(blueprint: TestBlueprint) -> Self {
        Self {
            slug: blueprint.slug,
            name: blueprint.name,
            counts_by_type: blueprint.counts_by_type.0,
            time_by_section_sec: blueprint.time_by_section_sec.0,
            total_items: blueprint.total_items,
            created_at: format_primitive(blueprint.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BlueprintSummaryResponse {
    pub(crate) blueprint: BlueprintResponse,
    pub(crate) counts_by_section: BTreeMap<Section, u64>,
}

impl From<BlueprintSummary> for BlueprintSummaryResponse {
    fn from(summary: BlueprintSummary) -> Self {
        Self {
            blueprint: summary.blueprint.into(),
            counts_by_section: summary.counts_by_section,
        }
    }
}
