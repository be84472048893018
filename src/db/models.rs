use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{InputMode, Section, SessionStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Category {
    pub(crate) slug: String,
    pub(crate) label: String,
    pub(crate) description: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScoringHint {
    pub(crate) method: String,
    #[serde(default)]
    pub(crate) partial_credit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionType {
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) section: Section,
    pub(crate) description: Option<String>,
    pub(crate) scoring: Json<ScoringHint>,
    pub(crate) time_limit_sec: Option<i32>,
    pub(crate) traits: Json<Vec<String>>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Stimulus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) transcript: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct QuestionOption {
    pub(crate) id: String,
    pub(crate) text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Blank {
    pub(crate) id: String,
    pub(crate) answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) choices: Option<Vec<String>>,
}

/// Canonical answer key. Which shape is meaningful depends on the question's input mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum CorrectAnswer {
    Text(String),
    Choices(Vec<String>),
    Indices(Vec<u32>),
}

impl CorrectAnswer {
    pub(crate) fn as_text(&self) -> Option<&str> {
        match self {
            CorrectAnswer::Text(value) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn ids(&self) -> &[String] {
        match self {
            CorrectAnswer::Choices(values) => values,
            _ => &[],
        }
    }

    pub(crate) fn indices(&self) -> &[u32] {
        match self {
            CorrectAnswer::Indices(values) => values,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Rubric {
    #[serde(default)]
    pub(crate) keywords: Vec<String>,
    #[serde(default)]
    pub(crate) keypoints: Vec<String>,
    #[serde(default)]
    pub(crate) min_words: Option<u32>,
    #[serde(default)]
    pub(crate) max_words: Option<u32>,
    #[serde(default)]
    pub(crate) max_chars: Option<u32>,
    #[serde(default)]
    pub(crate) sample_answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CategoryWeight {
    pub(crate) slug: String,
    pub(crate) weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) type_slug: String,
    pub(crate) section: Section,
    pub(crate) input_mode: InputMode,
    pub(crate) prompt: String,
    pub(crate) stem: Option<String>,
    pub(crate) stimulus: Option<Json<Stimulus>>,
    pub(crate) options: Json<Vec<QuestionOption>>,
    pub(crate) blanks: Json<Vec<Blank>>,
    pub(crate) correct_answer: Option<Json<CorrectAnswer>>,
    pub(crate) rubric: Option<Json<Rubric>>,
    pub(crate) categories: Json<Vec<CategoryWeight>>,
    pub(crate) difficulty: String,
    pub(crate) tags: Json<Vec<String>>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TestBlueprint {
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) counts_by_type: Json<BTreeMap<String, u32>>,
    pub(crate) time_by_section_sec: Json<BTreeMap<Section, u32>>,
    pub(crate) total_items: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TestSession {
    pub(crate) id: String,
    pub(crate) user_id: Option<String>,
    pub(crate) blueprint_slug: String,
    pub(crate) status: SessionStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) current_index: i32,
    pub(crate) seed: i64,
    pub(crate) score_summary: Option<Json<ScoreSummary>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TestItem {
    pub(crate) session_id: String,
    pub(crate) question_id: String,
    pub(crate) order_index: i32,
    pub(crate) time_limit_sec: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Response {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) question_id: String,
    pub(crate) answer: Json<serde_json::Value>,
    pub(crate) transcript: Option<String>,
    pub(crate) raw_score: f64,
    pub(crate) max_score: f64,
    pub(crate) trait_scores: Json<BTreeMap<String, f64>>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScoreBand {
    pub(crate) score: i32,
    pub(crate) raw: f64,
    pub(crate) max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CategoryScore {
    pub(crate) slug: String,
    pub(crate) score: i32,
    pub(crate) raw: f64,
    pub(crate) max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScoreSummary {
    pub(crate) overall: ScoreBand,
    pub(crate) sections: BTreeMap<Section, ScoreBand>,
    pub(crate) categories: Vec<CategoryScore>,
}
