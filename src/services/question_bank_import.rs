use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use sqlx::types::Json;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::core::time::primitive_now_utc;
use crate::db::models::{
    Blank, Category, CategoryWeight, CorrectAnswer, Question, QuestionOption, QuestionType,
    Rubric, ScoringHint, Stimulus, TestBlueprint,
};
use crate::db::types::{InputMode, Section};
use crate::store::{ExamStore, QuestionBank, SeedOutcome, StoreError};

#[derive(Debug, Error)]
pub(crate) enum ImportError {
    #[error("failed to read question bank {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("question bank json has invalid format: {0}")]
    Format(#[from] serde_json::Error),
    #[error("{0} slug is empty")]
    EmptySlug(&'static str),
    #[error("duplicate {kind} `{id}`")]
    Duplicate { kind: &'static str, id: String },
    #[error("question `{question}` references unknown type `{type_slug}`")]
    UnknownType { question: String, type_slug: String },
    #[error("question `{question}` is in section {found} but its type belongs to {expected}")]
    SectionMismatch { question: String, expected: &'static str, found: &'static str },
    #[error("blueprint `{blueprint}` has an item total outside 0..={max}", max = i32::MAX)]
    InvalidTotal { blueprint: String },
    #[error("question `{question}` has negative weight for category `{category}`")]
    NegativeWeight { question: String, category: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportSummary {
    pub(crate) outcome: SeedOutcome,
    pub(crate) categories: usize,
    pub(crate) question_types: usize,
    pub(crate) blueprints: usize,
    pub(crate) questions: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBank {
    #[serde(default)]
    categories: Vec<RawCategory>,
    #[serde(default)]
    question_types: Vec<RawQuestionType>,
    #[serde(default)]
    blueprints: Vec<RawBlueprint>,
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    slug: String,
    label: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScoring {
    method: String,
    #[serde(default)]
    partial_credit: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestionType {
    slug: String,
    name: String,
    section: Section,
    #[serde(default)]
    description: Option<String>,
    scoring: RawScoring,
    #[serde(default)]
    time_limit_sec: Option<i32>,
    #[serde(default)]
    traits: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlueprint {
    slug: String,
    name: String,
    counts_by_type: BTreeMap<String, u32>,
    #[serde(default)]
    time_by_section_sec: BTreeMap<Section, u32>,
    #[serde(default)]
    total_items: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStimulus {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    audio_url: Option<String>,
    #[serde(default)]
    transcript: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRubric {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    keypoints: Vec<String>,
    #[serde(default)]
    min_words: Option<u32>,
    #[serde(default)]
    max_words: Option<u32>,
    #[serde(default)]
    max_chars: Option<u32>,
    #[serde(default)]
    sample_answer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    id: String,
    type_slug: String,
    #[serde(default)]
    section: Option<Section>,
    input_mode: InputMode,
    prompt: String,
    #[serde(default)]
    stem: Option<String>,
    #[serde(default)]
    stimulus: Option<RawStimulus>,
    #[serde(default)]
    options: Vec<QuestionOption>,
    #[serde(default)]
    blanks: Vec<Blank>,
    #[serde(default)]
    correct_answer: Option<CorrectAnswer>,
    #[serde(default)]
    rubric: Option<RawRubric>,
    #[serde(default)]
    categories: Vec<CategoryWeight>,
    #[serde(default = "default_difficulty")]
    difficulty: String,
    #[serde(default)]
    tags: Vec<String>,
}

fn default_difficulty() -> String {
    "medium".to_string()
}

/// Reads a JSON question bank and loads it into an empty store.
pub(crate) async fn import_bank(
    store: &dyn ExamStore,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ImportError::Read { path: path.display().to_string(), source })?;
    let bank = parse_bank(&raw, primitive_now_utc())?;

    let outcome = store.seed_bank(&bank).await?;
    let summary = ImportSummary {
        outcome,
        categories: bank.categories.len(),
        question_types: bank.question_types.len(),
        blueprints: bank.blueprints.len(),
        questions: bank.questions.len(),
    };

    match outcome {
        SeedOutcome::Seeded => {
            metrics::counter!("question_bank_import_items_total")
                .increment(summary.questions as u64);
            tracing::info!(
                path = %path.display(),
                question_types = summary.question_types,
                blueprints = summary.blueprints,
                questions = summary.questions,
                "Question bank seeded"
            );
        }
        SeedOutcome::AlreadySeeded => {
            tracing::info!(path = %path.display(), "Question bank already seeded; skipping");
        }
    }

    Ok(summary)
}

/// Validates a bank document. Every row is stamped with the same creation time, so question
/// pools fall back to id order.
pub(crate) fn parse_bank(raw: &str, now: PrimitiveDateTime) -> Result<QuestionBank, ImportError> {
    let bank: RawBank = serde_json::from_str(raw)?;

    let mut seen = HashSet::new();
    let mut categories = Vec::with_capacity(bank.categories.len());
    for category in bank.categories {
        let slug = required_slug("category", &category.slug)?;
        ensure_unique(&mut seen, "category", slug)?;
        categories.push(Category {
            slug: slug.to_string(),
            label: category.label,
            description: category.description,
            created_at: now,
        });
    }

    let mut type_sections: HashMap<String, Section> = HashMap::new();
    let mut question_types = Vec::with_capacity(bank.question_types.len());
    for question_type in bank.question_types {
        let slug = required_slug("question type", &question_type.slug)?.to_string();
        if type_sections.insert(slug.clone(), question_type.section).is_some() {
            return Err(ImportError::Duplicate { kind: "question type", id: slug });
        }
        question_types.push(QuestionType {
            slug,
            name: question_type.name,
            section: question_type.section,
            description: question_type.description,
            scoring: Json(ScoringHint {
                method: question_type.scoring.method,
                partial_credit: question_type.scoring.partial_credit,
            }),
            time_limit_sec: question_type.time_limit_sec,
            traits: Json(question_type.traits),
            created_at: now,
        });
    }

    let mut seen = HashSet::new();
    let mut blueprints = Vec::with_capacity(bank.blueprints.len());
    for blueprint in bank.blueprints {
        let slug = required_slug("blueprint", &blueprint.slug)?;
        ensure_unique(&mut seen, "blueprint", slug)?;
        let total_items = match blueprint.total_items {
            Some(total) if total >= 0 => total,
            Some(_) => return Err(ImportError::InvalidTotal { blueprint: slug.to_string() }),
            None => sum_counts(&blueprint.counts_by_type)
                .ok_or_else(|| ImportError::InvalidTotal { blueprint: slug.to_string() })?,
        };
        blueprints.push(TestBlueprint {
            slug: slug.to_string(),
            name: blueprint.name,
            counts_by_type: Json(blueprint.counts_by_type),
            time_by_section_sec: Json(blueprint.time_by_section_sec),
            total_items,
            created_at: now,
        });
    }

    let mut seen = HashSet::new();
    let mut questions = Vec::with_capacity(bank.questions.len());
    for question in bank.questions {
        let id = required_slug("question", &question.id)?.to_string();
        ensure_unique(&mut seen, "question", &id)?;

        let Some(expected) = type_sections.get(&question.type_slug).copied() else {
            return Err(ImportError::UnknownType { question: id, type_slug: question.type_slug });
        };
        let section = question.section.unwrap_or(expected);
        if section != expected {
            return Err(ImportError::SectionMismatch {
                question: id,
                expected: expected.as_str(),
                found: section.as_str(),
            });
        }
        if let Some(category) = question.categories.iter().find(|category| category.weight < 0.0) {
            return Err(ImportError::NegativeWeight { question: id, category: category.slug.clone() });
        }

        questions.push(Question {
            id,
            type_slug: question.type_slug,
            section,
            input_mode: question.input_mode,
            prompt: question.prompt,
            stem: question.stem,
            stimulus: question.stimulus.map(|stimulus| {
                Json(Stimulus {
                    text: stimulus.text,
                    image_url: stimulus.image_url,
                    audio_url: stimulus.audio_url,
                    transcript: stimulus.transcript,
                })
            }),
            options: Json(question.options),
            blanks: Json(question.blanks),
            correct_answer: question.correct_answer.map(Json),
            rubric: question.rubric.map(|rubric| {
                Json(Rubric {
                    keywords: rubric.keywords,
                    keypoints: rubric.keypoints,
                    min_words: rubric.min_words,
                    max_words: rubric.max_words,
                    max_chars: rubric.max_chars,
                    sample_answer: rubric.sample_answer,
                })
            }),
            categories: Json(question.categories),
            difficulty: question.difficulty,
            tags: Json(question.tags),
            created_at: now,
        });
    }

    Ok(QuestionBank { categories, question_types, blueprints, questions })
}

fn sum_counts(counts_by_type: &BTreeMap<String, u32>) -> Option<i32> {
    let total = counts_by_type
        .values()
        .try_fold(0u64, |total, count| total.checked_add(u64::from(*count)))?;
    i32::try_from(total).ok()
}

fn required_slug<'a>(kind: &'static str, raw: &'a str) -> Result<&'a str, ImportError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ImportError::EmptySlug(kind));
    }
    Ok(trimmed)
}

fn ensure_unique(
    seen: &mut HashSet<String>,
    kind: &'static str,
    id: &str,
) -> Result<(), ImportError> {
    if !seen.insert(id.to_string()) {
        return Err(ImportError::Duplicate { kind, id: id.to_string() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;
    use crate::store::memory::MemoryExamStore;

    fn bank_json() -> serde_json::Value {
        json!({
            "categories": [
                { "slug": "reading_comprehension", "label": "Reading Comprehension" },
                { "slug": "vocabulary", "label": "Vocabulary" }
            ],
            "questionTypes": [
                {
                    "slug": "reading_mcq_single",
                    "name": "Multiple Choice, Single Answer",
                    "section": "reading",
                    "scoring": { "method": "exact", "partialCredit": false },
                    "traits": ["content"]
                },
                {
                    "slug": "write_email",
                    "name": "Write Email",
                    "section": "speaking_writing",
                    "scoring": { "method": "rubric", "partialCredit": true },
                    "timeLimitSec": 540
                }
            ],
            "blueprints": [
                {
                    "slug": "pte-core-mini",
                    "name": "PTE Core mini",
                    "countsByType": { "reading_mcq_single": 2, "write_email": 1 },
                    "timeBySectionSec": { "reading": 600 }
                }
            ],
            "questions": [
                {
                    "id": "rms-1",
                    "typeSlug": "reading_mcq_single",
                    "inputMode": "mcq_single",
                    "prompt": "Choose the best answer.",
                    "stimulus": { "text": "A short passage.", "imageUrl": null },
                    "options": [{ "id": "a", "text": "One" }, { "id": "b", "text": "Two" }],
                    "correctAnswer": "b",
                    "categories": [{ "slug": "reading_comprehension", "weight": 1.0 }]
                },
                {
                    "id": "we-1",
                    "typeSlug": "write_email",
                    "section": "speaking_writing",
                    "inputMode": "long_text",
                    "prompt": "Write to your landlord.",
                    "rubric": { "keywords": ["repair"], "minWords": 50, "maxWords": 120 },
                    "categories": [{ "slug": "vocabulary", "weight": 0.5 }],
                    "difficulty": "hard",
                    "tags": ["email"]
                }
            ]
        })
    }

    #[test]
    fn parse_bank_maps_documents() {
        let bank = parse_bank(&bank_json().to_string(), primitive_now_utc()).unwrap();

        assert_eq!(bank.categories.len(), 2);
        assert_eq!(bank.question_types[1].time_limit_sec, Some(540));
        assert!(bank.question_types[1].scoring.0.partial_credit);
        assert_eq!(bank.blueprints[0].total_items, 3);
        assert_eq!(bank.blueprints[0].time_by_section_sec.0[&Section::Reading], 600);

        let mcq = &bank.questions[0];
        assert_eq!(mcq.section, Section::Reading);
        assert_eq!(mcq.difficulty, "medium");
        assert_eq!(mcq.correct_answer.as_ref().map(|value| value.0.clone()), Some(CorrectAnswer::Text("b".into())));

        let email = &bank.questions[1];
        let rubric = email.rubric.as_ref().unwrap();
        assert_eq!(rubric.0.min_words, Some(50));
        assert_eq!(rubric.0.max_words, Some(120));
        assert_eq!(email.tags.0, vec!["email".to_string()]);
    }

    #[test]
    fn question_with_unknown_type_is_rejected() {
        let mut document = bank_json();
        document["questions"][0]["typeSlug"] = json!("essay_marathon");

        let err = parse_bank(&document.to_string(), primitive_now_utc()).unwrap_err();
        assert!(matches!(err, ImportError::UnknownType { ref type_slug, .. } if type_slug == "essay_marathon"));
    }

    #[test]
    fn question_section_must_match_type() {
        let mut document = bank_json();
        document["questions"][0]["section"] = json!("listening");

        let err = parse_bank(&document.to_string(), primitive_now_utc()).unwrap_err();
        assert!(matches!(err, ImportError::SectionMismatch { expected: "reading", found: "listening", .. }));
    }

    #[test]
    fn negative_weight_and_duplicates_are_rejected() {
        let mut document = bank_json();
        document["questions"][1]["categories"][0]["weight"] = json!(-1.0);
        let err = parse_bank(&document.to_string(), primitive_now_utc()).unwrap_err();
        assert!(matches!(err, ImportError::NegativeWeight { .. }));

        let mut document = bank_json();
        document["questions"][1]["id"] = json!("rms-1");
        let err = parse_bank(&document.to_string(), primitive_now_utc()).unwrap_err();
        assert!(matches!(err, ImportError::Duplicate { kind: "question", .. }));

        let mut document = bank_json();
        document["blueprints"][0]["slug"] = json!("  ");
        let err = parse_bank(&document.to_string(), primitive_now_utc()).unwrap_err();
        assert!(matches!(err, ImportError::EmptySlug("blueprint")));
    }

    #[test]
    fn blueprint_total_defaults_to_sum_of_counts() {
        let bank = parse_bank(&bank_json().to_string(), primitive_now_utc()).unwrap();
        let expected: u32 = bank.blueprints[0].counts_by_type.0.values().sum();
        assert_eq!(bank.blueprints[0].total_items, expected as i32);
    }

    #[test]
    fn oversized_blueprint_counts_are_rejected() {
        let mut document = bank_json();
        document["blueprints"][0]["countsByType"] =
            json!({ "read_aloud": 4294967295u32, "repeat_sentence": 1 });
        let err = parse_bank(&document.to_string(), primitive_now_utc()).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidTotal { ref blueprint } if blueprint == "pte-core-mini"
        ));

        document["blueprints"][0]["countsByType"] = json!({ "read_aloud": 3000000000u32 });
        let err = parse_bank(&document.to_string(), primitive_now_utc()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidTotal { .. }));
        assert!(err.to_string().contains("pte-core-mini"));
    }

    #[test]
    fn negative_blueprint_total_is_rejected() {
        let mut document = bank_json();
        document["blueprints"][0]["totalItems"] = json!(-1);
        let err = parse_bank(&document.to_string(), primitive_now_utc()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidTotal { .. }));
    }

    #[tokio::test]
    async fn import_bank_seeds_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bank_json().to_string().as_bytes()).unwrap();
        let store = MemoryExamStore::default();

        let first = import_bank(&store, file.path()).await.unwrap();
        assert_eq!(first.outcome, SeedOutcome::Seeded);
        assert_eq!(first.questions, 2);
        assert!(store.find_blueprint("pte-core-mini").await.unwrap().is_some());
        assert_eq!(store.list_question_ids_by_type("reading_mcq_single").await.unwrap(), vec!["rms-1"]);

        let second = import_bank(&store, file.path()).await.unwrap();
        assert_eq!(second.outcome, SeedOutcome::AlreadySeeded);
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let store = MemoryExamStore::default();
        let err = import_bank(&store, Path::new("/nonexistent/bank.json")).await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/bank.json"));
    }

    #[test]
    fn bundled_bank_covers_every_question_type() {
        let raw = include_str!("../../data/pte_core_question_bank.json");
        let bank = parse_bank(raw, primitive_now_utc()).unwrap();

        for slug in crate::services::sampler::QUESTION_TYPE_ORDER {
            assert!(bank.question_types.iter().any(|t| t.slug == slug), "missing type {slug}");
            assert!(bank.questions.iter().any(|q| q.type_slug == slug), "no questions for {slug}");
        }
        let full = bank.blueprints.iter().find(|b| b.slug == "pte-core-full").unwrap();
        assert_eq!(full.total_items, 24);
    }
}
