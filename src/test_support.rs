use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api;
use crate::core::{config::Settings, state::AppState, time::primitive_now_utc};
use crate::db::models::{
    Category, CategoryWeight, CorrectAnswer, Question, QuestionOption, QuestionType, ScoringHint,
    Stimulus, TestBlueprint,
};
use crate::db::types::{InputMode, Section};
use crate::store::memory::MemoryExamStore;
use crate::store::{ExamStore, QuestionBank};

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) store: Arc<MemoryExamStore>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("PTE_ENV", "test");
    std::env::set_var("PTE_STRICT_CONFIG", "0");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    for key in [
        "PTE_HOST",
        "PTE_PORT",
        "PROJECT_NAME",
        "API_V1_STR",
        "BACKEND_CORS_ORIGINS",
        "DEFAULT_BLUEPRINT_SLUG",
        "DEFAULT_TIME_LIMIT_SEC",
        "DB_MAX_CONNECTIONS",
    ] {
        std::env::remove_var(key);
    }
}

/// Router state backed by a seeded in-memory store. Callers must hold [`env_lock`].
pub(crate) async fn memory_state() -> (AppState, Arc<MemoryExamStore>) {
    let settings = Settings::load().expect("settings");
    let store = seeded_store().await;
    let state = AppState::new(settings, store.clone());
    (state, store)
}

pub(crate) async fn setup_test_context() -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let (state, store) = memory_state().await;
    let app = api::router::router(state.clone());

    TestContext { state, app, store, _guard: guard }
}

pub(crate) async fn seeded_store() -> Arc<MemoryExamStore> {
    let store = Arc::new(MemoryExamStore::default());
    store.seed_bank(&sample_bank()).await.expect("seed sample bank");
    store
}

fn question_type(slug: &str, section: Section, time_limit_sec: Option<i32>) -> QuestionType {
    QuestionType {
        slug: slug.to_string(),
        name: slug.replace('_', " "),
        section,
        description: None,
        scoring: Json(ScoringHint { method: "auto".to_string(), partial_credit: true }),
        time_limit_sec,
        traits: Json(Vec::new()),
        created_at: primitive_now_utc(),
    }
}

fn question(
    id: &str,
    type_slug: &str,
    section: Section,
    input_mode: InputMode,
    correct: CorrectAnswer,
    categories: &[(&str, f64)],
) -> Question {
    Question {
        id: id.to_string(),
        type_slug: type_slug.to_string(),
        section,
        input_mode,
        prompt: format!("Prompt for {id}"),
        stem: None,
        stimulus: None,
        options: Json(Vec::new()),
        blanks: Json(Vec::new()),
        correct_answer: Some(Json(correct)),
        rubric: None,
        categories: Json(
            categories
                .iter()
                .map(|(slug, weight)| CategoryWeight { slug: slug.to_string(), weight: *weight })
                .collect(),
        ),
        difficulty: "medium".to_string(),
        tags: Json(Vec::new()),
        created_at: primitive_now_utc(),
    }
}

fn with_options(mut question: Question, ids: &[&str]) -> Question {
    question.options = Json(
        ids.iter()
            .map(|id| QuestionOption { id: id.to_string(), text: format!("Option {id}") })
            .collect(),
    );
    question
}

/// Small bank: `describe_image` has no questions so full sessions come out one item short,
/// and `pte-core-legacy` names a type outside the canonical order.
pub(crate) fn sample_bank() -> QuestionBank {
    let now = primitive_now_utc();
    let categories = [
        "reading_comprehension",
        "listening_comprehension",
        "pronunciation",
        "vocabulary",
        "spelling",
    ]
    .iter()
    .map(|slug| Category {
        slug: slug.to_string(),
        label: slug.replace('_', " "),
        description: None,
        created_at: now,
    })
    .collect();

    let question_types = vec![
        question_type("read_aloud", Section::SpeakingWriting, Some(40)),
        question_type("describe_image", Section::SpeakingWriting, Some(40)),
        question_type("reading_mcq_multiple", Section::Reading, Some(90)),
        question_type("reading_mcq_single", Section::Reading, None),
        question_type("write_from_dictation", Section::Listening, None),
    ];

    let mut read_aloud = question(
        "ra-1",
        "read_aloud",
        Section::SpeakingWriting,
        InputMode::SpokenTranscript,
        CorrectAnswer::Text("the quick brown fox".to_string()),
        &[("pronunciation", 0.5), ("reading_comprehension", 0.5)],
    );
    read_aloud.stimulus = Some(Json(Stimulus {
        text: Some("The quick brown fox.".to_string()),
        ..Stimulus::default()
    }));
    let mut read_aloud_second = read_aloud.clone();
    read_aloud_second.id = "ra-2".to_string();

    let single = |id: &str| {
        with_options(
            question(
                id,
                "reading_mcq_single",
                Section::Reading,
                InputMode::McqSingle,
                CorrectAnswer::Text("b".to_string()),
                &[("reading_comprehension", 1.0)],
            ),
            &["a", "b", "c"],
        )
    };

    let questions = vec![
        read_aloud,
        read_aloud_second,
        single("rms-1"),
        single("rms-2"),
        single("rms-3"),
        with_options(
            question(
                "rmm-1",
                "reading_mcq_multiple",
                Section::Reading,
                InputMode::McqMulti,
                CorrectAnswer::Choices(vec!["a".to_string(), "c".to_string()]),
                &[("reading_comprehension", 1.0), ("vocabulary", 0.5)],
            ),
            &["a", "b", "c", "d"],
        ),
        question(
            "wfd-1",
            "write_from_dictation",
            Section::Listening,
            InputMode::ShortText,
            CorrectAnswer::Text("students must submit assignments".to_string()),
            &[("listening_comprehension", 1.0), ("spelling", 1.0)],
        ),
    ];

    let full_counts = BTreeMap::from([
        ("read_aloud".to_string(), 2),
        ("describe_image".to_string(), 1),
        ("reading_mcq_multiple".to_string(), 1),
        ("reading_mcq_single".to_string(), 3),
        ("write_from_dictation".to_string(), 1),
    ]);
    let legacy_counts =
        BTreeMap::from([("read_aloud".to_string(), 1), ("essay_marathon".to_string(), 2)]);

    let blueprints = vec![
        TestBlueprint {
            slug: "pte-core-full".to_string(),
            name: "PTE Core full test".to_string(),
            counts_by_type: Json(full_counts),
            time_by_section_sec: Json(BTreeMap::from([
                (Section::SpeakingWriting, 1800),
                (Section::Reading, 1800),
                (Section::Listening, 1800),
            ])),
            total_items: 8,
            created_at: now,
        },
        TestBlueprint {
            slug: "pte-core-legacy".to_string(),
            name: "Legacy layout".to_string(),
            counts_by_type: Json(legacy_counts),
            time_by_section_sec: Json(BTreeMap::new()),
            total_items: 3,
            created_at: now,
        },
    ];

    QuestionBank { categories, question_types, blueprints, questions }
}

/// Pool on a migrated database with every engine table emptied. `None` when `DATABASE_URL`
/// is unset. Hold the returned guard for the whole test.
pub(crate) async fn prepare_db() -> Option<(OwnedMutexGuard<()>, PgPool)> {
    let guard = env_lock().await;
    std::env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty())?;
    set_test_env();

    let settings = Settings::load().expect("settings");
    let pool = crate::db::init_pool(&settings).await.expect("db pool");
    crate::db::run_migrations(&pool).await.expect("migrations");
    reset_db(&pool).await.expect("reset db");
    Some((guard, pool))
}

async fn reset_db(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "TRUNCATE responses, test_items, test_sessions, questions, test_blueprints, \
         question_types, categories CASCADE",
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
