use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::ScoreSummary;
use crate::schemas::test_session::{
    BlueprintSummaryResponse, CreateSessionRequest, CreateSessionResponse, SessionDetailResponse,
    SubmitResponseRequest,
};
use crate::services::scoring::ScoreOutcome;
use crate::services::test_sessions::{self, CreateSessionParams, SubmitParams};

pub(super) async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let exam = state.settings().exam();
    let blueprint_slug =
        payload.blueprint_slug.as_deref().unwrap_or(exam.default_blueprint_slug.as_str());

    let created = test_sessions::create_session(
        state.store(),
        CreateSessionParams {
            blueprint_slug,
            user_id: payload.user_id.as_deref(),
            seed: payload.seed,
            default_time_limit_sec: exam.default_time_limit(),
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: created.session_id,
            seed: created.seed,
            total_items: created.total_items,
        }),
    ))
}

pub(super) async fn get_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionDetailResponse>, ApiError> {
    let detail = test_sessions::session_detail(state.store(), &session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    Ok(Json(detail.into()))
}

pub(super) async fn submit_response(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<SubmitResponseRequest>,
) -> Result<Json<ScoreOutcome>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = test_sessions::submit_response(
        state.store(),
        SubmitParams {
            session_id: &session_id,
            question_id: &payload.question_id,
            answer: payload.answer,
            transcript: payload.transcript,
        },
    )
    .await?;

    Ok(Json(outcome))
}

pub(super) async fn finish_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ScoreSummary>, ApiError> {
    let summary = test_sessions::finish_session(state.store(), &session_id).await?;
    Ok(Json(summary))
}

pub(super) async fn get_blueprint(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BlueprintSummaryResponse>, ApiError> {
    let summary = test_sessions::blueprint_summary(state.store(), &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blueprint not found".to_string()))?;

    Ok(Json(summary.into()))
}
