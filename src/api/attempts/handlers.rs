use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::schemas::attempt::{
    ActiveAttemptResponse, AttemptDetailResponse, AttemptSessionResponse, AttemptSummary,
    SaveResponsesRequest, SaveResponsesResponse, SubmitResponse,
};
use crate::services::membership::AuthContext;

pub(super) async fn start_attempt(
    Path((_org_id, exam_id)): Path<(String, String)>,
    ctx: AuthContext,
    State(state): State<AppState>,
) -> Result<Json<AttemptSessionResponse>, ApiError> {
    let view = state.attempts().start_or_resume(&ctx, &exam_id, primitive_now_utc()).await?;
    let interval = state.settings().exam().auto_save_interval_seconds;
    Ok(Json(AttemptSessionResponse::from_view(view, interval)))
}

pub(super) async fn active_attempt(
    Path((_org_id, exam_id)): Path<(String, String)>,
    ctx: AuthContext,
    State(state): State<AppState>,
) -> Result<Json<ActiveAttemptResponse>, ApiError> {
    let view = state.attempts().active_attempt(&ctx, &exam_id, primitive_now_utc()).await?;
    let interval = state.settings().exam().auto_save_interval_seconds;
    Ok(Json(ActiveAttemptResponse {
        attempt: view.map(|view| AttemptSessionResponse::from_view(view, interval)),
    }))
}

pub(super) async fn list_attempts(
    Path((_org_id, exam_id)): Path<(String, String)>,
    ctx: AuthContext,
    State(state): State<AppState>,
) -> Result<Json<Vec<AttemptSummary>>, ApiError> {
    let attempts = state.attempts().list_attempts(&ctx, &exam_id).await?;
    Ok(Json(attempts.into_iter().map(AttemptSummary::from).collect()))
}

pub(super) async fn attempt_detail(
    Path((_org_id, exam_id, attempt_id)): Path<(String, String, String)>,
    ctx: AuthContext,
    State(state): State<AppState>,
) -> Result<Json<AttemptDetailResponse>, ApiError> {
    let view = state
        .attempts()
        .attempt_detail(&ctx, &exam_id, &attempt_id, primitive_now_utc())
        .await?;
    Ok(Json(view.into()))
}

pub(super) async fn save_responses(
    Path((_org_id, exam_id, attempt_id)): Path<(String, String, String)>,
    ctx: AuthContext,
    State(state): State<AppState>,
    Json(payload): Json<SaveResponsesRequest>,
) -> Result<Json<SaveResponsesResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let saved = state
        .attempts()
        .save_responses(&ctx, &exam_id, &attempt_id, payload.into_inputs(), primitive_now_utc())
        .await?;
    Ok(Json(SaveResponsesResponse { success: true, saved }))
}

pub(super) async fn submit_attempt(
    Path((_org_id, exam_id, attempt_id)): Path<(String, String, String)>,
    ctx: AuthContext,
    State(state): State<AppState>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let attempt =
        state.attempts().submit(&ctx, &exam_id, &attempt_id, primitive_now_utc()).await?;
    Ok(Json(SubmitResponse { success: true, attempt: attempt.into() }))
}
