use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::require_staff;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::{ExamPayload, ExamResponse};
use crate::services::membership::AuthContext;

use super::super::helpers;

pub(in crate::api::exams) async fn update_exam(
    Path((_org_id, exam_id)): Path<(String, String)>,
    ctx: AuthContext,
    State(state): State<AppState>,
    Json(payload): Json<ExamPayload>,
) -> Result<Json<ExamResponse>, ApiError> {
    require_staff(&ctx)?;

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    helpers::check_payload(&payload)?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let exam = repositories::exams::update(
        &mut *tx,
        &ctx.organization_id,
        &exam_id,
        helpers::exam_fields(&payload),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update exam"))?
    .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    helpers::sync_content(&mut tx, &exam.id, &payload.sections).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(exam_id = %exam.id, updated_by = %ctx.user_id, "Exam updated");

    let sections = helpers::load_sections(&state, &exam.id).await?;
    Ok(Json(ExamResponse::from_parts(exam, &sections, true)))
}

pub(in crate::api::exams) async fn publish_exam(
    Path((_org_id, exam_id)): Path<(String, String)>,
    ctx: AuthContext,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    require_staff(&ctx)?;

    let exam = repositories::exams::find_by_id(state.db(), &ctx.organization_id, &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    if exam.is_published() {
        return Err(ApiError::BadRequest("Exam is already published".to_string()));
    }

    let question_count = repositories::questions::count_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;
    if question_count == 0 {
        return Err(ApiError::BadRequest("Cannot publish an exam without questions".to_string()));
    }

    let exam = repositories::exams::publish(
        state.db(),
        &ctx.organization_id,
        &exam.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to publish exam"))?
    .ok_or_else(|| ApiError::BadRequest("Exam is already published".to_string()))?;

    tracing::info!(
        exam_id = %exam.id,
        published_by = %ctx.user_id,
        question_count,
        "Exam published"
    );

    let sections = helpers::load_sections(&state, &exam.id).await?;
    Ok(Json(ExamResponse::from_parts(exam, &sections, true)))
}

pub(in crate::api::exams) async fn delete_exam(
    Path((_org_id, exam_id)): Path<(String, String)>,
    ctx: AuthContext,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    require_staff(&ctx)?;

    let deleted = repositories::exams::delete_by_id(state.db(), &ctx.organization_id, &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;
    if !deleted {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    tracing::info!(exam_id = %exam_id, deleted_by = %ctx.user_id, "Exam deleted");
    Ok(StatusCode::NO_CONTENT)
}
