use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::require_staff;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::{ExamPayload, ExamResponse};
use crate::services::membership::AuthContext;

use super::super::helpers;

pub(in crate::api::exams) async fn create_exam(
    ctx: AuthContext,
    State(state): State<AppState>,
    Json(payload): Json<ExamPayload>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    require_staff(&ctx)?;

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    helpers::check_payload(&payload)?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let exam_id = Uuid::new_v4().to_string();
    let exam = repositories::exams::create(
        &mut *tx,
        repositories::exams::CreateExam {
            id: &exam_id,
            organization_id: &ctx.organization_id,
            fields: helpers::exam_fields(&payload),
            created_by: &ctx.user_id,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    helpers::sync_content(&mut tx, &exam.id, &payload.sections).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        exam_id = %exam.id,
        organization_id = %ctx.organization_id,
        created_by = %ctx.user_id,
        "Exam created"
    );

    let sections = helpers::load_sections(&state, &exam.id).await?;
    Ok((StatusCode::CREATED, Json(ExamResponse::from_parts(exam, &sections, true))))
}
