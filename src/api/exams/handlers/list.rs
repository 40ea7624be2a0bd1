use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::exam::{ExamResponse, ExamSummaryResponse};
use crate::services::membership::AuthContext;

use super::super::helpers;

/// Staff see drafts too; students only published exams.
pub(in crate::api::exams) async fn list_exams(
    ctx: AuthContext,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamSummaryResponse>>, ApiError> {
    let rows =
        repositories::exams::list_summaries(state.db(), &ctx.organization_id, !ctx.is_staff())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(rows.into_iter().map(ExamSummaryResponse::from).collect()))
}

pub(in crate::api::exams) async fn get_exam(
    Path((_org_id, exam_id)): Path<(String, String)>,
    ctx: AuthContext,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), &ctx.organization_id, &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .filter(|exam| ctx.is_staff() || exam.is_published())
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    let sections = helpers::load_sections(&state, &exam.id).await?;
    Ok(Json(ExamResponse::from_parts(exam, &sections, ctx.is_staff())))
}
