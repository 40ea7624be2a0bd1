mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::state::AppState;

/// Mounted next to the exam routes under `/organizations/:org_id/exams`.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:exam_id/attempt", post(handlers::start_attempt))
        .route("/:exam_id/attempts", get(handlers::list_attempts))
        .route("/:exam_id/attempts/active", get(handlers::active_attempt))
        .route("/:exam_id/attempt/:attempt_id", get(handlers::attempt_detail))
        .route("/:exam_id/attempt/:attempt_id/responses", post(handlers::save_responses))
        .route("/:exam_id/attempt/:attempt_id/submit", post(handlers::submit_attempt))
}
