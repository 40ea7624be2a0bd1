mod handlers;
mod helpers;

use axum::{
    routing::{get, patch},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_exams).post(handlers::create_exam))
        .route(
            "/:exam_id",
            get(handlers::get_exam).put(handlers::update_exam).delete(handlers::delete_exam),
        )
        .route("/:exam_id/publish", patch(handlers::publish_exam))
}
