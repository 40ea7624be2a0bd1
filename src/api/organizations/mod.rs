mod handlers;

use axum::{routing::post, Router};

use crate::api::{attempts, exams};
use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_organization).get(handlers::list_memberships))
        .route("/join", post(handlers::join_organization))
        .route("/:org_id/invites", post(handlers::create_invite))
        .nest("/:org_id/exams", exams::router().merge(attempts::router()))
}
