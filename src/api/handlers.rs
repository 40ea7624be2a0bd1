use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::core::metrics;
use crate::core::redis::RedisHealth;
use crate::core::state::AppState;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let response = RootResponse {
        message: "GradePoint API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs_url: format!("{}/docs", state.settings().api().api_v1_str),
    };

    Json(response)
}

/// Postgres is required; Redis only backs rate limiting, so losing it degrades
/// the service rather than failing it.
pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").execute(state.db()).await {
        Ok(_) => Ok(()),
        Err(err) => Err(err.to_string()),
    };
    let redis = state.redis().health().await;

    let status = match (&database, &redis) {
        (Err(_), _) => "unhealthy",
        (Ok(()), RedisHealth::Unhealthy(_)) => "degraded",
        _ => "healthy",
    };

    let components = HashMap::from([
        (
            "database".to_string(),
            database.map_or_else(|err| format!("unhealthy: {err}"), |()| "healthy".to_string()),
        ),
        (
            "redis".to_string(),
            match redis {
                RedisHealth::Healthy => "healthy".to_string(),
                RedisHealth::Disconnected => "disconnected".to_string(),
                RedisHealth::Unhealthy(error) => format!("unhealthy: {error}"),
            },
        ),
    ]);

    Json(HealthResponse {
        service: "gradepoint-api".to_string(),
        status: status.to_string(),
        components,
    })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
