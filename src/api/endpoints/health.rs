//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub active_sessions: usize,
}

/// `GET /api/health`
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let core = ctx.core.clone();
    let healthy = tokio::task::spawn_blocking(move || core.is_healthy())
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        version: crate::config::APP_VERSION,
        active_sessions: ctx.core.sessions().active_sessions(),
    })
}
