//! API router.
//!
//! Returns a composable `Router` with all routes under `/api/`.
//! Patient routes pass through the bearer-token middleware; login,
//! upload, ingestion status and health do not. Upload and ingestion
//! status check `X-Upload-Key` themselves when one is configured.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::MAX_UPLOAD_BODY_BYTES;
use crate::core_state::CoreState;

/// Shared-secret header guarding upload and ingestion status.
pub const UPLOAD_KEY_HEADER: &str = "x-upload-key";

/// Build the API router around a shared `CoreState`.
pub fn api_router(core: Arc<CoreState>, upload_key: Option<String>) -> Router {
    build_router(ApiContext::new(core).with_upload_key(upload_key))
}

fn build_router(ctx: ApiContext) -> Router {
    // Extension must be outermost so the auth middleware can extract ApiContext.
    let protected = Router::new()
        .route("/query", post(endpoints::query::query))
        .route("/auth/logout", post(endpoints::auth::logout))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new()
        .route("/auth/login", post(endpoints::auth::login))
        .route(
            "/documents/upload",
            post(endpoints::documents::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route("/ingestion/failures", get(endpoints::ingestion::failures))
        .route("/ingestion/documents/:document_id", get(endpoints::ingestion::status))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(UPLOAD_KEY_HEADER),
        ]);

    Router::new()
        .nest("/api", protected.merge(unprotected))
        .layer(cors)
}
