//! Login and logout.
//!
//! `POST /api/auth/login`: unprotected, email + password → bearer token.
//! `POST /api/auth/logout`: protected, revokes the presenting token.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, PatientContext};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn login(
    State(ctx): State<ApiContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let core = ctx.core.clone();
    // Account lookup hits the database.
    let session = tokio::task::spawn_blocking(move || {
        core.login(&request.email, &request.password)
    })
    .await??;

    Ok(Json(LoginResponse {
        token: session.token.expose().to_string(),
        email: session.patient_email.as_str().to_string(),
        expires_at: session.expires_at,
    }))
}

pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(patient): Extension<PatientContext>,
) -> StatusCode {
    ctx.core.logout(patient.token.expose());
    StatusCode::NO_CONTENT
}
