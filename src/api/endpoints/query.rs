//! `POST /api/query`: answer a question over the caller's own consent forms.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, PatientContext};

/// Upper bound on question length, in characters.
const MAX_QUESTION_CHARS: usize = 2_000;

#[derive(Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
    pub sources: Vec<String>,
}

/// The blocking model call runs on the blocking pool. If the client goes
/// away this future is dropped and the result is discarded; nothing is
/// written on the query path, so no state is left behind.
pub async fn query(
    State(ctx): State<ApiContext>,
    Extension(patient): Extension<PatientContext>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question must not be empty".into()));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Question exceeds {MAX_QUESTION_CHARS} characters"
        )));
    }

    let core = ctx.core.clone();
    let token = patient.token.clone();
    let asked = question.clone();
    let answer = tokio::task::spawn_blocking(move || core.query(token.expose(), &asked)).await??;

    Ok(Json(QueryResponse {
        query: question,
        answer: answer.answer,
        sources: answer.sources,
    }))
}
