//! Document upload: the trigger that feeds the ingestion pipeline.
//!
//! `POST /api/documents/upload` takes a base64 document and its original
//! file name, assigns a fresh identifier and runs ingestion to completion.
//! Processing failures are reported in the body (the document is recorded
//! as failed in the ledger); only malformed requests are HTTP errors.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use base64::Engine;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::api::error::ApiError;
use crate::api::router::UPLOAD_KEY_HEADER;
use crate::api::types::ApiContext;
use crate::pipeline::processor::IngestionOutcome;

#[derive(Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    /// Base64 document bytes. A `data:<mime>;base64,` prefix is accepted.
    pub content: String,
}

pub async fn upload(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    Json(payload): Json<UploadRequest>,
) -> Result<Json<IngestionOutcome>, ApiError> {
    check_upload_key(&ctx, &headers)?;

    if payload.filename.trim().is_empty() {
        return Err(ApiError::BadRequest("filename is required".into()));
    }
    let bytes = decode_content(&payload.content)?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Document is empty".into()));
    }

    tracing::info!(filename = %payload.filename, size = bytes.len(), "Document uploaded");
    let core = ctx.core.clone();
    let filename = payload.filename;
    let outcome = tokio::task::spawn_blocking(move || core.upload(&filename, bytes)).await??;

    Ok(Json(outcome))
}

pub(crate) fn check_upload_key(ctx: &ApiContext, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = &ctx.upload_key else {
        return Ok(());
    };
    let presented = headers
        .get(UPLOAD_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

fn decode_content(content: &str) -> Result<Vec<u8>, ApiError> {
    let encoded = match content.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => content,
    };
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| ApiError::BadRequest("content is not valid base64".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_and_data_url() {
        assert_eq!(decode_content("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_content("data:application/pdf;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(decode_content("not base64 !!").is_err());
    }
}
