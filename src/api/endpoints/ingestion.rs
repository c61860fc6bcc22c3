//! Ingestion ledger visibility for the upload operator.
//!
//! Guarded by the same `X-Upload-Key` as uploads. Patients never see
//! ledger rows; these expose document identifiers and failure reasons only.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::api::endpoints::documents::check_upload_key;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::IngestionLedgerEntry;

/// `GET /api/ingestion/failures`: every document currently marked failed.
pub async fn failures(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
) -> Result<Json<Vec<IngestionLedgerEntry>>, ApiError> {
    check_upload_key(&ctx, &headers)?;
    let core = ctx.core.clone();
    let entries = tokio::task::spawn_blocking(move || core.failures()).await??;
    Ok(Json(entries))
}

/// `GET /api/ingestion/documents/:document_id`: ledger row for one document.
pub async fn status(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> Result<Json<IngestionLedgerEntry>, ApiError> {
    check_upload_key(&ctx, &headers)?;
    let core = ctx.core.clone();
    let lookup = document_id.clone();
    let entry = tokio::task::spawn_blocking(move || core.ledger_entry(&lookup)).await??;
    entry
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No ingestion record for {document_id}")))
}
