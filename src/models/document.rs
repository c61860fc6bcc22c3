use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::consent::StructuredConsentRecord;
use super::enums::{IngestionStage, LedgerStatus};

/// Uploaded document bytes plus the identifier assigned by the upload source.
///
/// Fields are private: a raw document is never mutated after construction.
#[derive(Debug, Clone)]
pub struct RawDocument {
    document_id: String,
    bytes: Vec<u8>,
    uploaded_at: DateTime<Utc>,
}

impl RawDocument {
    pub fn new(document_id: impl Into<String>, bytes: Vec<u8>, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            document_id: document_id.into(),
            bytes,
            uploaded_at,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }
}

/// A successfully processed document: one per raw document, insert-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentDocumentRecord {
    pub document_id: String,
    /// Key of the raw bytes in `raw_documents`.
    pub raw_document_ref: String,
    pub full_text: String,
    pub record: StructuredConsentRecord,
    pub processed_at: DateTime<Utc>,
}

/// Ledger row tracking where a document is in the ingestion state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionLedgerEntry {
    pub document_id: String,
    pub status: LedgerStatus,
    pub stage: IngestionStage,
    pub failure_reason: Option<String>,
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
}
