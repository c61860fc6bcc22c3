//! Transport-agnostic application state.
//!
//! `CoreState` is built once at startup, wrapped in `Arc` and shared with
//! the HTTP layer and the startup batch run. Every operation here is
//! blocking; async callers go through `spawn_blocking`.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::{Settings, INGEST_MAX_PARALLEL};
use crate::db::{Database, DatabaseError};
use crate::models::{IngestionLedgerEntry, RawDocument, Session};
use crate::pipeline::batch::{ingest_directory, BatchSummary};
use crate::pipeline::extraction::{
    detect_format, DocumentTextExtractor, ExtractionError, HttpOcrClient, TextRecognizer,
};
use crate::pipeline::llm::{LlmClient, LlmError, OllamaClient};
use crate::pipeline::processor::{DocumentProcessor, IngestionError, IngestionOutcome};
use crate::pipeline::rag::{QueryAnswer, QueryEngine, QueryError};
use crate::pipeline::structuring::LlmEntityExtractor;
use crate::provisioning::AccountProvisioner;
use crate::session_manager::{SessionError, SessionManager};
use crate::store::ConsentStore;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Model client error: {0}")]
    Llm(#[from] LlmError),

    #[error("Text recognition client error: {0}")]
    Recognizer(#[from] ExtractionError),
}

/// Shared state behind every transport.
pub struct CoreState {
    store: ConsentStore,
    sessions: Arc<SessionManager>,
    processor: DocumentProcessor,
    queries: QueryEngine,
}

impl CoreState {
    /// Wire the production components from runtime settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, CoreError> {
        let db = Database::open(&settings.database_path)?;

        let llm: Arc<dyn LlmClient> = Arc::new(OllamaClient::new(
            &settings.ollama_url,
            &settings.model,
            settings.model_timeout_secs,
        )?);

        let recognizer: Option<Arc<dyn TextRecognizer>> = match &settings.ocr_url {
            Some(url) => Some(Arc::new(HttpOcrClient::new(url, settings.ocr_timeout_secs)?)),
            None => {
                tracing::warn!("No text recognition service configured; only plain-text documents will ingest");
                None
            }
        };

        Ok(Self::assemble(db, recognizer, llm, Arc::new(SystemClock)))
    }

    /// Wire the components around an open database, recognizer and model.
    pub fn assemble(
        db: Database,
        recognizer: Option<Arc<dyn TextRecognizer>>,
        llm: Arc<dyn LlmClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = ConsentStore::new(db.clone());
        let accounts = AccountProvisioner::new(db, clock.clone());
        let sessions = Arc::new(SessionManager::new(accounts.clone(), clock.clone()));

        let processor = DocumentProcessor::new(
            store.clone(),
            Box::new(DocumentTextExtractor::new(recognizer)),
            Box::new(LlmEntityExtractor::new(llm.clone())),
            accounts,
            clock,
        );
        let queries = QueryEngine::new(sessions.clone(), store.clone(), llm);

        Self {
            store,
            sessions,
            processor,
            queries,
        }
    }

    /// Replace the query engine (tests use a zero backoff).
    pub fn with_query_engine(mut self, f: impl FnOnce(QueryEngine) -> QueryEngine) -> Self {
        self.queries = f(self.queries);
        self
    }

    pub fn with_processor(mut self, f: impl FnOnce(DocumentProcessor) -> DocumentProcessor) -> Self {
        self.processor = f(self.processor);
        self
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        self.sessions.login(email, password)
    }

    pub fn logout(&self, token: &str) {
        self.sessions.logout(token);
    }

    pub fn query(&self, token: &str, question: &str) -> Result<QueryAnswer, QueryError> {
        self.queries.answer(token, question)
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Ingest a document delivered by the upload source.
    pub fn ingest(&self, doc: &RawDocument) -> Result<IngestionOutcome, IngestionError> {
        self.processor.ingest(doc)
    }

    /// Accept an uploaded file: assign a fresh identifier that keeps the
    /// file's extension, then ingest it.
    pub fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<IngestionOutcome, UploadError> {
        let detection = detect_format(&bytes);
        if !detection.category.is_supported() {
            return Err(UploadError::UnsupportedFormat(detection.mime_type));
        }
        let document_id = upload_document_id(filename);
        let doc = RawDocument::new(document_id, bytes, Utc::now());
        Ok(self.processor.ingest(&doc)?)
    }

    pub fn ingest_inbox(&self, dir: &Path) -> std::io::Result<BatchSummary> {
        ingest_directory(&self.processor, dir, INGEST_MAX_PARALLEL)
    }

    pub fn ledger_entry(&self, document_id: &str) -> Result<Option<IngestionLedgerEntry>, DatabaseError> {
        self.store.ledger_entry(document_id)
    }

    pub fn failures(&self) -> Result<Vec<IngestionLedgerEntry>, DatabaseError> {
        self.store.list_failures()
    }

    /// Database reachable and schema present.
    pub fn is_healthy(&self) -> bool {
        self.store.database().connect().is_ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),
}

/// `<uuid>` plus the lower-cased extension of `filename`, if it has a sane one.
fn upload_document_id(filename: &str) -> String {
    let id = Uuid::new_v4();
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()));
    match ext {
        Some(ext) => format!("{id}.{}", ext.to_ascii_lowercase()),
        None => id.to_string(),
    }
}
