//! Document ingestion orchestrator.
//!
//! Drives one document through
//! `Received → TextExtracted → Analyzed → Indexed → AccountProvisioned → Complete`,
//! recording every transition in the ingestion ledger. A failure is absorbed
//! into the ledger as `failed` with the stage and reason; it never affects
//! other documents. Re-delivery of a completed document is a no-op.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::clock::Clock;
use crate::config::{INGEST_RETRY_BASE_DELAY_MS, MAX_STAGE_ATTEMPTS};
use crate::db::DatabaseError;
use crate::models::{
    ConsentDocumentRecord, IngestionStage, LedgerStatus, PatientEmail, RawDocument,
};
use crate::pipeline::extraction::{ExtractionError, TextExtractor};
use crate::pipeline::structuring::{EntityExtractor, StructuringError};
use crate::provisioning::{AccountProvisioner, ProvisionError};
use crate::store::ConsentStore;

/// Errors that end a document's ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Entity extraction failed: {0}")]
    Structuring(#[from] StructuringError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Account provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Document identifier is empty")]
    EmptyDocumentId,
}

/// What happened to one delivered document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestionOutcome {
    Completed {
        document_id: String,
        patient_email: PatientEmail,
    },
    /// Already complete: nothing was done.
    Skipped { document_id: String },
    Failed {
        document_id: String,
        stage: IngestionStage,
        reason: String,
    },
}

impl IngestionOutcome {
    pub fn document_id(&self) -> &str {
        match self {
            Self::Completed { document_id, .. }
            | Self::Skipped { document_id }
            | Self::Failed { document_id, .. } => document_id,
        }
    }
}

/// Orchestrates ingestion: extract → analyze → index → provision.
///
/// Pure pipeline logic with trait-based DI so it is fully testable with
/// mock recognizers and models.
pub struct DocumentProcessor {
    store: ConsentStore,
    extractor: Box<dyn TextExtractor>,
    entities: Box<dyn EntityExtractor>,
    provisioner: AccountProvisioner,
    clock: Arc<dyn Clock>,
    retry_delay: Duration,
}

impl DocumentProcessor {
    pub fn new(
        store: ConsentStore,
        extractor: Box<dyn TextExtractor>,
        entities: Box<dyn EntityExtractor>,
        provisioner: AccountProvisioner,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            extractor,
            entities,
            provisioner,
            clock,
            retry_delay: Duration::from_millis(INGEST_RETRY_BASE_DELAY_MS),
        }
    }

    /// Base delay between attempts of a stage (doubles per attempt).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Ingest one document.
    ///
    /// Returns `Err` only when the outcome itself could not be recorded in
    /// the ledger; processing failures come back as [`IngestionOutcome::Failed`].
    pub fn ingest(&self, doc: &RawDocument) -> Result<IngestionOutcome, IngestionError> {
        let document_id = doc.document_id();
        if document_id.trim().is_empty() {
            return Err(IngestionError::EmptyDocumentId);
        }
        let span = tracing::info_span!("ingest", doc_id = %document_id);
        let _enter = span.enter();

        if let Some(entry) = self.store.ledger_entry(document_id)? {
            if entry.status == LedgerStatus::Complete {
                tracing::info!("Document already ingested, skipping");
                return Ok(IngestionOutcome::Skipped {
                    document_id: document_id.to_string(),
                });
            }
        }

        match self.run_stages(document_id, doc) {
            Ok(patient_email) => {
                self.store
                    .advance_stage(document_id, IngestionStage::Complete, 1, self.clock.now())?;
                tracing::info!(email = %patient_email, "Document ingested");
                Ok(IngestionOutcome::Completed {
                    document_id: document_id.to_string(),
                    patient_email,
                })
            }
            Err(failure) => {
                let reason = failure.error.to_string();
                tracing::warn!(
                    stage = %failure.stage,
                    attempts = failure.attempts,
                    error = %reason,
                    "Document ingestion failed"
                );
                let recorded = self.store.record_failure(
                    document_id,
                    failure.stage,
                    &reason,
                    failure.attempts,
                    self.clock.now(),
                )?;
                if !recorded {
                    tracing::info!("Document completed by a concurrent delivery, failure discarded");
                    return Ok(IngestionOutcome::Skipped {
                        document_id: document_id.to_string(),
                    });
                }
                Ok(IngestionOutcome::Failed {
                    document_id: document_id.to_string(),
                    stage: failure.stage,
                    reason,
                })
            }
        }
    }

    fn run_stages(&self, document_id: &str, doc: &RawDocument) -> Result<PatientEmail, StageFailure> {
        let now = self.clock.now();
        self.store
            .begin_ingestion(document_id, now)
            .map_err(|e| StageFailure::new(IngestionStage::Received, 1, e))?;
        self.store
            .put_raw_document(doc)
            .map_err(|e| StageFailure::new(IngestionStage::Received, 1, e))?;

        // A previous run may have indexed the record before failing later;
        // the stored record is authoritative.
        let indexed = self
            .store
            .record_owner(document_id)
            .map_err(|e| StageFailure::new(IngestionStage::Indexed, 1, e))?;

        let (email, name) = match indexed {
            Some(owner) => {
                tracing::info!("Record already indexed, resuming at provisioning");
                owner
            }
            None => self.extract_and_index(document_id, doc)?,
        };

        self.provisioner
            .provision(&email, &name)
            .map_err(|e| StageFailure::new(IngestionStage::AccountProvisioned, 1, e))?;
        self.advance(document_id, IngestionStage::AccountProvisioned, 1)?;

        Ok(email)
    }

    fn extract_and_index(
        &self,
        document_id: &str,
        doc: &RawDocument,
    ) -> Result<(PatientEmail, String), StageFailure> {
        let (text, attempts) = self.with_retries(
            IngestionStage::TextExtracted,
            ExtractionError::is_transient,
            || self.extractor.extract(doc),
        )?;
        self.advance(document_id, IngestionStage::TextExtracted, attempts)?;

        let (record, attempts) = self.with_retries(
            IngestionStage::Analyzed,
            StructuringError::is_transient,
            || self.entities.extract_entities(document_id, &text),
        )?;
        self.advance(document_id, IngestionStage::Analyzed, attempts)?;

        let document = ConsentDocumentRecord {
            document_id: document_id.to_string(),
            raw_document_ref: document_id.to_string(),
            full_text: text.full_text(),
            record,
            processed_at: self.clock.now(),
        };
        let inserted = self
            .store
            .insert_record(&document)
            .map_err(|e| StageFailure::new(IngestionStage::Indexed, 1, e))?;

        let owner = if inserted {
            (
                document.record.patient_email.clone(),
                document.record.patient_name.clone(),
            )
        } else {
            // A concurrent delivery of the same document won the insert.
            tracing::info!("Record inserted concurrently, keeping existing");
            self.store
                .record_owner(document_id)
                .map_err(|e| StageFailure::new(IngestionStage::Indexed, 1, e))?
                .ok_or_else(|| {
                    StageFailure::new(
                        IngestionStage::Indexed,
                        1,
                        DatabaseError::NotFound {
                            entity_type: "ConsentDocumentRecord".into(),
                            id: document_id.into(),
                        },
                    )
                })?
        };
        self.advance(document_id, IngestionStage::Indexed, 1)?;

        Ok(owner)
    }

    fn advance(&self, document_id: &str, stage: IngestionStage, attempts: u32) -> Result<(), StageFailure> {
        self.store
            .advance_stage(document_id, stage, attempts, self.clock.now())
            .map_err(|e| StageFailure::new(stage, attempts, e))
    }

    /// Run `op` up to [`MAX_STAGE_ATTEMPTS`] times while it fails transiently.
    fn with_retries<T, E>(
        &self,
        stage: IngestionStage,
        is_transient: fn(&E) -> bool,
        mut op: impl FnMut() -> Result<T, E>,
    ) -> Result<(T, u32), StageFailure>
    where
        E: Into<IngestionError> + Display,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok((value, attempt)),
                Err(e) if is_transient(&e) && attempt < MAX_STAGE_ATTEMPTS => {
                    tracing::warn!(
                        stage = %stage,
                        attempt,
                        error = %e,
                        "Stage failed transiently, retrying"
                    );
                    let backoff = self.retry_delay * 2u32.saturating_pow(attempt - 1);
                    if !backoff.is_zero() {
                        std::thread::sleep(backoff);
                    }
                    attempt += 1;
                }
                Err(e) => return Err(StageFailure::new(stage, attempt, e)),
            }
        }
    }
}

struct StageFailure {
    stage: IngestionStage,
    attempts: u32,
    error: IngestionError,
}

impl StageFailure {
    fn new(stage: IngestionStage, attempts: u32, error: impl Into<IngestionError>) -> Self {
        Self {
            stage,
            attempts,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::db::Database;
    use crate::pipeline::extraction::{DocumentTextExtractor, MockOcrEngine};
    use crate::pipeline::llm::{LlmClient, MockLlmClient, Scripted, ScriptedLlmClient};
    use crate::pipeline::extraction::ExtractedText;
    use crate::pipeline::structuring::LlmEntityExtractor;
    use chrono::Utc;
    use std::sync::{mpsc, Mutex};

    fn extraction_json(name: &str, email: &str, declined: &[&str]) -> String {
        serde_json::json!({
            "summary": "Consent form.",
            "entities": {
                "patient_name": name,
                "patient_email": email,
                "date_of_birth": null,
                "doctor_name": "Dr. Chen",
                "procedure": "Knee Surgery",
                "date": "2024-05-01"
            },
            "consented_items": ["Surgery"],
            "declined_items": declined,
        })
        .to_string()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: ConsentStore,
        provisioner: AccountProvisioner,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("t.db")).unwrap();
        Fixture {
            store: ConsentStore::new(db.clone()),
            provisioner: AccountProvisioner::new(db, Arc::new(SystemClock)),
            _dir: dir,
        }
    }

    fn processor(f: &Fixture, ocr: Arc<MockOcrEngine>, llm: Arc<dyn LlmClient>) -> DocumentProcessor {
        DocumentProcessor::new(
            f.store.clone(),
            Box::new(DocumentTextExtractor::new(Some(ocr))),
            Box::new(LlmEntityExtractor::new(llm)),
            f.provisioner.clone(),
            Arc::new(SystemClock),
        )
        .with_retry_delay(Duration::ZERO)
    }

    fn pdf(id: &str) -> RawDocument {
        RawDocument::new(id, b"%PDF-1.7 scanned consent".to_vec(), Utc::now())
    }

    fn consent_ocr() -> Arc<MockOcrEngine> {
        Arc::new(MockOcrEngine::new(&[
            "Consent form for John Smith, john.smith@example.com",
            "I consent to Surgery. I decline Research.",
        ]))
    }

    #[test]
    fn ingests_document_end_to_end() {
        let f = fixture();
        let llm = Arc::new(MockLlmClient::new(&extraction_json(
            "John Smith",
            "John.Smith@example.com",
            &["Research"],
        )));
        let p = processor(&f, consent_ocr(), llm);

        let outcome = p.ingest(&pdf("form-1.pdf")).unwrap();
        let email = PatientEmail::parse("john.smith@example.com").unwrap();
        assert_eq!(
            outcome,
            IngestionOutcome::Completed {
                document_id: "form-1.pdf".into(),
                patient_email: email.clone(),
            }
        );

        let records = f.store.records_for_patient(&email).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record.declined_items, vec!["Research"]);
        assert!(records[0].full_text.contains("I decline Research."));
        assert!(f.store.raw_document("form-1.pdf").unwrap().is_some());

        let entry = f.store.ledger_entry("form-1.pdf").unwrap().unwrap();
        assert_eq!(entry.status, LedgerStatus::Complete);
        assert!(f.provisioner.find(&email).unwrap().is_some());
    }

    #[test]
    fn reingesting_completed_document_is_noop() {
        let f = fixture();
        let llm = Arc::new(MockLlmClient::new(&extraction_json(
            "John Smith",
            "john.smith@example.com",
            &["Research"],
        )));
        let ocr = consent_ocr();
        let p = processor(&f, ocr.clone(), llm.clone());
        let email = PatientEmail::parse("john.smith@example.com").unwrap();

        p.ingest(&pdf("form-1.pdf")).unwrap();
        let hash_before = f.provisioner.find(&email).unwrap().unwrap().password_hash;
        let second = p.ingest(&pdf("form-1.pdf")).unwrap();

        assert!(matches!(second, IngestionOutcome::Skipped { .. }));
        assert_eq!(ocr.calls(), 1);
        assert_eq!(llm.calls(), 1);
        assert_eq!(f.store.records_for_patient(&email).unwrap().len(), 1);
        assert_eq!(
            f.provisioner.find(&email).unwrap().unwrap().password_hash,
            hash_before
        );
    }

    #[test]
    fn missing_email_fails_without_record_or_account() {
        let f = fixture();
        let llm = Arc::new(MockLlmClient::new(&extraction_json("John Smith", "N/A", &[])));
        let p = processor(&f, consent_ocr(), llm.clone());

        let outcome = p.ingest(&pdf("form-1.pdf")).unwrap();
        match outcome {
            IngestionOutcome::Failed { stage, reason, .. } => {
                assert_eq!(stage, IngestionStage::Analyzed);
                assert!(reason.contains("patient_email"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        // Malformed extraction is not retried.
        assert_eq!(llm.calls(), 1);

        let failures = f.store.list_failures().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].stage, IngestionStage::Analyzed);
        assert!(f.store.record_owner("form-1.pdf").unwrap().is_none());
    }

    #[test]
    fn transient_ocr_timeouts_are_retried() {
        let f = fixture();
        let llm = Arc::new(MockLlmClient::new(&extraction_json(
            "John Smith",
            "john.smith@example.com",
            &[],
        )));
        let ocr = Arc::new(MockOcrEngine::new(&["Consent form for John Smith"]).with_timeouts(2));
        let p = processor(&f, ocr.clone(), llm);

        let outcome = p.ingest(&pdf("form-1.pdf")).unwrap();
        assert!(matches!(outcome, IngestionOutcome::Completed { .. }));
        assert_eq!(ocr.calls(), 3);
    }

    #[test]
    fn gives_up_after_three_attempts() {
        let f = fixture();
        let llm = Arc::new(ScriptedLlmClient::new(vec![Scripted::Timeout]));
        let p = processor(&f, consent_ocr(), llm.clone());

        let outcome = p.ingest(&pdf("form-1.pdf")).unwrap();
        assert!(matches!(
            outcome,
            IngestionOutcome::Failed { stage: IngestionStage::Analyzed, .. }
        ));
        assert_eq!(llm.calls(), MAX_STAGE_ATTEMPTS);
        let entry = f.store.ledger_entry("form-1.pdf").unwrap().unwrap();
        assert_eq!(entry.attempts, MAX_STAGE_ATTEMPTS);
    }

    #[test]
    fn failed_document_can_be_redelivered() {
        let f = fixture();
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Scripted::Unavailable,
            Scripted::Unavailable,
            Scripted::Unavailable,
            Scripted::Reply(extraction_json("John Smith", "john.smith@example.com", &[])),
        ]));
        let p = processor(&f, consent_ocr(), llm);

        assert!(matches!(
            p.ingest(&pdf("form-1.pdf")).unwrap(),
            IngestionOutcome::Failed { .. }
        ));
        assert!(matches!(
            p.ingest(&pdf("form-1.pdf")).unwrap(),
            IngestionOutcome::Completed { .. }
        ));
        assert!(f.store.list_failures().unwrap().is_empty());
    }

    #[test]
    fn unsupported_format_fails_at_extraction() {
        let f = fixture();
        let llm = Arc::new(MockLlmClient::new("{}"));
        let p = processor(&f, consent_ocr(), llm.clone());
        let zip = RawDocument::new("archive.zip", vec![0x50, 0x4B, 0x03, 0x04, 0x00], Utc::now());

        let outcome = p.ingest(&zip).unwrap();
        assert!(matches!(
            outcome,
            IngestionOutcome::Failed { stage: IngestionStage::TextExtracted, .. }
        ));
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn empty_document_id_is_rejected() {
        let f = fixture();
        let p = processor(&f, consent_ocr(), Arc::new(MockLlmClient::new("{}")));
        let doc = RawDocument::new("  ", b"text".to_vec(), Utc::now());
        assert!(matches!(p.ingest(&doc), Err(IngestionError::EmptyDocumentId)));
    }

    #[test]
    fn concurrent_documents_for_one_patient_share_an_account() {
        let f = fixture();
        let llm = Arc::new(MockLlmClient::new(&extraction_json(
            "John Smith",
            "john.smith@example.com",
            &["Research"],
        )));
        let p = processor(&f, consent_ocr(), llm);
        let n = 6;

        std::thread::scope(|s| {
            for i in 0..n {
                let p = &p;
                s.spawn(move || {
                    let outcome = p.ingest(&pdf(&format!("form-{i}.pdf"))).unwrap();
                    assert!(matches!(outcome, IngestionOutcome::Completed { .. }));
                });
            }
        });

        let email = PatientEmail::parse("john.smith@example.com").unwrap();
        assert_eq!(f.store.records_for_patient(&email).unwrap().len(), n);
        let conn = f.store.database().connect().unwrap();
        assert_eq!(crate::db::count_patients(&conn).unwrap(), 1);
    }

    #[test]
    fn concurrent_redelivery_of_same_document_yields_one_record() {
        let f = fixture();
        let llm = Arc::new(MockLlmClient::new(&extraction_json(
            "John Smith",
            "john.smith@example.com",
            &[],
        )));
        let p = processor(&f, consent_ocr(), llm);

        std::thread::scope(|s| {
            for _ in 0..4 {
                let p = &p;
                s.spawn(move || {
                    let outcome = p.ingest(&pdf("form-1.pdf")).unwrap();
                    assert!(!matches!(outcome, IngestionOutcome::Failed { .. }));
                });
            }
        });

        let email = PatientEmail::parse("john.smith@example.com").unwrap();
        assert_eq!(f.store.records_for_patient(&email).unwrap().len(), 1);
    }

    #[test]
    fn null_item_lists_from_model_still_ingest() {
        let f = fixture();
        let reply = serde_json::json!({
            "summary": "Consent form.",
            "entities": {
                "patient_name": "John Smith",
                "patient_email": "john.smith@example.com",
                "procedure": "Knee Surgery"
            },
            "declined_items": null,
        })
        .to_string();
        let p = processor(&f, consent_ocr(), Arc::new(MockLlmClient::new(&reply)));

        let outcome = p.ingest(&pdf("form-1.pdf")).unwrap();
        assert!(matches!(outcome, IngestionOutcome::Completed { .. }));

        let email = PatientEmail::parse("john.smith@example.com").unwrap();
        let records = f.store.records_for_patient(&email).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].record.consented_items.is_empty());
        assert!(records[0].record.declined_items.is_empty());
        assert!(f.provisioner.find(&email).unwrap().is_some());
    }

    /// Holds the first delivery inside extraction until released, then
    /// fails it. Later deliveries extract normally.
    struct GatedExtractor {
        gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
        inner: DocumentTextExtractor,
    }

    impl TextExtractor for GatedExtractor {
        fn extract(&self, doc: &RawDocument) -> Result<ExtractedText, ExtractionError> {
            let gate = self.gate.lock().unwrap().take();
            match gate {
                Some((entered, release)) => {
                    entered.send(()).unwrap();
                    release.recv().unwrap();
                    Err(ExtractionError::EmptyDocument)
                }
                None => self.inner.extract(doc),
            }
        }
    }

    #[test]
    fn late_failure_does_not_overwrite_concurrent_completion() {
        let f = fixture();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let extractor = GatedExtractor {
            gate: Mutex::new(Some((entered_tx, release_rx))),
            inner: DocumentTextExtractor::new(Some(consent_ocr())),
        };
        let llm = Arc::new(MockLlmClient::new(&extraction_json(
            "John Smith",
            "john.smith@example.com",
            &["Research"],
        )));
        let p = DocumentProcessor::new(
            f.store.clone(),
            Box::new(extractor),
            Box::new(LlmEntityExtractor::new(llm)),
            f.provisioner.clone(),
            Arc::new(SystemClock),
        )
        .with_retry_delay(Duration::ZERO);

        std::thread::scope(|s| {
            let held = s.spawn(|| p.ingest(&pdf("form-1.pdf")).unwrap());
            entered_rx.recv().unwrap();

            let first = p.ingest(&pdf("form-1.pdf")).unwrap();
            assert!(matches!(first, IngestionOutcome::Completed { .. }));

            release_tx.send(()).unwrap();
            let late = held.join().unwrap();
            assert_eq!(
                late,
                IngestionOutcome::Skipped {
                    document_id: "form-1.pdf".into()
                }
            );
        });

        let entry = f.store.ledger_entry("form-1.pdf").unwrap().unwrap();
        assert_eq!(entry.status, LedgerStatus::Complete);
        assert!(entry.failure_reason.is_none());
        assert!(f.store.list_failures().unwrap().is_empty());

        let email = PatientEmail::parse("john.smith@example.com").unwrap();
        assert_eq!(f.store.records_for_patient(&email).unwrap().len(), 1);
        assert!(f.provisioner.find(&email).unwrap().is_some());

        assert!(matches!(
            p.ingest(&pdf("form-1.pdf")).unwrap(),
            IngestionOutcome::Skipped { .. }
        ));
    }
}
