//! Batch ingestion: many documents in parallel, one document per worker at a time.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use super::processor::{DocumentProcessor, IngestionError, IngestionOutcome};
use crate::models::{IngestionStage, RawDocument};

/// Tally of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Documents whose outcome could not even be recorded.
    pub errored: usize,
}

impl BatchSummary {
    fn tally(results: &[Result<IngestionOutcome, IngestionError>]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result {
                Ok(IngestionOutcome::Completed { .. }) => summary.completed += 1,
                Ok(IngestionOutcome::Skipped { .. }) => summary.skipped += 1,
                Ok(IngestionOutcome::Failed { .. }) => summary.failed += 1,
                Err(_) => summary.errored += 1,
            }
        }
        summary
    }
}

/// Ingest `docs` on up to `max_parallel` threads. Results are in input order.
pub fn ingest_batch(
    processor: &DocumentProcessor,
    docs: &[RawDocument],
    max_parallel: usize,
) -> Vec<Result<IngestionOutcome, IngestionError>> {
    let workers = max_parallel.max(1);
    let mut results = Vec::with_capacity(docs.len());

    for chunk in docs.chunks(workers) {
        let chunk_results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|doc| s.spawn(move || processor.ingest(doc)))
                .collect();
            handles
                .into_iter()
                .zip(chunk)
                .map(|(handle, doc)| {
                    handle.join().unwrap_or_else(|_| {
                        tracing::error!(doc_id = %doc.document_id(), "Ingestion worker panicked");
                        Ok(IngestionOutcome::Failed {
                            document_id: doc.document_id().to_string(),
                            stage: IngestionStage::Received,
                            reason: "ingestion worker panicked".into(),
                        })
                    })
                })
                .collect()
        });
        results.extend(chunk_results);
    }

    results
}

/// Ingest every regular file in `dir`, using the file name as the document id.
pub fn ingest_directory(
    processor: &DocumentProcessor,
    dir: &Path,
    max_parallel: usize,
) -> std::io::Result<BatchSummary> {
    let mut docs = Vec::new();
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!(path = %entry.path().display(), "Skipping file with non UTF-8 name");
            continue;
        };
        let bytes = std::fs::read(entry.path())?;
        docs.push(RawDocument::new(name, bytes, Utc::now()));
    }

    tracing::info!(dir = %dir.display(), documents = docs.len(), "Batch ingestion started");
    let results = ingest_batch(processor, &docs, max_parallel);
    let summary = BatchSummary::tally(&results);
    tracing::info!(
        completed = summary.completed,
        skipped = summary.skipped,
        failed = summary.failed,
        errored = summary.errored,
        "Batch ingestion finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::clock::SystemClock;
    use crate::db::Database;
    use crate::models::PatientEmail;
    use crate::pipeline::extraction::DocumentTextExtractor;
    use crate::pipeline::llm::MockLlmClient;
    use crate::pipeline::structuring::LlmEntityExtractor;
    use crate::provisioning::AccountProvisioner;
    use crate::store::ConsentStore;

    const RESPONSE: &str = r#"{"summary": "s",
        "entities": {"patient_name": "Jane Doe", "patient_email": "jane@example.com"},
        "consented_items": ["Photography"], "declined_items": []}"#;

    fn setup(dir: &Path) -> (ConsentStore, DocumentProcessor) {
        let db = Database::open(&dir.join("t.db")).unwrap();
        let store = ConsentStore::new(db.clone());
        let processor = DocumentProcessor::new(
            store.clone(),
            Box::new(DocumentTextExtractor::new(None)),
            Box::new(LlmEntityExtractor::new(Arc::new(MockLlmClient::new(RESPONSE)))),
            AccountProvisioner::new(db, Arc::new(SystemClock)),
            Arc::new(SystemClock),
        )
        .with_retry_delay(Duration::ZERO);
        (store, processor)
    }

    #[test]
    fn failures_do_not_block_other_documents() {
        let dir = tempfile::tempdir().unwrap();
        let (store, processor) = setup(dir.path());
        let docs = vec![
            RawDocument::new("a.txt", b"Consent form for Jane Doe, jane@example.com".to_vec(), Utc::now()),
            RawDocument::new("b.bin", vec![0x00, 0x01, 0x02, 0x03], Utc::now()),
            RawDocument::new("c.txt", b"Second consent form for Jane Doe".to_vec(), Utc::now()),
        ];

        let results = ingest_batch(&processor, &docs, 2);
        let ids: Vec<_> = results
            .iter()
            .map(|r| r.as_ref().unwrap().document_id().to_string())
            .collect();
        assert_eq!(ids, vec!["a.txt", "b.bin", "c.txt"]);
        assert_eq!(
            BatchSummary::tally(&results),
            BatchSummary { completed: 2, skipped: 0, failed: 1, errored: 0 }
        );

        let email = PatientEmail::parse("jane@example.com").unwrap();
        assert_eq!(store.records_for_patient(&email).unwrap().len(), 2);
    }

    #[test]
    fn directory_scan_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("inbox");
        std::fs::create_dir(&inbox).unwrap();
        std::fs::write(inbox.join("form-1.txt"), "Consent form for Jane Doe").unwrap();
        std::fs::write(inbox.join("form-2.txt"), "Another consent form, Jane Doe").unwrap();
        std::fs::create_dir(inbox.join("nested")).unwrap();
        let (_store, processor) = setup(dir.path());

        let first = ingest_directory(&processor, &inbox, 4).unwrap();
        assert_eq!(first.completed, 2);

        let second = ingest_directory(&processor, &inbox, 4).unwrap();
        assert_eq!(second, BatchSummary { completed: 0, skipped: 2, failed: 0, errored: 0 });
    }
}
