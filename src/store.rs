//! Consent record store: raw documents, processed records and the
//! ingestion ledger behind one handle.
//!
//! Patient-scoped reads require a [`PatientEmail`]; there is no accessor that
//! returns records for more than one patient.

use chrono::{DateTime, Utc};

use crate::db::{self, Database, DatabaseError};
use crate::models::{
    ConsentDocumentRecord, IngestionLedgerEntry, IngestionStage, PatientEmail, RawDocument,
};

#[derive(Debug, Clone)]
pub struct ConsentStore {
    db: Database,
}

impl ConsentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Persist the uploaded bytes. Re-delivery of the same identifier keeps
    /// the first copy.
    pub fn put_raw_document(&self, doc: &RawDocument) -> Result<bool, DatabaseError> {
        let conn = self.db.connect()?;
        db::insert_raw_document(&conn, doc)
    }

    pub fn raw_document(&self, document_id: &str) -> Result<Option<RawDocument>, DatabaseError> {
        let conn = self.db.connect()?;
        db::get_raw_document(&conn, document_id)
    }

    /// Insert-once. `false` means a record for this document already existed.
    pub fn insert_record(&self, record: &ConsentDocumentRecord) -> Result<bool, DatabaseError> {
        let conn = self.db.connect()?;
        db::insert_consent_record(&conn, record)
    }

    /// Owning patient of an indexed document, for ingestion bookkeeping.
    pub fn record_owner(
        &self,
        document_id: &str,
    ) -> Result<Option<(PatientEmail, String)>, DatabaseError> {
        let conn = self.db.connect()?;
        db::get_consent_owner(&conn, document_id)
    }

    pub fn records_for_patient(
        &self,
        email: &PatientEmail,
    ) -> Result<Vec<ConsentDocumentRecord>, DatabaseError> {
        let conn = self.db.connect()?;
        db::list_consent_records_for_patient(&conn, email)
    }

    // ── Ingestion ledger ────────────────────────────────────

    pub fn ledger_entry(
        &self,
        document_id: &str,
    ) -> Result<Option<IngestionLedgerEntry>, DatabaseError> {
        let conn = self.db.connect()?;
        db::get_ledger_entry(&conn, document_id)
    }

    pub fn begin_ingestion(&self, document_id: &str, now: DateTime<Utc>) -> Result<(), DatabaseError> {
        let conn = self.db.connect()?;
        db::begin_ingestion(&conn, document_id, now)
    }

    pub fn advance_stage(
        &self,
        document_id: &str,
        stage: IngestionStage,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let conn = self.db.connect()?;
        db::advance_stage(&conn, document_id, stage, attempts, now)
    }

    /// `false` if the document was already complete and nothing was written.
    pub fn record_failure(
        &self,
        document_id: &str,
        stage: IngestionStage,
        reason: &str,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let conn = self.db.connect()?;
        db::record_failure(&conn, document_id, stage, reason, attempts, now)
    }

    pub fn list_failures(&self) -> Result<Vec<IngestionLedgerEntry>, DatabaseError> {
        let conn = self.db.connect()?;
        db::list_failures(&conn)
    }
}
