use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::{ConsentDocumentRecord, PatientEmail, StructuredConsentRecord};

const CONSENT_COLUMNS: &str = "document_id, patient_email, patient_name, date_of_birth,
     doctor_name, procedure_name, form_date, consented_items, declined_items, summary,
     search_terms, full_text, processed_at";

/// Persist a processed document. Insert-once: returns `false` (and leaves the
/// existing row untouched) when a record for this document already exists.
pub fn insert_consent_record(
    conn: &Connection,
    doc: &ConsentDocumentRecord,
) -> Result<bool, DatabaseError> {
    let r = &doc.record;
    let rows = conn.execute(
        &format!(
            "INSERT INTO consent_records ({CONSENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(document_id) DO NOTHING"
        ),
        params![
            doc.document_id,
            r.patient_email.as_str(),
            r.patient_name,
            r.date_of_birth,
            r.doctor_name,
            r.procedure,
            r.form_date,
            serde_json::to_string(&r.consented_items)?,
            serde_json::to_string(&r.declined_items)?,
            r.summary,
            serde_json::to_string(&r.search_terms)?,
            doc.full_text,
            doc.processed_at,
        ],
    )?;
    Ok(rows == 1)
}

/// Owner of an already-indexed document: `(patient_email, patient_name)`.
///
/// Used only by ingestion to resume or de-duplicate a document; it exposes
/// no record content.
pub fn get_consent_owner(
    conn: &Connection,
    document_id: &str,
) -> Result<Option<(PatientEmail, String)>, DatabaseError> {
    let result = conn.query_row(
        "SELECT patient_email, patient_name FROM consent_records WHERE document_id = ?1",
        params![document_id],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
    );

    let (email, name) = match result {
        Ok(row) => row,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let email = PatientEmail::parse(&email).map_err(|_| {
        DatabaseError::ConstraintViolation(format!("stored patient_email for {document_id} is invalid"))
    })?;
    Ok(Some((email, name)))
}

/// All records belonging to exactly this patient, oldest first.
pub fn list_consent_records_for_patient(
    conn: &Connection,
    email: &PatientEmail,
) -> Result<Vec<ConsentDocumentRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONSENT_COLUMNS} FROM consent_records
         WHERE patient_email = ?1
         ORDER BY processed_at ASC, document_id ASC"
    ))?;

    let rows = stmt
        .query_map(params![email.as_str()], read_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(consent_from_row).collect()
}

struct ConsentRow {
    document_id: String,
    patient_email: String,
    patient_name: String,
    date_of_birth: Option<String>,
    doctor_name: Option<String>,
    procedure: Option<String>,
    form_date: Option<String>,
    consented_items: String,
    declined_items: String,
    summary: String,
    search_terms: String,
    full_text: String,
    processed_at: DateTime<Utc>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<ConsentRow> {
    Ok(ConsentRow {
        document_id: row.get(0)?,
        patient_email: row.get(1)?,
        patient_name: row.get(2)?,
        date_of_birth: row.get(3)?,
        doctor_name: row.get(4)?,
        procedure: row.get(5)?,
        form_date: row.get(6)?,
        consented_items: row.get(7)?,
        declined_items: row.get(8)?,
        summary: row.get(9)?,
        search_terms: row.get(10)?,
        full_text: row.get(11)?,
        processed_at: row.get(12)?,
    })
}

fn consent_from_row(row: ConsentRow) -> Result<ConsentDocumentRecord, DatabaseError> {
    let patient_email = PatientEmail::parse(&row.patient_email)
        .map_err(|_| DatabaseError::ConstraintViolation(format!(
            "stored patient_email for {} is invalid",
            row.document_id
        )))?;

    Ok(ConsentDocumentRecord {
        raw_document_ref: row.document_id.clone(),
        document_id: row.document_id,
        full_text: row.full_text,
        record: StructuredConsentRecord {
            patient_name: row.patient_name,
            patient_email,
            date_of_birth: row.date_of_birth,
            doctor_name: row.doctor_name,
            procedure: row.procedure,
            form_date: row.form_date,
            consented_items: serde_json::from_str(&row.consented_items)?,
            declined_items: serde_json::from_str(&row.declined_items)?,
            summary: row.summary,
            search_terms: serde_json::from_str(&row.search_terms)?,
        },
        processed_at: row.processed_at,
    })
}
