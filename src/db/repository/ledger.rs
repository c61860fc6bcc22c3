use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::{IngestionLedgerEntry, IngestionStage, LedgerStatus};

const LEDGER_COLUMNS: &str = "document_id, status, stage, failure_reason, attempts, updated_at";

pub fn get_ledger_entry(
    conn: &Connection,
    document_id: &str,
) -> Result<Option<IngestionLedgerEntry>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {LEDGER_COLUMNS} FROM ingestion_ledger WHERE document_id = ?1"),
        params![document_id],
        read_row,
    );

    match result {
        Ok(row) => Ok(Some(entry_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Start (or restart after an earlier failure) tracking a document at `Received`.
/// A document already marked complete is left as is.
pub fn begin_ingestion(
    conn: &Connection,
    document_id: &str,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO ingestion_ledger (document_id, status, stage, failure_reason, attempts, updated_at)
         VALUES (?1, ?2, ?3, NULL, 0, ?4)
         ON CONFLICT(document_id) DO UPDATE SET
             status = excluded.status,
             stage = excluded.stage,
             failure_reason = NULL,
             attempts = 0,
             updated_at = excluded.updated_at
         WHERE ingestion_ledger.status != ?5",
        params![
            document_id,
            LedgerStatus::InProgress.as_str(),
            IngestionStage::Received.as_str(),
            now,
            LedgerStatus::Complete.as_str(),
        ],
    )?;
    Ok(())
}

/// Record that a document reached `stage`, with the attempts it took.
///
/// A row already `complete` is terminal and left untouched.
pub fn advance_stage(
    conn: &Connection,
    document_id: &str,
    stage: IngestionStage,
    attempts: u32,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let status = if stage == IngestionStage::Complete {
        LedgerStatus::Complete
    } else {
        LedgerStatus::InProgress
    };
    let rows = conn.execute(
        "UPDATE ingestion_ledger SET status = ?2, stage = ?3, attempts = ?4, updated_at = ?5
         WHERE document_id = ?1 AND status != ?6",
        params![
            document_id,
            status.as_str(),
            stage.as_str(),
            attempts,
            now,
            LedgerStatus::Complete.as_str(),
        ],
    )?;
    if rows == 0 && get_ledger_entry(conn, document_id)?.is_none() {
        return Err(DatabaseError::NotFound {
            entity_type: "IngestionLedgerEntry".into(),
            id: document_id.into(),
        });
    }
    Ok(())
}

/// Durable failure record: the stage that failed and why.
///
/// Returns `false` when the document is already `complete` (a concurrent
/// delivery finished it); the completed row is kept.
pub fn record_failure(
    conn: &Connection,
    document_id: &str,
    stage: IngestionStage,
    reason: &str,
    attempts: u32,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let rows = conn.execute(
        "INSERT INTO ingestion_ledger (document_id, status, stage, failure_reason, attempts, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(document_id) DO UPDATE SET
             status = excluded.status,
             stage = excluded.stage,
             failure_reason = excluded.failure_reason,
             attempts = excluded.attempts,
             updated_at = excluded.updated_at
         WHERE ingestion_ledger.status != ?7",
        params![
            document_id,
            LedgerStatus::Failed.as_str(),
            stage.as_str(),
            reason,
            attempts,
            now,
            LedgerStatus::Complete.as_str(),
        ],
    )?;
    Ok(rows == 1)
}

/// Failed documents, most recent first.
pub fn list_failures(conn: &Connection) -> Result<Vec<IngestionLedgerEntry>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LEDGER_COLUMNS} FROM ingestion_ledger
         WHERE status = ?1 ORDER BY updated_at DESC, document_id ASC"
    ))?;
    let rows = stmt
        .query_map(params![LedgerStatus::Failed.as_str()], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(entry_from_row).collect()
}

type LedgerRow = (String, String, String, Option<String>, u32, DateTime<Utc>);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn entry_from_row(row: LedgerRow) -> Result<IngestionLedgerEntry, DatabaseError> {
    let (document_id, status, stage, failure_reason, attempts, updated_at) = row;
    Ok(IngestionLedgerEntry {
        document_id,
        status: LedgerStatus::from_str(&status)?,
        stage: IngestionStage::from_str(&stage)?,
        failure_reason,
        attempts,
        updated_at,
    })
}
