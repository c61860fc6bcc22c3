use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::RawDocument;

/// Store the uploaded bytes. An existing row is never overwritten.
/// Returns `true` if this call created the row.
pub fn insert_raw_document(conn: &Connection, doc: &RawDocument) -> Result<bool, DatabaseError> {
    let rows = conn.execute(
        "INSERT INTO raw_documents (document_id, content, uploaded_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(document_id) DO NOTHING",
        params![doc.document_id(), doc.bytes(), doc.uploaded_at()],
    )?;
    Ok(rows == 1)
}

pub fn get_raw_document(
    conn: &Connection,
    document_id: &str,
) -> Result<Option<RawDocument>, DatabaseError> {
    let result = conn.query_row(
        "SELECT document_id, content, uploaded_at FROM raw_documents WHERE document_id = ?1",
        params![document_id],
        |row| {
            Ok(RawDocument::new(
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, DateTime<Utc>>(2)?,
            ))
        },
    );

    match result {
        Ok(doc) => Ok(Some(doc)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn raw_document_is_insert_once() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("t.db")).unwrap();
        let conn = db.connect().unwrap();

        let first = RawDocument::new("form-1.pdf", b"%PDF-1.7 first".to_vec(), Utc::now());
        let second = RawDocument::new("form-1.pdf", b"%PDF-1.7 second".to_vec(), Utc::now());

        assert!(insert_raw_document(&conn, &first).unwrap());
        assert!(!insert_raw_document(&conn, &second).unwrap());

        let stored = get_raw_document(&conn, "form-1.pdf").unwrap().unwrap();
        assert_eq!(stored.bytes(), b"%PDF-1.7 first");
    }

    #[test]
    fn missing_raw_document_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("t.db")).unwrap();
        let conn = db.connect().unwrap();
        assert!(get_raw_document(&conn, "nope").unwrap().is_none());
    }
}
