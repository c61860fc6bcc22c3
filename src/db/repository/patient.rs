use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::{CredentialOrigin, PatientAccount, PatientEmail};

pub fn get_patient(
    conn: &Connection,
    email: &PatientEmail,
) -> Result<Option<PatientAccount>, DatabaseError> {
    let result = conn.query_row(
        "SELECT email, patient_name, password_hash, credential_origin, created_at
         FROM patients WHERE email = ?1",
        params![email.as_str()],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, DateTime<Utc>>(4)?,
            ))
        },
    );

    let (stored_email, patient_name, password_hash, origin, created_at) = match result {
        Ok(row) => row,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let email = PatientEmail::parse(&stored_email).map_err(|_| {
        DatabaseError::ConstraintViolation(format!("stored email is invalid: {stored_email}"))
    })?;

    Ok(Some(PatientAccount {
        email,
        patient_name,
        password_hash,
        credential_origin: CredentialOrigin::from_str(&origin)?,
        created_at,
    }))
}

/// Atomic create-if-absent keyed on email.
///
/// Returns `true` if this call created the account, `false` if an account
/// with that email already existed (the existing row is left untouched).
pub fn insert_patient_if_absent(
    conn: &Connection,
    account: &PatientAccount,
) -> Result<bool, DatabaseError> {
    let rows = conn.execute(
        "INSERT INTO patients (email, patient_name, password_hash, credential_origin, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(email) DO NOTHING",
        params![
            account.email.as_str(),
            account.patient_name,
            account.password_hash,
            account.credential_origin.as_str(),
            account.created_at,
        ],
    )?;
    Ok(rows == 1)
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?)
}
