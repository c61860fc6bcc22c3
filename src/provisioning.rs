//! Patient account provisioning.
//!
//! Accounts are created exactly once per normalized email. Later documents
//! for the same patient find the existing account and never touch its
//! credential.

use std::sync::Arc;

use thiserror::Error;

use crate::clock::Clock;
use crate::crypto::{derive_default_credential, hash_password};
use crate::db::{self, Database, DatabaseError};
use crate::models::{CredentialOrigin, PatientAccount, PatientEmail};

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Another writer created the account between our lookup and insert,
    /// yet it could not be read back. Races themselves are resolved inside
    /// [`AccountProvisioner::provision`] and never surface.
    #[error("Account for {email} vanished after a concurrent create")]
    ConflictUnresolved { email: String },
}

#[derive(Clone)]
pub struct AccountProvisioner {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl AccountProvisioner {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Create-or-find the account for `email`.
    pub fn provision(
        &self,
        email: &PatientEmail,
        patient_name: &str,
    ) -> Result<PatientAccount, ProvisionError> {
        let conn = self.db.connect()?;

        if let Some(existing) = db::get_patient(&conn, email)? {
            tracing::debug!(email = %email, "Patient account already exists");
            return Ok(existing);
        }

        let credential = derive_default_credential(patient_name);
        let account = PatientAccount {
            email: email.clone(),
            patient_name: patient_name.trim().to_string(),
            password_hash: hash_password(&credential),
            credential_origin: CredentialOrigin::DerivedDefault,
            created_at: self.clock.now(),
        };

        if db::insert_patient_if_absent(&conn, &account)? {
            tracing::info!(email = %email, "Patient account provisioned");
            return Ok(account);
        }

        // Lost the create race: the winner's row is authoritative.
        tracing::debug!(email = %email, "Provision conflict, re-reading account");
        db::get_patient(&conn, email)?.ok_or_else(|| ProvisionError::ConflictUnresolved {
            email: email.to_string(),
        })
    }

    /// Read-only lookup, used by login.
    pub fn find(&self, email: &PatientEmail) -> Result<Option<PatientAccount>, ProvisionError> {
        let conn = self.db.connect()?;
        Ok(db::get_patient(&conn, email)?)
    }
}
