//! Patient session management.
//!
//! Sessions live in a sharded concurrent map keyed by the SHA-256 of the
//! bearer token. Validation of one token never waits on a write to another,
//! and lookups compare fixed-size digests rather than the secret itself.
//! Validity is a fixed window from issuance; expired entries are treated
//! exactly like revoked ones and purged lazily or by [`SessionManager::sweep_expired`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use thiserror::Error;

use crate::clock::Clock;
use crate::config::SESSION_TTL_HOURS;
use crate::crypto::{generate_token, hash_password, hash_token, verify_password};
use crate::models::{PatientEmail, Session, SessionToken};
use crate::provisioning::{AccountProvisioner, ProvisionError};

#[derive(Error, Debug)]
pub enum SessionError {
    /// Unknown email, wrong password and malformed email all map here.
    #[error("Authentication failed")]
    AuthFailed,

    #[error("Session is invalid or expired")]
    SessionInvalid,

    #[error("Account lookup failed: {0}")]
    Lookup(#[from] ProvisionError),
}

#[derive(Debug, Clone)]
struct SessionEntry {
    patient_email: PatientEmail,
    expires_at: DateTime<Utc>,
}

pub struct SessionManager {
    sessions: DashMap<[u8; 32], SessionEntry>,
    accounts: AccountProvisioner,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    /// Compared against when the email is unknown so both failure paths
    /// do the same work.
    decoy_hash: String,
}

impl SessionManager {
    pub fn new(accounts: AccountProvisioner, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            accounts,
            clock,
            ttl: Duration::hours(SESSION_TTL_HOURS),
            decoy_hash: hash_password(&generate_token()),
        }
    }

    /// Authenticate and issue a new session.
    pub fn login(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        let Ok(email) = PatientEmail::parse(email) else {
            verify_password(password, &self.decoy_hash);
            return Err(SessionError::AuthFailed);
        };

        let account = self.accounts.find(&email)?;
        let stored = account
            .as_ref()
            .map(|a| a.password_hash.as_str())
            .unwrap_or(&self.decoy_hash);
        let matches = verify_password(password, stored);

        if account.is_none() || !matches {
            tracing::info!("Login rejected");
            return Err(SessionError::AuthFailed);
        }

        let token = SessionToken::new(generate_token());
        let issued_at = self.clock.now();
        let entry = SessionEntry {
            patient_email: email.clone(),
            expires_at: issued_at + self.ttl,
        };
        self.sessions.insert(hash_token(token.expose()), entry.clone());
        tracing::info!(email = %email, expires_at = %entry.expires_at, "Session issued");

        Ok(Session {
            token,
            patient_email: email,
            issued_at,
            expires_at: entry.expires_at,
        })
    }

    /// Resolve a bearer token to the owning patient.
    pub fn validate(&self, token: &str) -> Result<PatientEmail, SessionError> {
        let key = hash_token(token);
        let now = self.clock.now();

        match self.sessions.get(&key) {
            None => return Err(SessionError::SessionInvalid),
            Some(entry) if now < entry.expires_at => return Ok(entry.patient_email.clone()),
            Some(_) => {}
        }

        self.sessions.remove_if(&key, |_, entry| now >= entry.expires_at);
        Err(SessionError::SessionInvalid)
    }

    /// Revoke a session. Unknown or already revoked tokens are a no-op.
    pub fn logout(&self, token: &str) {
        if self.sessions.remove(&hash_token(token)).is_some() {
            tracing::info!("Session revoked");
        }
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| now < entry.expires_at);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::debug!(removed, "Expired sessions swept");
        }
        removed
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
