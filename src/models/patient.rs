use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::enums::CredentialOrigin;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9\-]+(\.[a-z0-9\-]+)*\.[a-z]{2,}$")
        .expect("email pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid patient email address")]
pub struct InvalidEmail;

/// Normalized (trimmed, lower-cased) and syntactically valid email address.
///
/// This is the partition key for every piece of patient-scoped data. A
/// value of this type can only be obtained through [`PatientEmail::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatientEmail(String);

impl PatientEmail {
    pub fn parse(raw: &str) -> Result<Self, InvalidEmail> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() || !EMAIL_PATTERN.is_match(&normalized) {
            return Err(InvalidEmail);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the `@`.
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }
}

impl std::fmt::Display for PatientEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PatientEmail {
    type Error = InvalidEmail;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PatientEmail> for String {
    fn from(value: PatientEmail) -> Self {
        value.0
    }
}

/// Login identity for one patient. Keyed by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientAccount {
    pub email: PatientEmail,
    pub patient_name: String,
    /// Hex SHA-256 of the credential. Never serialized to callers.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub credential_origin: CredentialOrigin,
    pub created_at: DateTime<Utc>,
}
