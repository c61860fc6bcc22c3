use chrono::{DateTime, Utc};
use zeroize::Zeroize;

use super::patient::PatientEmail;

/// Opaque bearer secret. `Debug` is redacted and the value is wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// An authenticated patient session with a fixed validity window.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub patient_email: PatientEmail,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_redacted() {
        let token = SessionToken::new("super-secret-value".into());
        let shown = format!("{token:?}");
        assert!(!shown.contains("super-secret-value"));
        assert!(shown.contains("redacted"));
    }
}
