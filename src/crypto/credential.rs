//! Default credential derivation and password hashing.
//!
//! A newly provisioned patient's initial password is
//! `<first name token, lower-cased><DEFAULT_CREDENTIAL_SUFFIX>`, e.g.
//! "John Smith" → `john123!`, "Mary-Jane Watson" → `mary-jane123!`. The first
//! whitespace-separated token is kept as written apart from lower-casing.
//! An empty or all-whitespace name falls back to `patient123!`. This is the
//! only place the rule lives; operators hand it to patients as their initial
//! access.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::config::{DEFAULT_CREDENTIAL_FALLBACK_NAME, DEFAULT_CREDENTIAL_SUFFIX};

/// Derive the initial credential for a patient from their display name.
pub fn derive_default_credential(patient_name: &str) -> Zeroizing<String> {
    let first = patient_name
        .split_whitespace()
        .next()
        .map(str::to_lowercase)
        .unwrap_or_else(|| DEFAULT_CREDENTIAL_FALLBACK_NAME.to_string());

    Zeroizing::new(format!("{first}{DEFAULT_CREDENTIAL_SUFFIX}"))
}

/// One-way hash of a password: lower-case hex SHA-256.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Compare a supplied password against a stored hash without early exit.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let candidate = hash_password(password);
    candidate.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}
