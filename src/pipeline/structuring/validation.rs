// Validation and normalization between the parsed model payload and the
// stored record. Identity fields are mandatory; everything else is kept
// as extracted, with placeholders folded to absent.

use std::collections::HashSet;

use super::types::RawExtraction;
use super::StructuringError;
use crate::models::{PatientEmail, StructuredConsentRecord};

/// Values models use to say "not found". Compared case-insensitively.
const PLACEHOLDERS: &[&str] = &[
    "n/a",
    "na",
    "none",
    "null",
    "nil",
    "unknown",
    "not found",
    "not provided",
    "not available",
    "not specified",
    "-",
    "--",
];

fn is_placeholder(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    lowered.is_empty() || PLACEHOLDERS.contains(&lowered.as_str())
}

/// Trimmed value, or `None` for empty and placeholder values.
fn clean_field(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !is_placeholder(v))
}

/// Trim, drop placeholders, de-duplicate case-insensitively keeping the
/// first spelling seen.
pub fn dedupe_items(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !is_placeholder(item))
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

/// Lower-cased word tokens of name, email local part and procedure, in
/// first-seen order, followed by `entity_type:value` pairs for present entities.
pub fn build_search_terms(
    patient_name: &str,
    email: &PatientEmail,
    procedure: Option<&str>,
    doctor_name: Option<&str>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut terms = Vec::new();

    let sources = [Some(patient_name), Some(email.local_part()), procedure];
    for source in sources.into_iter().flatten() {
        for token in source
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
        {
            if seen.insert(token.clone()) {
                terms.push(token);
            }
        }
    }

    let pairs = [
        ("patient_name", Some(patient_name)),
        ("patient_email", Some(email.as_str())),
        ("procedure", procedure),
        ("doctor_name", doctor_name),
    ];
    for (entity_type, value) in pairs {
        if let Some(value) = value {
            let term = format!("{entity_type}:{}", value.trim().to_lowercase());
            if seen.insert(term.clone()) {
                terms.push(term);
            }
        }
    }

    terms
}

/// Turn a parsed payload into a record, or reject it.
pub fn validate_extraction(raw: RawExtraction) -> Result<StructuredConsentRecord, StructuringError> {
    let entities = raw.entities;

    let patient_name = clean_field(entities.patient_name)
        .ok_or_else(|| StructuringError::MalformedExtraction("patient_name missing".into()))?;

    let raw_email = clean_field(entities.patient_email)
        .ok_or_else(|| StructuringError::MalformedExtraction("patient_email missing".into()))?;
    let patient_email = PatientEmail::parse(&raw_email).map_err(|_| {
        StructuringError::MalformedExtraction("patient_email is not a valid address".into())
    })?;

    let procedure = clean_field(entities.procedure);
    let doctor_name = clean_field(entities.doctor_name);
    let search_terms = build_search_terms(
        &patient_name,
        &patient_email,
        procedure.as_deref(),
        doctor_name.as_deref(),
    );

    Ok(StructuredConsentRecord {
        patient_name,
        patient_email,
        date_of_birth: clean_field(entities.date_of_birth),
        doctor_name,
        procedure,
        form_date: clean_field(entities.date),
        consented_items: dedupe_items(raw.consented_items),
        declined_items: dedupe_items(raw.declined_items),
        summary: raw.summary.map(|s| s.trim().to_string()).unwrap_or_default(),
        search_terms,
    })
}
