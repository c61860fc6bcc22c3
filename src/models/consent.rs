use serde::{Deserialize, Serialize};

use super::patient::PatientEmail;

/// Validated, normalized extraction of one consent form.
///
/// Built only by the entity extraction engine; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredConsentRecord {
    pub patient_name: String,
    pub patient_email: PatientEmail,
    pub date_of_birth: Option<String>,
    pub doctor_name: Option<String>,
    pub procedure: Option<String>,
    pub form_date: Option<String>,
    pub consented_items: Vec<String>,
    pub declined_items: Vec<String>,
    pub summary: String,
    pub search_terms: Vec<String>,
}
