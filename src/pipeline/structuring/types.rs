use serde::{Deserialize, Deserializer};

use super::StructuringError;
use crate::models::StructuredConsentRecord;
use crate::pipeline::extraction::ExtractedText;

/// The payload the model is asked to produce, exactly as it arrives.
///
/// `entities` is required; entity values and both item lists may be null
/// or absent (a null or missing list reads as empty). Extra top-level keys
/// are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawExtraction {
    #[serde(default)]
    pub summary: Option<String>,
    pub entities: RawEntities,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub consented_items: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub declined_items: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawEntities {
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub date_of_birth: Option<String>,
    pub doctor_name: Option<String>,
    pub procedure: Option<String>,
    pub date: Option<String>,
}

/// Extracted document text in, validated structured record out.
pub trait EntityExtractor: Send + Sync {
    fn extract_entities(
        &self,
        document_id: &str,
        text: &ExtractedText,
    ) -> Result<StructuredConsentRecord, StructuringError>;
}
