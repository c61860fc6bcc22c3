use std::sync::Arc;

use super::parser::parse_extraction_response;
use super::prompt::{build_extraction_prompt, EXTRACTION_SYSTEM_PROMPT};
use super::sanitize::sanitize_for_llm;
use super::types::EntityExtractor;
use super::validation::validate_extraction;
use super::StructuringError;
use crate::models::StructuredConsentRecord;
use crate::pipeline::extraction::ExtractedText;
use crate::pipeline::llm::LlmClient;

/// Minimum sanitized input length worth sending to the model (characters).
const MIN_INPUT_LENGTH: usize = 10;

/// One extraction attempt: sanitize → prompt → model → parse → validate.
///
/// Each call validates from scratch. Retrying transient failures is the
/// caller's decision.
pub struct LlmEntityExtractor {
    llm: Arc<dyn LlmClient>,
}

impl LlmEntityExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

impl EntityExtractor for LlmEntityExtractor {
    fn extract_entities(
        &self,
        document_id: &str,
        text: &ExtractedText,
    ) -> Result<StructuredConsentRecord, StructuringError> {
        let sanitized = sanitize_for_llm(&text.full_text(), document_id);
        if sanitized.chars().count() < MIN_INPUT_LENGTH {
            return Err(StructuringError::InputTooShort(MIN_INPUT_LENGTH));
        }

        let prompt = build_extraction_prompt(&sanitized);
        let response = self.llm.generate(&prompt, EXTRACTION_SYSTEM_PROMPT)?;

        let record = parse_extraction_response(&response).and_then(validate_extraction);
        match &record {
            Ok(r) => tracing::info!(
                doc_id = %document_id,
                consented = r.consented_items.len(),
                declined = r.declined_items.len(),
                "Entities extracted"
            ),
            Err(e) => tracing::warn!(doc_id = %document_id, error = %e, "Extraction rejected"),
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::{MockLlmClient, Scripted, ScriptedLlmClient};

    fn text() -> ExtractedText {
        ExtractedText::new(vec![
            "Consent form. Patient: John Smith (john.smith@example.com).".into(),
            "I consent to Surgery. I decline Research.".into(),
        ])
    }

    const GOOD_RESPONSE: &str = r#"```json
{
  "summary": "Consent for surgery.",
  "entities": {"patient_name": "John Smith", "patient_email": "john.smith@example.com",
               "date_of_birth": null, "doctor_name": null, "procedure": "Surgery", "date": null},
  "consented_items": ["Surgery"],
  "declined_items": ["Research"]
}
```"#;

    #[test]
    fn extracts_record_from_model_response() {
        let llm = Arc::new(MockLlmClient::new(GOOD_RESPONSE));
        let extractor = LlmEntityExtractor::new(llm.clone());
        let record = extractor.extract_entities("doc-1", &text()).unwrap();

        assert_eq!(record.patient_email.as_str(), "john.smith@example.com");
        assert_eq!(record.declined_items, vec!["Research"]);
        assert_eq!(llm.calls(), 1);
        let prompt = llm.last_prompt().unwrap();
        assert!(prompt.contains("I consent to Surgery."));
    }

    #[test]
    fn malformed_response_is_not_transient() {
        let extractor = LlmEntityExtractor::new(Arc::new(MockLlmClient::new("I cannot help.")));
        let err = extractor.extract_entities("doc-1", &text()).unwrap_err();
        assert!(matches!(err, StructuringError::MalformedExtraction(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn model_timeout_is_transient() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![Scripted::Timeout]));
        let extractor = LlmEntityExtractor::new(llm);
        let err = extractor.extract_entities("doc-1", &text()).unwrap_err();
        assert!(err.is_timeout());
        assert!(err.is_transient());
    }

    #[test]
    fn too_short_input_skips_model() {
        let llm = Arc::new(MockLlmClient::new(GOOD_RESPONSE));
        let extractor = LlmEntityExtractor::new(llm.clone());
        let err = extractor
            .extract_entities("doc-1", &ExtractedText::new(vec!["hi".into()]))
            .unwrap_err();
        assert!(matches!(err, StructuringError::InputTooShort(_)));
        assert_eq!(llm.calls(), 0);
    }
}
