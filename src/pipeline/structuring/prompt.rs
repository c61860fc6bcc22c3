pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"
You are a medical consent form extraction assistant. Your ONLY role is to
read the text of a consent form and report what it explicitly states.

RULES:
1. Extract ONLY information explicitly stated in the document.
2. NEVER infer, guess or invent values. If a value is not present, use null.
3. Copy names, email addresses and dates exactly as written.
4. Respond with ONE JSON object and nothing else.
"#;

/// Build the extraction prompt for one document.
pub fn build_extraction_prompt(document_text: &str) -> String {
    format!(
        r#"<document>
{document_text}
</document>

Analyze the consent form above and respond ONLY with a valid JSON object with
exactly these keys:

{{
  "summary": "one-paragraph summary of the document's purpose",
  "entities": {{
    "patient_name": "full name or null",
    "patient_email": "email address or null",
    "date_of_birth": "as written or null",
    "doctor_name": "name or null",
    "procedure": "procedure name or null",
    "date": "date the form was signed or null"
  }},
  "consented_items": ["each item the patient consented to"],
  "declined_items": ["each item the patient declined"]
}}

Patient name and email identify who may read this record later; extract them
carefully and never fill them with a placeholder."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_document_text() {
        let prompt = build_extraction_prompt("I, John Smith, consent to surgery.");
        assert!(prompt.contains("<document>\nI, John Smith, consent to surgery.\n</document>"));
    }

    #[test]
    fn prompt_names_every_schema_key() {
        let prompt = build_extraction_prompt("x");
        for key in [
            "summary",
            "entities",
            "patient_name",
            "patient_email",
            "date_of_birth",
            "doctor_name",
            "procedure",
            "\"date\"",
            "consented_items",
            "declined_items",
        ] {
            assert!(prompt.contains(key), "missing {key}");
        }
    }

    #[test]
    fn system_prompt_forbids_inference() {
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("NEVER infer"));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("JSON"));
    }
}
