use crate::models::ConsentDocumentRecord;

pub const QUERY_SYSTEM_PROMPT: &str = r#"You are a medical consent assistant. You answer a patient's questions about their OWN consent forms.

RULES:
1. Use ONLY the consent form information provided in the prompt.
2. Never mention, guess at or reference any other patient.
3. If the patient asks about another person, politely decline and explain you can only discuss their own consent forms.
4. If the information is not in the provided forms, say so clearly and suggest contacting their healthcare provider.
5. Answer clearly and concisely in a friendly, professional tone."#;

/// Deterministic answer when the patient has no records. The model is not called.
pub fn no_records_answer() -> String {
    "I don't have any consent forms on file for you. Please contact your healthcare provider."
        .to_string()
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None listed".to_string()
    } else {
        items.join(", ")
    }
}

/// Context block built only from the given records.
pub fn build_context(records: &[ConsentDocumentRecord]) -> String {
    let mut context = String::new();
    for doc in records {
        let r = &doc.record;
        context.push_str(&format!("Consent Form: {}\n", doc.document_id));
        context.push_str(&format!("Patient: {}\n", r.patient_name));
        if let Some(procedure) = &r.procedure {
            context.push_str(&format!("Procedure: {procedure}\n"));
        }
        if let Some(doctor) = &r.doctor_name {
            context.push_str(&format!("Doctor: {doctor}\n"));
        }
        if let Some(date) = &r.form_date {
            context.push_str(&format!("Form date: {date}\n"));
        }
        if !r.summary.is_empty() {
            context.push_str(&format!("Summary: {}\n", r.summary));
        }
        context.push_str(&format!("Items Consented To: {}\n", join_or_none(&r.consented_items)));
        context.push_str(&format!("Items Declined: {}\n\n", join_or_none(&r.declined_items)));
    }
    context
}

/// Full prompt: the patient's own records, then the question.
pub fn build_query_prompt(question: &str, records: &[ConsentDocumentRecord]) -> String {
    format!(
        "<CONSENT_FORMS>\n{}</CONSENT_FORMS>\n\n\
         Patient's question: {}\n\n\
         Answer based ONLY on the consent forms above. They all belong to the patient asking. \
         Do not discuss any other patient, and decline any request about someone else.",
        build_context(records),
        question.trim()
    )
}
