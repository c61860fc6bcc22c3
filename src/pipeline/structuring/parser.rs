use super::types::RawExtraction;
use super::StructuringError;

/// Parse the model's response strictly into [`RawExtraction`].
///
/// The only leniency is unwrapping a single Markdown code fence around the
/// object; any other surrounding text makes the response malformed.
pub fn parse_extraction_response(response: &str) -> Result<RawExtraction, StructuringError> {
    let json_str = unwrap_code_fence(response.trim())?;
    if json_str.is_empty() {
        return Err(StructuringError::MalformedExtraction("empty response".into()));
    }

    serde_json::from_str::<RawExtraction>(json_str)
        .map_err(|e| StructuringError::MalformedExtraction(format!("schema mismatch: {e}")))
}

fn unwrap_code_fence(response: &str) -> Result<&str, StructuringError> {
    let Some(rest) = response.strip_prefix("```") else {
        return Ok(response);
    };
    // Optional language tag on the opening fence line.
    let body_start = rest.find('\n').map(|i| i + 1).unwrap_or(rest.len());
    let tag = rest[..body_start].trim();
    if !tag.is_empty() && !tag.eq_ignore_ascii_case("json") {
        return Err(StructuringError::MalformedExtraction(format!(
            "unexpected code fence language: {tag}"
        )));
    }
    let body = &rest[body_start..];
    let body = body
        .trim_end()
        .strip_suffix("```")
        .ok_or_else(|| StructuringError::MalformedExtraction("unclosed code fence".into()))?;
    Ok(body.trim())
}
