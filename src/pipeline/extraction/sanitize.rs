/// Clean one page of recognized text before it goes downstream.
/// Drops control characters (keeping newlines and tabs), trims lines and
/// removes blank ones.
pub fn sanitize_extracted_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect::<String>()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters() {
        let raw = "Patient: John\x00 Smith\x01\x02\nDate: 2024-01-15\r";
        let clean = sanitize_extracted_text(raw);
        assert!(!clean.contains('\x00'));
        assert!(!clean.contains('\x01'));
        assert!(clean.contains("John Smith"));
        assert!(clean.contains("2024-01-15"));
    }

    #[test]
    fn collapses_blank_lines() {
        let raw = "  I consent to:  \n\n\n   Surgery \n";
        assert_eq!(sanitize_extracted_text(raw), "I consent to:\nSurgery");
    }

    #[test]
    fn keeps_symbols_used_on_forms() {
        let raw = "Fee: $50 - email: jane@example.com ☑ Research ☐ Photography";
        assert_eq!(sanitize_extracted_text(raw), raw);
    }
}
