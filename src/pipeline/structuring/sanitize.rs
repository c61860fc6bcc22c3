// Sanitize document text before it is embedded in an extraction prompt.
// Strips invisible Unicode and lines that try to steer the model, then
// normalizes whitespace and bounds the length.

/// Maximum input length to send to the model (characters).
const MAX_INPUT_LENGTH: usize = 50_000;

const ROLE_MARKERS: &[&str] = &[
    "system:",
    "assistant:",
    "user:",
    "[system]",
    "[assistant]",
    "[inst]",
    "[/inst]",
    "<<sys>>",
    "note to ai:",
    "instructions:",
    "system update:",
];

const OVERRIDE_PHRASES: &[&str] = &[
    "ignore previous instructions",
    "ignore all instructions",
    "ignore the above instructions",
    "disregard your instructions",
    "disregard all instructions",
    "forget your instructions",
    "new instructions:",
    "override:",
    "set patient_email to",
    "set the patient email to",
];

const INSTRUCTION_TAGS: &[&str] = &[
    "<instruction",
    "</instruction",
    "<system",
    "</system",
    "<document",
    "</document",
];

/// Clean text for the model. When injection lines are removed a warning is
/// logged with the count and document id, never the content.
pub fn sanitize_for_llm(raw: &str, doc_id: &str) -> String {
    let visible = remove_invisible_chars(raw);
    let (kept, removed) = remove_injection_lines(&visible);

    if removed > 0 {
        tracing::warn!(
            doc_id = %doc_id,
            removed_lines = removed,
            "Injection patterns removed from document input"
        );
    }

    truncate_chars(&normalize_whitespace(&kept), MAX_INPUT_LENGTH)
}

fn remove_invisible_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if matches!(c, ' ' | '\n' | '\t') {
                return true;
            }
            let invisible = matches!(
                c,
                '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
            );
            !invisible && !c.is_control()
        })
        .collect()
}

fn is_suspicious(lowered: &str) -> bool {
    ROLE_MARKERS.iter().any(|m| lowered.starts_with(m))
        || INSTRUCTION_TAGS.iter().any(|t| lowered.starts_with(t))
        || OVERRIDE_PHRASES.iter().any(|p| lowered.contains(p))
}

/// Drop suspicious lines. An override phrase split across two lines drops both.
fn remove_injection_lines(text: &str) -> (String, usize) {
    let lines: Vec<&str> = text.lines().collect();
    let lowered: Vec<String> = lines.iter().map(|l| l.trim().to_lowercase()).collect();
    let mut kept = Vec::with_capacity(lines.len());
    let mut removed = 0usize;
    let mut i = 0;

    while i < lines.len() {
        if is_suspicious(&lowered[i]) {
            removed += 1;
            i += 1;
            continue;
        }
        if let Some(next) = lowered.get(i + 1) {
            if !is_suspicious(next) {
                let joined = format!("{} {}", lowered[i], next);
                if OVERRIDE_PHRASES.iter().any(|p| joined.contains(p)) {
                    removed += 2;
                    i += 2;
                    continue;
                }
            }
        }
        kept.push(lines[i]);
        i += 1;
    }

    (kept.join("\n"), removed)
}

/// Trim each line and collapse runs of blank lines into one.
fn normalize_whitespace(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last() == Some(&"") {
        out.pop();
    }
    out.join("\n")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => {
            let head = &text[..cut];
            let end = head.rfind(char::is_whitespace).unwrap_or(cut);
            format!("{}[TRUNCATED]", &text[..end])
        }
    }
}
