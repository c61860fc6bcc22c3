use serde::{Deserialize, Serialize};

/// Broad file categories we handle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileCategory {
    Pdf,
    Image,
    PlainText,
    Unsupported,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::PlainText => "plain_text",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn needs_ocr(&self) -> bool {
        matches!(self, Self::Pdf | Self::Image)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Result of format detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormatDetection {
    pub mime_type: String,
    pub category: FileCategory,
    pub size_bytes: usize,
}

pub const MAX_DOCUMENT_BYTES: usize = 100 * 1024 * 1024;

/// Bytes inspected when deciding whether unknown content is text.
const TEXT_SNIFF_BYTES: usize = 8 * 1024;

/// Detect format from magic bytes, never from the file name.
pub fn detect_format(bytes: &[u8]) -> FormatDetection {
    let size_bytes = bytes.len();
    let (mime_type, category) = if size_bytes > MAX_DOCUMENT_BYTES {
        ("application/octet-stream", FileCategory::Unsupported)
    } else {
        match bytes {
            [0x25, 0x50, 0x44, 0x46, ..] => ("application/pdf", FileCategory::Pdf),
            [0xFF, 0xD8, 0xFF, ..] => ("image/jpeg", FileCategory::Image),
            [0x89, 0x50, 0x4E, 0x47, ..] => ("image/png", FileCategory::Image),
            [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => {
                ("image/tiff", FileCategory::Image)
            }
            _ if is_likely_text(bytes) => ("text/plain", FileCategory::PlainText),
            _ => ("application/octet-stream", FileCategory::Unsupported),
        }
    };

    FormatDetection {
        mime_type: mime_type.to_string(),
        category,
        size_bytes,
    }
}

/// Valid UTF-8 (a character cut at the sniff boundary is tolerated) and no NUL bytes.
fn is_likely_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let head = &bytes[..bytes.len().min(TEXT_SNIFF_BYTES)];
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && head.len() == TEXT_SNIFF_BYTES,
    }
}
