pub mod format;
pub mod ocr;
pub mod orchestrator;
pub mod sanitize;
pub mod types;

pub use format::*;
pub use ocr::*;
pub use orchestrator::*;
pub use sanitize::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported format for extraction: {0}")]
    UnsupportedFormat(String),

    #[error("Document contains no readable text")]
    EmptyDocument,

    #[error("Text encoding error: {0}")]
    EncodingError(String),

    #[error("No text recognition service configured for {0}")]
    RecognizerUnavailable(String),

    #[error("Text recognition service is not reachable at {0}")]
    Connection(String),

    #[error("Text recognition timed out after {0}s")]
    Timeout(u64),

    #[error("Text recognition service returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("Malformed text recognition response: {0}")]
    ResponseParsing(String),
}

impl ExtractionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Worth another attempt: timeouts, unreachable service, 5xx and 429.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Service { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ExtractionError::Timeout(420).is_transient());
        assert!(ExtractionError::Connection("http://ocr".into()).is_transient());
        assert!(ExtractionError::Service { status: 503, body: String::new() }.is_transient());
        assert!(!ExtractionError::Service { status: 400, body: String::new() }.is_transient());
        assert!(!ExtractionError::EmptyDocument.is_transient());
        assert!(!ExtractionError::UnsupportedFormat("application/zip".into()).is_transient());
    }
}
