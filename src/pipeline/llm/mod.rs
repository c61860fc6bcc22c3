//! Generative model boundary: prompt in, text out.

pub mod mock;
pub mod ollama;

pub use mock::*;
pub use ollama::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Model service is not running at {0}")]
    Connection(String),

    #[error("Model request timed out after {0}s")]
    Timeout(u64),

    #[error("Model service returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl LlmError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Worth another attempt: timeouts, unreachable service, 5xx and 429.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) | Self::HttpClient(_) => true,
            Self::Service { status, .. } => *status >= 500 || *status == 429,
            Self::ResponseParsing(_) => false,
        }
    }
}

/// Text generation seam. Implementations carry their own model name and
/// per-call timeout.
pub trait LlmClient: Send + Sync {
    fn generate(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}
