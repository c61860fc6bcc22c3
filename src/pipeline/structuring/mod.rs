pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod sanitize;
pub mod types;
pub mod validation;

pub use orchestrator::*;
pub use parser::*;
pub use prompt::*;
pub use sanitize::*;
pub use types::*;
pub use validation::*;


use thiserror::Error;

use crate::pipeline::llm::LlmError;

#[derive(Error, Debug)]
pub enum StructuringError {
    #[error("Model call failed: {0}")]
    Llm(#[from] LlmError),

    /// Response not parseable as the extraction schema, or identity missing/invalid.
    #[error("Malformed extraction: {0}")]
    MalformedExtraction(String),

    #[error("Input text too short for extraction (< {0} characters)")]
    InputTooShort(usize),
}

impl StructuringError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Llm(e) if e.is_timeout())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Llm(e) if e.is_transient())
    }
}
