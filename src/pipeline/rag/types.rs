use serde::Serialize;

/// Answer to one patient question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    /// Model output, verbatim.
    pub answer: String,
    /// Identifiers of the documents the answer was grounded on.
    pub sources: Vec<String>,
}
