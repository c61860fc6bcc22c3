pub mod orchestrator;
pub mod prompt;
pub mod types;

pub use orchestrator::*;
pub use prompt::*;
pub use types::*;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::session_manager::SessionError;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Question is empty")]
    EmptyQuestion,

    /// The model could not be reached after all retries. Safe to retry later.
    #[error("Answering service unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },

    #[error("Store error: {0}")]
    Store(#[from] DatabaseError),
}

impl From<SessionError> for QueryError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::AuthFailed | SessionError::SessionInvalid => Self::NotAuthenticated,
            SessionError::Lookup(inner) => {
                tracing::error!(error = %inner, "Account lookup failed during query");
                Self::NotAuthenticated
            }
        }
    }
}
