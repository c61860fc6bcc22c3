//! Query resolution: session token + question → answer over the caller's own forms.
//!
//! The patient email used for the store read comes only from the session
//! manager. Nothing in the request can name another patient.

use std::sync::Arc;
use std::time::Duration;

use super::prompt::{build_query_prompt, no_records_answer, QUERY_SYSTEM_PROMPT};
use super::types::QueryAnswer;
use super::QueryError;
use crate::config::{MAX_QUERY_RETRIES, QUERY_RETRY_BASE_DELAY_MS};
use crate::pipeline::llm::LlmClient;
use crate::session_manager::SessionManager;
use crate::store::ConsentStore;

pub struct QueryEngine {
    sessions: Arc<SessionManager>,
    store: ConsentStore,
    llm: Arc<dyn LlmClient>,
    retry_base_delay: Duration,
}

impl QueryEngine {
    pub fn new(sessions: Arc<SessionManager>, store: ConsentStore, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            sessions,
            store,
            llm,
            retry_base_delay: Duration::from_millis(QUERY_RETRY_BASE_DELAY_MS),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn answer(&self, token: &str, question: &str) -> Result<QueryAnswer, QueryError> {
        let email = self.sessions.validate(token)?;

        if question.trim().is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let span = tracing::info_span!("query", email = %email);
        let _enter = span.enter();

        let records = self.store.records_for_patient(&email)?;
        if records.is_empty() {
            tracing::info!("No consent records on file");
            return Ok(QueryAnswer {
                answer: no_records_answer(),
                sources: Vec::new(),
            });
        }

        let prompt = build_query_prompt(question, &records);
        let answer = self.generate_with_retries(&prompt)?;
        let sources = records.iter().map(|r| r.document_id.clone()).collect();

        tracing::info!(records = records.len(), "Query answered");
        Ok(QueryAnswer { answer, sources })
    }

    fn generate_with_retries(&self, prompt: &str) -> Result<String, QueryError> {
        let max_attempts = MAX_QUERY_RETRIES + 1;
        let mut attempt = 1;
        loop {
            match self.llm.generate(prompt, QUERY_SYSTEM_PROMPT) {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    tracing::warn!(attempt, error = %e, "Model call failed, retrying");
                    let backoff = self.retry_base_delay * 2u32.saturating_pow(attempt - 1);
                    if !backoff.is_zero() {
                        std::thread::sleep(backoff);
                    }
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "Model unavailable for query");
                    return Err(QueryError::Unavailable { attempts: attempt });
                }
            }
        }
    }
}
