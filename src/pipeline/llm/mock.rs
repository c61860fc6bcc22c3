use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use super::{LlmClient, LlmError};

/// Mock LLM client for testing: always returns the same response.
pub struct MockLlmClient {
    response: String,
    calls: AtomicU32,
    last_prompt: Mutex<Option<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicU32::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }
        Ok(self.response.clone())
    }
}

/// One scripted outcome for [`ScriptedLlmClient`].
#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(String),
    Timeout,
    Unavailable,
}

/// Plays back a fixed sequence of outcomes; the last one repeats.
pub struct ScriptedLlmClient {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicU32,
}

impl ScriptedLlmClient {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmClient for ScriptedLlmClient {
    fn generate(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = {
            let mut script = self
                .script
                .lock()
                .map_err(|_| LlmError::HttpClient("script lock poisoned".into()))?;
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };

        match next {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Timeout) => Err(LlmError::Timeout(1)),
            Some(Scripted::Unavailable) | None => Err(LlmError::Service {
                status: 503,
                body: "model unavailable".into(),
            }),
        }
    }
}
