use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::format::FormatDetection;
use super::types::TextRecognizer;
use super::ExtractionError;

/// Client for a remote document text recognition service.
///
/// Contract: `POST <endpoint>` with `{"mime_type", "content"}` (base64
/// document bytes); the response is `{"pages": [...]}` where each page is
/// either a string or an object with a `text` field, in page order.
pub struct HttpOcrClient {
    endpoint: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpOcrClient {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Connection(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
            timeout_secs,
        })
    }
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    mime_type: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    pages: Vec<RecognizedPage>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecognizedPage {
    Text(String),
    Object { text: String },
}

impl RecognizedPage {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) | Self::Object { text } => text,
        }
    }
}

impl TextRecognizer for HttpOcrClient {
    fn recognize(
        &self,
        bytes: &[u8],
        format: &FormatDetection,
    ) -> Result<Vec<String>, ExtractionError> {
        let body = RecognizeRequest {
            mime_type: &format.mime_type,
            content: base64::engine::general_purpose::STANDARD.encode(bytes),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    ExtractionError::Connection(self.endpoint.clone())
                } else {
                    ExtractionError::ResponseParsing(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RecognizeResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Timeout(self.timeout_secs)
            } else {
                ExtractionError::ResponseParsing(e.to_string())
            }
        })?;

        Ok(parsed.pages.into_iter().map(RecognizedPage::into_text).collect())
    }
}

/// Mock recognizer for unit testing without a recognition service.
pub struct MockOcrEngine {
    pages: Vec<String>,
    timeouts_remaining: AtomicU32,
    calls: AtomicU32,
}

impl MockOcrEngine {
    pub fn new(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            timeouts_remaining: AtomicU32::new(0),
            calls: AtomicU32::new(0),
        }
    }

    /// Time out on the first `n` calls, then succeed.
    pub fn with_timeouts(self, n: u32) -> Self {
        self.timeouts_remaining.store(n, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for MockOcrEngine {
    fn recognize(
        &self,
        _bytes: &[u8],
        _format: &FormatDetection,
    ) -> Result<Vec<String>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let timed_out = self
            .timeouts_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if timed_out {
            return Err(ExtractionError::Timeout(1));
        }
        Ok(self.pages.clone())
    }
}
