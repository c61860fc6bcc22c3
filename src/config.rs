use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Application-level constants
pub const APP_NAME: &str = "Consent Vault";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed session validity from issuance (not sliding).
pub const SESSION_TTL_HOURS: i64 = 8;

/// Attempts per ingestion stage on timeout/transient errors.
pub const MAX_STAGE_ATTEMPTS: u32 = 3;

/// Base delay between ingestion stage attempts; doubles per attempt.
pub const INGEST_RETRY_BASE_DELAY_MS: u64 = 500;

/// Documents ingested concurrently by a batch run.
pub const INGEST_MAX_PARALLEL: usize = 4;

/// Retries (after the first call) before a query surfaces `QueryUnavailable`.
pub const MAX_QUERY_RETRIES: u32 = 2;

/// Base delay for query retry backoff; doubles per retry.
pub const QUERY_RETRY_BASE_DELAY_MS: u64 = 250;

/// Suffix appended to the lower-cased first name to form the initial credential.
pub const DEFAULT_CREDENTIAL_SUFFIX: &str = "123!";

/// First-name token used when the extracted name yields none.
pub const DEFAULT_CREDENTIAL_FALLBACK_NAME: &str = "patient";

/// Largest accepted upload request body (base64 inflates documents by a third).
pub const MAX_UPLOAD_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Interval between sweeps of expired sessions.
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 600;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "gemma2";
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 420;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "consentvault=info,consentvault_lib=info,tower_http=warn"
}

/// Default on-disk database location.
pub fn default_database_path() -> PathBuf {
    PathBuf::from("consentvault.db")
}

/// Runtime settings, from CLI flags with environment fallback.
#[derive(Parser, Debug, Clone)]
#[command(name = "consentvault")]
#[command(about = "Consent form ingestion and patient-scoped question answering")]
pub struct Settings {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value_os_t = default_database_path())]
    pub database_path: PathBuf,

    /// Ollama base URL for the generative model
    #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
    pub ollama_url: String,

    /// Generative model name
    #[arg(long, env = "OLLAMA_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Per-call timeout for the generative model, seconds
    #[arg(long, env = "MODEL_TIMEOUT_SECS", default_value_t = DEFAULT_MODEL_TIMEOUT_SECS)]
    pub model_timeout_secs: u64,

    /// Text recognition service endpoint (POST, base64 document in, pages out)
    #[arg(long, env = "OCR_URL")]
    pub ocr_url: Option<String>,

    /// Per-call timeout for the text recognition service, seconds
    #[arg(long, env = "OCR_TIMEOUT_SECS", default_value_t = DEFAULT_OCR_TIMEOUT_SECS)]
    pub ocr_timeout_secs: u64,

    /// Directory of documents to ingest once at startup
    #[arg(long, env = "INBOX_DIR")]
    pub inbox_dir: Option<PathBuf>,

    /// Shared secret required on `X-Upload-Key` for uploads (unset: open)
    #[arg(long, env = "UPLOAD_KEY", hide_env_values = true)]
    pub upload_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_defaults() {
        let settings = Settings::try_parse_from(["consentvault"]).unwrap();
        assert_eq!(settings.listen.port(), 8080);
        assert_eq!(settings.ollama_url, DEFAULT_OLLAMA_URL);
        assert!(settings.ocr_url.is_none());
        assert_eq!(settings.model_timeout_secs, DEFAULT_MODEL_TIMEOUT_SECS);
    }

    #[test]
    fn settings_from_flags() {
        let settings = Settings::try_parse_from([
            "consentvault",
            "--listen",
            "127.0.0.1:9000",
            "--ocr-url",
            "http://ocr.local/extract",
            "--inbox-dir",
            "/tmp/inbox",
        ])
        .unwrap();
        assert_eq!(settings.listen.port(), 9000);
        assert_eq!(settings.ocr_url.as_deref(), Some("http://ocr.local/extract"));
        assert_eq!(settings.inbox_dir, Some(PathBuf::from("/tmp/inbox")));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn session_ttl_is_eight_hours() {
        assert_eq!(SESSION_TTL_HOURS, 8);
    }
}
