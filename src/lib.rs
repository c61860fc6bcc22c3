pub mod api; // HTTP transport
pub mod clock;
pub mod config;
pub mod core_state; // Transport-agnostic state
pub mod crypto;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod provisioning; // Account create-if-absent
pub mod session_manager;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::config::{Settings, SESSION_SWEEP_INTERVAL_SECS};
use crate::core_state::{CoreError, CoreState};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize tracing once. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

/// Build the application, ingest the inbox if configured, then serve until Ctrl-C.
pub async fn run(settings: Settings) -> Result<(), StartupError> {
    tracing::info!(
        version = config::APP_VERSION,
        listen = %settings.listen,
        database = %settings.database_path.display(),
        model = %settings.model,
        ocr = settings.ocr_url.is_some(),
        "{} starting",
        config::APP_NAME
    );

    let core = {
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || CoreState::from_settings(&settings))
            .await
            .map_err(std::io::Error::other)??
    };
    let core = Arc::new(core);

    if let Some(inbox) = settings.inbox_dir.clone() {
        let core = core.clone();
        // Runs alongside the server; each document is independent.
        tokio::task::spawn_blocking(move || match core.ingest_inbox(&inbox) {
            Ok(summary) => tracing::info!(?summary, "Inbox ingested"),
            Err(e) => tracing::error!(dir = %inbox.display(), error = %e, "Inbox ingestion failed"),
        });
    }

    let sweeper = {
        let core = core.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                core.sessions().sweep_expired();
            }
        })
    };

    let app = api::api_router(core, settings.upload_key.clone());
    let listener = tokio::net::TcpListener::bind(settings.listen).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    sweeper.abort();
    Ok(())
}
