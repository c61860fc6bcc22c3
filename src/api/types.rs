//! Shared types for the API layer.

use std::sync::Arc;

use crate::core_state::CoreState;
use crate::models::{PatientEmail, SessionToken};

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    /// Shared secret required on `X-Upload-Key` for uploads, when configured.
    pub upload_key: Option<Arc<str>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            upload_key: None,
        }
    }

    pub fn with_upload_key(mut self, key: Option<String>) -> Self {
        self.upload_key = key.filter(|k| !k.is_empty()).map(Arc::from);
        self
    }
}

/// Authenticated patient, injected into request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct PatientContext {
    pub email: PatientEmail,
    /// The bearer token that authenticated this request.
    pub token: Arc<SessionToken>,
}
