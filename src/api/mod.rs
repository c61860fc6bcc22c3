//! HTTP transport.
//!
//! A thin axum layer over [`crate::core_state::CoreState`]. Routes are
//! nested under `/api/`; patient routes sit behind the bearer-token
//! middleware, which resolves the session before any handler runs.
//! Core calls are blocking and run on the blocking pool.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod types;

pub use router::api_router;
pub use types::ApiContext;
