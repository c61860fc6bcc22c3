//! API endpoint handlers.

pub mod auth;
pub mod documents;
pub mod health;
pub mod ingestion;
pub mod query;
