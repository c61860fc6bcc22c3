//! Credential hashing and bearer-token primitives.

pub mod credential;
pub mod token;

pub use credential::*;
pub use token::*;
