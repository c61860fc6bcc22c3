//! Repository layer: entity-scoped database operations.
//!
//! Every read of consent records takes the patient email as a mandatory
//! filter. No function lists records across patients.

mod consent;
mod ledger;
mod patient;
mod raw_document;

pub use consent::*;
pub use ledger::*;
pub use patient::*;
pub use raw_document::*;
