pub mod consent;
pub mod document;
pub mod enums;
pub mod patient;
pub mod session;

pub use consent::*;
pub use document::*;
pub use enums::*;
pub use patient::*;
pub use session::*;
