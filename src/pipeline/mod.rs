pub mod batch;
pub mod extraction;
pub mod llm;
pub mod processor; // Per-document ingestion state machine
pub mod rag; // Session-scoped query answering
pub mod structuring;
