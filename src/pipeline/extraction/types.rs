use serde::{Deserialize, Serialize};

use super::format::FormatDetection;
use super::ExtractionError;
use crate::models::RawDocument;

/// Ordered page-level text for one document. Page boundaries are the only
/// fragment boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    pages: Vec<String>,
}

impl ExtractedText {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages joined in order, blank pages skipped.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }
}

/// External text recognition capability (OCR). Returns one string per page,
/// in page order.
pub trait TextRecognizer: Send + Sync {
    fn recognize(
        &self,
        bytes: &[u8],
        format: &FormatDetection,
    ) -> Result<Vec<String>, ExtractionError>;
}

/// Raw document in, ordered page text out.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, doc: &RawDocument) -> Result<ExtractedText, ExtractionError>;
}
