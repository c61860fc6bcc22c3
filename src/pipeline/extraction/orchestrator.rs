use std::sync::Arc;

use super::format::{detect_format, FileCategory};
use super::sanitize::sanitize_extracted_text;
use super::types::{ExtractedText, TextExtractor, TextRecognizer};
use super::ExtractionError;
use crate::models::RawDocument;

/// Routes a document to the right text source by detected format.
///
/// Plain text is read locally (form feed separates pages); PDFs and images
/// go to the configured recognizer.
pub struct DocumentTextExtractor {
    recognizer: Option<Arc<dyn TextRecognizer>>,
}

impl DocumentTextExtractor {
    pub fn new(recognizer: Option<Arc<dyn TextRecognizer>>) -> Self {
        Self { recognizer }
    }
}

impl TextExtractor for DocumentTextExtractor {
    fn extract(&self, doc: &RawDocument) -> Result<ExtractedText, ExtractionError> {
        let format = detect_format(doc.bytes());
        tracing::debug!(
            doc_id = %doc.document_id(),
            mime = %format.mime_type,
            size = format.size_bytes,
            "Detected document format"
        );

        let raw_pages = match format.category {
            FileCategory::Unsupported => {
                return Err(ExtractionError::UnsupportedFormat(format.mime_type));
            }
            FileCategory::PlainText => {
                let text = std::str::from_utf8(doc.bytes())
                    .map_err(|e| ExtractionError::EncodingError(e.to_string()))?;
                text.split('\x0c').map(str::to_string).collect::<Vec<_>>()
            }
            FileCategory::Pdf | FileCategory::Image => {
                let recognizer = self
                    .recognizer
                    .as_ref()
                    .ok_or_else(|| ExtractionError::RecognizerUnavailable(format.mime_type.clone()))?;
                recognizer.recognize(doc.bytes(), &format)?
            }
        };

        let text = ExtractedText::new(
            raw_pages
                .iter()
                .map(|p| sanitize_extracted_text(p))
                .collect(),
        );
        if text.is_blank() {
            return Err(ExtractionError::EmptyDocument);
        }

        tracing::info!(
            doc_id = %doc.document_id(),
            pages = text.page_count(),
            "Text extracted"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::MockOcrEngine;
    use chrono::Utc;

    fn doc(bytes: &[u8]) -> RawDocument {
        RawDocument::new("form.bin", bytes.to_vec(), Utc::now())
    }

    #[test]
    fn plain_text_splits_on_form_feed() {
        let extractor = DocumentTextExtractor::new(None);
        let text = extractor
            .extract(&doc(b"Page one line\n\x0cPage two line"))
            .unwrap();
        assert_eq!(text.pages(), ["Page one line", "Page two line"]);
    }

    #[test]
    fn pdf_goes_to_recognizer() {
        let ocr = Arc::new(MockOcrEngine::new(&["Consent form p1", "p2"]));
        let extractor = DocumentTextExtractor::new(Some(ocr.clone()));
        let text = extractor.extract(&doc(b"%PDF-1.7 binary")).unwrap();
        assert_eq!(text.page_count(), 2);
        assert_eq!(ocr.calls(), 1);
    }

    #[test]
    fn pdf_without_recognizer_fails() {
        let extractor = DocumentTextExtractor::new(None);
        let err = extractor.extract(&doc(b"%PDF-1.7 binary")).unwrap_err();
        assert!(matches!(err, ExtractionError::RecognizerUnavailable(_)));
    }

    #[test]
    fn unsupported_format_fails() {
        let extractor = DocumentTextExtractor::new(None);
        let err = extractor.extract(&doc(&[0x50, 0x4B, 0x03, 0x04, 0x00])).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(_)));
    }

    #[test]
    fn blank_recognition_is_empty_document() {
        let ocr = Arc::new(MockOcrEngine::new(&["  ", "\x00"]));
        let extractor = DocumentTextExtractor::new(Some(ocr));
        let err = extractor.extract(&doc(b"%PDF-1.7")).unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyDocument));
    }
}
