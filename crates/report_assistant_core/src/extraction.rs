//! crates/report_assistant_core/src/extraction.rs
//!
//! Picks the right `DocumentExtractor` for an upload and provides the
//! plain-text extractor. The PDF extractor lives with the other adapters in
//! the service crate.

use std::sync::Arc;

use crate::domain::Upload;
use crate::ports::{DocumentExtractor, PortError, PortResult};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Extracts UTF-8 text uploads. Form feeds separate pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl DocumentExtractor for PlainTextExtractor {
    fn extract_pages(&self, document: &[u8]) -> PortResult<Vec<String>> {
        let text = std::str::from_utf8(document).map_err(|e| {
            PortError::Validation(format!("uploaded file is not valid UTF-8 text: {e}"))
        })?;
        Ok(text.split('\u{000C}').map(str::to_string).collect())
    }
}

/// True for uploads that look like PDFs, by content or by extension.
pub fn is_pdf(upload: &Upload) -> bool {
    upload.bytes.starts_with(PDF_MAGIC)
        || upload.file_name.trim().to_lowercase().ends_with(".pdf")
}

#[derive(Clone)]
pub struct ExtractorRegistry {
    pdf: Arc<dyn DocumentExtractor>,
    text: Arc<dyn DocumentExtractor>,
}

impl ExtractorRegistry {
    pub fn new(pdf: Arc<dyn DocumentExtractor>) -> Self {
        Self {
            pdf,
            text: Arc::new(PlainTextExtractor),
        }
    }

    pub fn for_upload(&self, upload: &Upload) -> Arc<dyn DocumentExtractor> {
        if is_pdf(upload) {
            self.pdf.clone()
        } else {
            self.text.clone()
        }
    }
}
