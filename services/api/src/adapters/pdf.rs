//! services/api/src/adapters/pdf.rs
//!
//! PDF text extraction with `pdf-extract`. Only embedded text layers are read;
//! scanned pages come back empty.

use report_assistant_core::ports::{DocumentExtractor, PortError, PortResult};

/// Implements `DocumentExtractor` for digital PDFs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl DocumentExtractor for PdfTextExtractor {
    fn extract_pages(&self, document: &[u8]) -> PortResult<Vec<String>> {
        pdf_extract::extract_text_from_mem_by_pages(document)
            .map_err(|e| PortError::Validation(format!("could not read PDF: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a one-page PDF whose content stream shows `text`, or nothing when `None`.
    fn make_test_pdf(text: Option<&str>) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let content = match text {
            Some(text) => format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET"),
            None => String::new(),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });

        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        });

        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", pages_id);
        }

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn extracts_text_layer() {
        let text = PdfTextExtractor
            .extract(&make_test_pdf(Some("Hemoglobin 11.2 g/dL")))
            .unwrap();
        assert!(text.contains("Hemoglobin"), "got: {text}");
    }

    #[test]
    fn blank_pdf_is_an_empty_document() {
        let err = PdfTextExtractor.extract(&make_test_pdf(None)).unwrap_err();
        assert!(matches!(err, PortError::EmptyDocument));
    }

    #[test]
    fn garbage_is_rejected() {
        let err = PdfTextExtractor.extract(b"%PDF-not really").unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }
}
