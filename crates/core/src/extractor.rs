use crate::error::IngestError;
use crate::models::UploadedDocument;
use lopdf::Document;
use tracing::debug;

pub trait PdfExtractor: Send + Sync {
    /// Returns the text of every page, in page order, with nothing inserted
    /// between pages.
    fn extract_text(&self, document: &UploadedDocument) -> Result<String, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_text(&self, document: &UploadedDocument) -> Result<String, IngestError> {
        let parse_error = |details: String| IngestError::PdfParse {
            file_name: document.file_name.clone(),
            details,
        };

        let pdf = Document::load_mem(&document.bytes)
            .map_err(|error| parse_error(error.to_string()))?;

        let mut text = String::new();
        for page_no in pdf.get_pages().into_keys() {
            let page_text = pdf
                .extract_text(&[page_no])
                .map_err(|error| parse_error(error.to_string()))?;
            text.push_str(&page_text);
        }

        debug!(
            file_name = %document.file_name,
            chars = text.chars().count(),
            "extracted pdf text"
        );

        Ok(text)
    }
}

/// Concatenates the text of every document in input order. The first
/// unreadable document aborts the whole batch.
pub fn extract_raw_text(
    extractor: &dyn PdfExtractor,
    documents: &[UploadedDocument],
) -> Result<String, IngestError> {
    let mut raw_text = String::new();
    for document in documents {
        raw_text.push_str(&extractor.extract_text(document)?);
    }
    Ok(raw_text)
}


#[cfg(test)]
mod tests {
    use super::fixtures::pdf_with_pages;
    use super::*;

    #[test]
    fn extracts_pages_in_order() {
        let document = UploadedDocument::new(
            "animals.pdf",
            pdf_with_pages(&[&["Cats are mammals."], &["Dogs are mammals too."]]),
        );

        let text = LopdfExtractor.extract_text(&document).expect("pdf should parse");

        let cats = text.find("Cats are mammals.").expect("first page text");
        let dogs = text.find("Dogs are mammals too.").expect("second page text");
        assert!(cats < dogs);
    }

    #[test]
    fn batch_preserves_document_order() {
        let documents = vec![
            UploadedDocument::new("b.pdf", pdf_with_pages(&[&["Second upload"]])),
            UploadedDocument::new("a.pdf", pdf_with_pages(&[&["First upload"]])),
        ];

        let raw_text = extract_raw_text(&LopdfExtractor, &documents).expect("batch should parse");

        assert!(raw_text.chars().count() >= documents.len());
        let second = raw_text.find("Second upload").expect("text of b.pdf");
        let first = raw_text.find("First upload").expect("text of a.pdf");
        assert!(second < first);
    }

    #[test]
    fn one_malformed_document_aborts_the_batch() {
        let documents = vec![
            UploadedDocument::new("good.pdf", pdf_with_pages(&[&["Readable"]])),
            UploadedDocument::new("broken.pdf", b"%PDF-1.4\n%broken".to_vec()),
        ];

        let error = extract_raw_text(&LopdfExtractor, &documents).expect_err("batch must fail");

        match error {
            IngestError::PdfParse { file_name, .. } => assert_eq!(file_name, "broken.pdf"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
