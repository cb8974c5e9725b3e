//! PDF converter.
//!
//! Uses pdf-extract to pull the plain text of every page, in page order.

use tracing::debug;

/// Concatenates the text of each page in order. No separator is inserted
/// between pages; whatever line breaks the page text carries are kept.
pub fn extract(bytes: &[u8]) -> Result<String, String> {
    let pages = extract_pages(bytes)?;
    debug!(pages = pages.len(), "extracted pdf pages");
    Ok(pages.concat())
}

/// Plain text of each page, first page first.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, String> {
    pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| format!("PDF extraction failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::extract::fixtures;

    #[test]
    fn test_three_pages_concatenate_in_order() {
        let bytes = fixtures::pdf(&["Alpha page text", "Bravo page text", "Charlie page text"]);

        let pages = extract_pages(&bytes).unwrap();
        assert_eq!(pages.len(), 3);

        let text = extract(&bytes).unwrap();
        assert_eq!(text, pages.concat());

        let alpha = text.find("Alpha").unwrap();
        let bravo = text.find("Bravo").unwrap();
        let charlie = text.find("Charlie").unwrap();
        assert!(alpha < bravo && bravo < charlie);
    }

    #[test]
    fn test_corrupt_pdf_is_error() {
        let err = extract(b"%PDF-1.5\nthis is not a pdf body").unwrap_err();
        assert!(err.starts_with("PDF extraction failed"));
    }
}
