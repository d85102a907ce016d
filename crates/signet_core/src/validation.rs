use lopdf::Document as PdfDocument;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unable to parse PDF document. It may be corrupt or encrypted. ({0})")]
    Unreadable(String),

    #[error("PDF document is encrypted and cannot be processed")]
    Encrypted,

    #[error("PDF document contains no pages")]
    Empty,
}

#[derive(Debug, Clone, Copy)]
pub struct PdfSummary {
    pub page_count: usize,
}

/// Hard precondition before any contract or template is persisted: the
/// uploaded bytes must parse as a well-formed, unencrypted PDF with at least
/// one page. Invalid input fails fast and nothing is stored.
pub fn validate_pdf(bytes: &[u8]) -> Result<PdfSummary, DocumentError> {
    let doc = PdfDocument::load_mem(bytes).map_err(|e| DocumentError::Unreadable(e.to_string()))?;

    // lopdf will parse some encrypted files without decrypting them; the
    // trailer carries the Encrypt dictionary in that case.
    if doc.trailer.has(b"Encrypt") {
        return Err(DocumentError::Encrypted);
    }

    let page_count = doc.get_pages().len();
    if page_count == 0 {
        return Err(DocumentError::Empty);
    }

    Ok(PdfSummary { page_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamp::test_support::minimal_pdf;

    #[test]
    fn accepts_a_well_formed_pdf() {
        let bytes = minimal_pdf(2);
        let summary = validate_pdf(&bytes).expect("valid PDF rejected");
        assert_eq!(summary.page_count, 2);
    }

    #[test]
    fn rejects_garbage_bytes() {
        let err = validate_pdf(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, DocumentError::Unreadable(_)));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(validate_pdf(&[]).is_err());
    }
}
