//! Text extraction for archived objects.
//!
//! The object key's extension picks the extractor: PDFs are read page by page
//! and the pages joined with newlines; plain text and markdown pass through
//! as (lossy) UTF-8. Anything else is rejected so the importer can skip it.

use thiserror::Error;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";
pub const MIME_UNKNOWN: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Map an object key to the MIME type used for extraction.
pub fn content_type_for_key(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => MIME_PDF,
        "txt" => MIME_TEXT,
        "md" => MIME_MARKDOWN,
        _ => MIME_UNKNOWN,
    }
}

/// Extract plain text from object bytes.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        MIME_TEXT | MIME_MARKDOWN => Ok(String::from_utf8_lossy(bytes).trim().to_string()),
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pdf(phrase: &str) -> Vec<u8> {
        let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");
        let o1 = out.len();
        out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
        let o2 = out.len();
        out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
        let o3 = out.len();
        out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
        let o4 = out.len();
        out.extend_from_slice(
            format!(
                "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                stream.len(),
                stream
            )
            .as_bytes(),
        );
        let o5 = out.len();
        out.extend_from_slice(
            b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
        );
        let xref_start = out.len();
        out.extend_from_slice(b"xref\n0 6\n");
        out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
        for offset in [o1, o2, o3, o4, o5] {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
        out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
        out.extend_from_slice(b"%%EOF\n");
        out
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for_key("news/2025/btc.PDF"), MIME_PDF);
        assert_eq!(content_type_for_key("notes.txt"), MIME_TEXT);
        assert_eq!(content_type_for_key("readme.md"), MIME_MARKDOWN);
        assert_eq!(content_type_for_key("archive.zip"), MIME_UNKNOWN);
        assert_eq!(content_type_for_key("no-extension"), MIME_UNKNOWN);
    }

    #[test]
    fn pdf_text_is_extracted() {
        let text = extract_text(&minimal_pdf("bitcoin rally continues"), MIME_PDF).unwrap();
        assert!(text.contains("bitcoin rally continues"), "got: {:?}", text);
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn plain_text_passes_through_trimmed() {
        let text = extract_text(b"  ETH upgrade ships\n", MIME_TEXT).unwrap();
        assert_eq!(text, "ETH upgrade ships");
    }

    #[test]
    fn unsupported_content_type_returns_error() {
        let err = extract_text(b"foo", MIME_UNKNOWN).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedContentType(_)));
    }
}
