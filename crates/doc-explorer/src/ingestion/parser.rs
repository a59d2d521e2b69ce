//! Multi-format text extractor

use std::panic::{self, AssertUnwindSafe};

use crate::error::{Error, Result};
use crate::types::FileType;

/// Text extracted from an uploaded file
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Detected file type
    pub file_type: FileType,
    /// Plain text content, guaranteed non-blank
    pub text: String,
}

/// Multi-format text extractor
pub struct TextExtractor;

impl TextExtractor {
    /// Extract plain text based on the filename's extension
    pub fn extract(filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        let file_type = FileType::from_extension(&extension).ok_or_else(|| {
            Error::UnsupportedType {
                extension: extension.clone(),
                allowed: FileType::allowed_list(),
            }
        })?;

        // Parser crates may panic on malformed input
        let text = panic::catch_unwind(AssertUnwindSafe(|| Self::extract_as(file_type, data)))
            .unwrap_or_else(|_| {
                Err(Error::parse_failure(
                    file_type.extension(),
                    "parser panicked on malformed input",
                ))
            })?;

        if text.trim().is_empty() {
            return Err(Error::EmptyDocument);
        }

        tracing::debug!(
            "Extracted {} chars from {} ({})",
            text.chars().count(),
            filename,
            file_type
        );

        Ok(ExtractedText { file_type, text })
    }

    fn extract_as(file_type: FileType, data: &[u8]) -> Result<String> {
        match file_type {
            FileType::Pdf => Self::extract_pdf(data),
            FileType::Docx | FileType::Doc => Self::extract_docx(data, file_type),
            FileType::Txt => Self::extract_txt(data),
        }
    }

    /// Per-page PDF extraction, pages joined with newlines
    fn extract_pdf(data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::parse_failure("pdf", e.to_string()))?;

        let pages: Vec<String> = doc
            .get_pages()
            .keys()
            .map(|&page_num| match doc.extract_text(&[page_num]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("No text on page {}: {}", page_num, e);
                    String::new()
                }
            })
            .collect();

        let text = pages.join("\n");
        if !text.trim().is_empty() {
            return Ok(text);
        }

        // lopdf cannot decode some font encodings; pdf-extract handles more of them
        tracing::debug!("Per-page extraction empty, trying pdf-extract");
        pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::parse_failure("pdf", e.to_string()))
    }

    /// Paragraph text joined with newlines
    fn extract_docx(data: &[u8], file_type: FileType) -> Result<String> {
        let doc = docx_rs::read_docx(data)
            .map_err(|e| Error::parse_failure(file_type.extension(), e.to_string()))?;

        let paragraphs: Vec<String> = doc
            .document
            .children
            .into_iter()
            .filter_map(|child| match child {
                docx_rs::DocumentChild::Paragraph(p) => Some(paragraph_text(&p)),
                _ => None,
            })
            .collect();

        Ok(paragraphs.join("\n"))
    }

    fn extract_txt(data: &[u8]) -> Result<String> {
        std::str::from_utf8(data)
            .map(str::to_string)
            .map_err(|_| Error::InvalidEncoding)
    }
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for child in &run.children {
                if let docx_rs::RunChild::Text(t) = child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single-page PDF with one text run; offsets computed so the xref is valid
    fn minimal_pdf(phrase: &str) -> Vec<u8> {
        let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
        let mut out = Vec::new();
        let mut offsets = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");
        offsets.push(out.len());
        out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
        offsets.push(out.len());
        out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
        offsets.push(out.len());
        out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                content.len(),
                content
            )
            .as_bytes(),
        );
        offsets.push(out.len());
        out.extend_from_slice(
            b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
        );
        let xref_start = out.len();
        out.extend_from_slice(b"xref\n0 6\n");
        out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
        out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
        out.extend_from_slice(b"%%EOF\n");
        out
    }

    fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
        use docx_rs::{Docx, Paragraph, Run};

        let mut docx = Docx::new();
        for text in paragraphs {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)));
        }
        let mut cursor = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_extract_txt() {
        let extracted = TextExtractor::extract("notes.TXT", b"Hello world").unwrap();
        assert_eq!(extracted.file_type, FileType::Txt);
        assert_eq!(extracted.text, "Hello world");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = TextExtractor::extract("notes.txt", &[0x66, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, Error::InvalidEncoding));
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let err = TextExtractor::extract("blank.txt", b"  \n\t ").unwrap_err();
        assert!(matches!(err, Error::EmptyDocument));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = TextExtractor::extract("sheet.xlsx", b"data").unwrap_err();
        match err {
            Error::UnsupportedType { extension, allowed } => {
                assert_eq!(extension, "xlsx");
                assert_eq!(allowed, "pdf, docx, doc, txt");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = TextExtractor::extract("README", b"data").unwrap_err();
        assert!(matches!(err, Error::UnsupportedType { .. }));
    }

    #[test]
    fn test_extract_docx_paragraphs() {
        let data = minimal_docx(&["First paragraph", "Second paragraph"]);
        let extracted = TextExtractor::extract("report.docx", &data).unwrap();
        assert_eq!(extracted.file_type, FileType::Docx);
        assert!(extracted.text.contains("First paragraph\nSecond paragraph"));
    }

    #[test]
    fn test_doc_uses_word_parser() {
        let data = minimal_docx(&["Legacy name"]);
        let extracted = TextExtractor::extract("old.doc", &data).unwrap();
        assert_eq!(extracted.file_type, FileType::Doc);
        assert!(extracted.text.contains("Legacy name"));
    }

    #[test]
    fn test_corrupt_docx_is_parse_failure() {
        let err = TextExtractor::extract("broken.docx", b"not a zip archive").unwrap_err();
        match err {
            Error::ParseFailure { file_type, .. } => assert_eq!(file_type, "docx"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extract_pdf() {
        let data = minimal_pdf("spec test phrase");
        let extracted = TextExtractor::extract("paper.pdf", &data).unwrap();
        assert_eq!(extracted.file_type, FileType::Pdf);
        assert!(extracted.text.contains("spec test phrase"));
    }

    #[test]
    fn test_corrupt_pdf_is_parse_failure() {
        let err = TextExtractor::extract("paper.pdf", b"%PDF-garbage").unwrap_err();
        match err {
            Error::ParseFailure { file_type, .. } => assert_eq!(file_type, "pdf"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
