//! Document types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Number of characters kept as a document preview
pub const PREVIEW_CHARS: usize = 500;

/// Supported upload file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Legacy Word extension, read with the same parser as .docx
    Doc,
    /// Plain UTF-8 text
    Txt,
}

impl FileType {
    /// Every accepted type, in the order reported to clients
    pub const ALL: [FileType; 4] = [FileType::Pdf, FileType::Docx, FileType::Doc, FileType::Txt];

    /// Detect file type from an extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Canonical extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Txt => "txt",
        }
    }

    /// Comma-separated allow-list for error messages
    pub fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(|t| t.extension())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A stored document. Immutable once created.
#[derive(Debug, Clone)]
pub struct Document {
    /// Unique identifier
    pub id: String,
    /// Original filename
    pub filename: String,
    /// Type the text was extracted from
    pub file_type: FileType,
    /// Full extracted text, shared with agent invocations
    pub text: Arc<str>,
    /// Length of `text` in characters
    pub text_length: usize,
    /// First `PREVIEW_CHARS` characters of `text`
    pub preview: String,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document, computing length and preview from the text
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        file_type: FileType,
        text: impl Into<Arc<str>>,
    ) -> Self {
        let text: Arc<str> = text.into();
        let text_length = text.chars().count();
        let preview = text.chars().take(PREVIEW_CHARS).collect();

        Self {
            id: id.into(),
            filename: filename.into(),
            file_type,
            text,
            text_length,
            preview,
            uploaded_at: Utc::now(),
        }
    }
}

/// Listing entry for a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub text_length: usize,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            filename: doc.filename.clone(),
            text_length: doc.text_length,
        }
    }
}

/// Detail view returned by upload and document fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDetail {
    pub id: String,
    pub filename: String,
    pub text_length: usize,
    pub preview: String,
}

impl From<&Document> for DocumentDetail {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            filename: doc.filename.clone(),
            text_length: doc.text_length,
            preview: doc.preview.clone(),
        }
    }
}
