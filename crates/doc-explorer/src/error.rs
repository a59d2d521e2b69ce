//! Error types for the document explorer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for explorer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Document explorer errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upload carried no filename
    #[error("No filename provided")]
    MissingFilename,

    /// File extension outside the allow-list
    #[error("Unsupported file type '{extension}'. Allowed types: {allowed}")]
    UnsupportedType { extension: String, allowed: String },

    /// Underlying parser rejected the file
    #[error("Failed to parse {file_type} file: {message}")]
    ParseFailure { file_type: String, message: String },

    /// Plain text upload was not valid UTF-8
    #[error("Text file must be UTF-8 encoded")]
    InvalidEncoding,

    /// Extraction produced no usable text
    #[error("No text could be extracted from the uploaded file")]
    EmptyDocument,

    /// Document not found
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Question missing or blank
    #[error("Question cannot be empty")]
    MissingQuestion,

    /// Model identifier missing (multi-provider mode)
    #[error("Model is required")]
    MissingModel,

    /// Provider credential missing (multi-provider mode)
    #[error("API key is required")]
    MissingCredential,

    /// Code interpreter binary could not be located
    #[error("{0}")]
    InterpreterUnavailable(String),

    /// Malformed multipart body
    #[error("Invalid upload: {0}")]
    Multipart(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a parse failure error
    pub fn parse_failure(file_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseFailure {
            file_type: file_type.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status and machine-readable tag for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Error::MissingFilename => (StatusCode::BAD_REQUEST, "missing_filename"),
            Error::UnsupportedType { .. } => (StatusCode::BAD_REQUEST, "unsupported_type"),
            Error::ParseFailure { .. } => (StatusCode::BAD_REQUEST, "parse_error"),
            Error::InvalidEncoding => (StatusCode::BAD_REQUEST, "invalid_encoding"),
            Error::EmptyDocument => (StatusCode::BAD_REQUEST, "empty_document"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::MissingQuestion => (StatusCode::BAD_REQUEST, "missing_question"),
            Error::MissingModel => (StatusCode::BAD_REQUEST, "missing_model"),
            Error::MissingCredential => (StatusCode::BAD_REQUEST, "missing_credential"),
            Error::Multipart(_) => (StatusCode::BAD_REQUEST, "invalid_upload"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::InterpreterUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "interpreter_unavailable")
            }
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status();

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::EmptyDocument.status().0, StatusCode::BAD_REQUEST);
        assert_eq!(Error::InvalidEncoding.status().0, StatusCode::BAD_REQUEST);
        assert_eq!(Error::NotFound("x".into()).status().0, StatusCode::NOT_FOUND);
        assert_eq!(Error::MissingCredential.status().0, StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::InterpreterUnavailable("deno missing".into()).status().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unsupported_type_names_allowed_set() {
        let err = Error::UnsupportedType {
            extension: "xlsx".to_string(),
            allowed: "pdf, docx, doc, txt".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("xlsx"));
        assert!(message.contains("pdf, docx, doc, txt"));
    }
}
