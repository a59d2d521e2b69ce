//! Query request types

use serde::{Deserialize, Serialize};

/// Question about a stored document, used by both the HTTP and streaming paths
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Target document id
    #[serde(default)]
    pub document_id: String,
    /// Natural-language question
    #[serde(default)]
    pub question: String,
    /// Provider-prefixed model id (multi-provider mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Provider credential (multi-provider mode, never stored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl QueryRequest {
    /// Trimmed model id, if present and non-blank
    pub fn model(&self) -> Option<&str> {
        non_blank(self.model.as_deref())
    }

    /// Trimmed credential, if present and non-blank
    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_blank() {
        let req: QueryRequest = serde_json::from_str(r#"{"question": "hi"}"#).unwrap();
        assert!(req.document_id.is_empty());
        assert_eq!(req.question, "hi");
        assert!(req.model().is_none());
    }

    #[test]
    fn test_blank_credentials_are_none() {
        let req: QueryRequest =
            serde_json::from_str(r#"{"document_id":"d","question":"q","model":" ","api_key":" k "}"#)
                .unwrap();
        assert!(req.model().is_none());
        assert_eq!(req.api_key(), Some("k"));
    }
}
