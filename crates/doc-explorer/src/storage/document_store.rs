//! Process-lifetime document registry

use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Document, DocumentSummary, FileType};

/// Concurrent in-memory document store.
///
/// No eviction and no persistence: entries live until deleted or the process exits.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<String, Arc<Document>>,
}

impl DocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store extracted text under a fresh id
    pub fn put(&self, filename: &str, file_type: FileType, text: impl Into<Arc<str>>) -> Arc<Document> {
        let id = Uuid::new_v4().to_string();
        let doc = Arc::new(Document::new(id.clone(), filename, file_type, text));
        self.documents.insert(id, Arc::clone(&doc));
        tracing::info!(
            "Stored document {} ({}, {} chars)",
            doc.id,
            doc.filename,
            doc.text_length
        );
        doc
    }

    /// Insert a prepared document under its own id
    #[cfg(test)]
    pub(crate) fn insert(&self, doc: Document) -> Arc<Document> {
        let doc = Arc::new(doc);
        self.documents.insert(doc.id.clone(), Arc::clone(&doc));
        doc
    }

    /// Look up a document
    pub fn get(&self, id: &str) -> Result<Arc<Document>> {
        self.documents
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Summaries of all documents, oldest first
    pub fn list(&self) -> Vec<DocumentSummary> {
        let mut docs: Vec<Arc<Document>> = self
            .documents
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        docs.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        docs.iter().map(|doc| DocumentSummary::from(doc.as_ref())).collect()
    }

    /// Remove a document
    pub fn delete(&self, id: &str) -> Result<()> {
        self.documents
            .remove(id)
            .map(|(_, doc)| tracing::info!("Deleted document {} ({})", doc.id, doc.filename))
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_put_then_get() {
        let store = DocumentStore::new();
        let text = "x".repeat(1200);
        let doc = store.put("long.txt", FileType::Txt, text.as_str());

        let fetched = store.get(&doc.id).unwrap();
        assert_eq!(fetched.text_length, 1200);
        assert_eq!(fetched.preview, "x".repeat(500));
        assert_eq!(&*fetched.text, text.as_str());
    }

    #[test]
    fn test_ids_are_unique() {
        let store = DocumentStore::new();
        let ids: HashSet<String> = (0..1000)
            .map(|i| store.put(&format!("{}.txt", i), FileType::Txt, "text").id.clone())
            .collect();
        assert_eq!(ids.len(), 1000);
        assert_eq!(store.len(), 1000);
    }

    #[test]
    fn test_delete_then_lookup_is_not_found() {
        let store = DocumentStore::new();
        let doc = store.put("a.txt", FileType::Txt, "text");

        store.delete(&doc.id).unwrap();
        assert!(matches!(store.get(&doc.id), Err(Error::NotFound(_))));
        assert!(matches!(store.delete(&doc.id), Err(Error::NotFound(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_summaries() {
        let store = DocumentStore::new();
        store.insert(Document::new("doc-1", "hello.txt", FileType::Txt, "Hello world"));

        let list = store.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "doc-1");
        assert_eq!(list[0].text_length, 11);
    }

    #[test]
    fn test_concurrent_puts() {
        let store = Arc::new(DocumentStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.put(&format!("{}-{}.txt", t, i), FileType::Txt, "text");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 400);
    }
}
