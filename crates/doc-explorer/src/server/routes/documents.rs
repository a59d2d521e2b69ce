//! Document upload and management endpoints

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::ingestion::TextExtractor;
use crate::server::state::AppState;
use crate::types::{DocumentDetail, DocumentSummary};

/// POST /api/upload - Extract and store an uploaded file
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DocumentDetail>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Multipart(e.to_string()))?
    {
        let filename = field.file_name().map(str::to_string);
        // The `file` field, or the first field carrying a filename
        if field.name() != Some("file") && filename.is_none() {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::Multipart(format!("Failed to read file: {}", e)))?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| Error::Multipart("No file field in upload".to_string()))?;
    let filename = filename
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .ok_or(Error::MissingFilename)?;

    tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());

    let name = filename.clone();
    let extracted = tokio::task::spawn_blocking(move || TextExtractor::extract(&name, &data))
        .await
        .map_err(|e| Error::internal(format!("Extraction task failed: {}", e)))??;

    let doc = state
        .documents()
        .put(&filename, extracted.file_type, extracted.text);

    Ok(Json(DocumentDetail::from(doc.as_ref())))
}

/// GET /api/documents - List all documents
pub async fn list_documents(State(state): State<AppState>) -> Json<Vec<DocumentSummary>> {
    Json(state.documents().list())
}

/// GET /api/documents/:id - Get document details
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetail>> {
    let doc = state.documents().get(&id)?;
    Ok(Json(DocumentDetail::from(doc.as_ref())))
}

/// DELETE /api/documents/:id - Delete a document
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    state.documents().delete(&id)?;
    Ok(Json(json!({ "status": "deleted" })))
}
