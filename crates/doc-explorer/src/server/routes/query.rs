//! Synchronous query endpoint

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResult};

/// POST /api/query - Answer a question about a stored document
pub async fn query_document(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResult>> {
    // Question, credential, and model are checked before the document;
    // the server credential only once the document exists
    let invocation = state
        .invoker()
        .prepare(&request.question, request.model(), request.api_key())?;
    let doc = state.documents().get(request.document_id.trim())?;

    tracing::info!("Query on {} ({})", doc.id, doc.filename);

    let result = state
        .invoker()
        .run(invocation, Arc::clone(&doc.text))
        .await
        .map_err(|e| match e {
            Error::Internal(message) => Error::Internal(format!("Query failed: {}", message)),
            other => other,
        })?;

    Ok(Json(result))
}
