//! Provider catalog endpoint

use axum::Json;
use std::collections::BTreeMap;

use crate::agent::{provider_catalog, ProviderInfo};

/// GET /api/providers - Static provider catalog
pub async fn list_providers() -> Json<BTreeMap<&'static str, ProviderInfo>> {
    Json(provider_catalog())
}
