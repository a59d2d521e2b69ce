//! Provider catalog and model naming

use serde::Serialize;
use std::collections::BTreeMap;

/// Model tried after the configured one when resolving Gemini availability
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

/// Provider prefixes understood by the engine
pub const PROVIDER_PREFIXES: [&str; 3] = ["gemini/", "openai/", "anthropic/"];

/// Catalog entry for a model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
}

/// Catalog entry for a provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub label: &'static str,
    /// Request field the client fills with its credential
    pub key_field: &'static str,
    pub models: Vec<ModelInfo>,
    pub default_model: &'static str,
}

/// Static provider catalog, keyed by provider
pub fn provider_catalog() -> BTreeMap<&'static str, ProviderInfo> {
    BTreeMap::from([
        (
            "anthropic",
            ProviderInfo {
                label: "Anthropic",
                key_field: "api_key",
                models: vec![
                    ModelInfo {
                        id: "anthropic/claude-3-5-haiku-latest",
                        name: "Claude 3.5 Haiku",
                    },
                    ModelInfo {
                        id: "anthropic/claude-sonnet-4-20250514",
                        name: "Claude Sonnet 4",
                    },
                ],
                default_model: "anthropic/claude-3-5-haiku-latest",
            },
        ),
        (
            "google",
            ProviderInfo {
                label: "Google Gemini",
                key_field: "api_key",
                models: vec![
                    ModelInfo {
                        id: "gemini/gemini-2.5-flash",
                        name: "Gemini 2.5 Flash",
                    },
                    ModelInfo {
                        id: "gemini/gemini-2.5-pro",
                        name: "Gemini 2.5 Pro",
                    },
                    ModelInfo {
                        id: "gemini/gemini-3-flash-preview",
                        name: "Gemini 3 Flash (Preview)",
                    },
                ],
                default_model: "gemini/gemini-2.5-flash",
            },
        ),
        (
            "openai",
            ProviderInfo {
                label: "OpenAI",
                key_field: "api_key",
                models: vec![
                    ModelInfo {
                        id: "openai/gpt-4o-mini",
                        name: "GPT-4o mini",
                    },
                    ModelInfo {
                        id: "openai/gpt-4.1",
                        name: "GPT-4.1",
                    },
                ],
                default_model: "openai/gpt-4o-mini",
            },
        ),
    ])
}

/// Normalize a model name: trim, drop a leading `models/`, default to the `gemini/` provider
pub fn normalize_model(model: &str) -> String {
    let model = model.trim();
    let model = model.strip_prefix("models/").unwrap_or(model);
    if model.is_empty() || PROVIDER_PREFIXES.iter().any(|p| model.starts_with(p)) {
        model.to_string()
    } else {
        format!("gemini/{}", model)
    }
}

/// Normalized candidates in order, without duplicates or blanks
pub fn model_candidates<'a>(models: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    for model in models.into_iter().map(normalize_model) {
        if !model.is_empty() && !candidates.contains(&model) {
            candidates.push(model);
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_model() {
        assert_eq!(normalize_model("gemini-2.5-flash"), "gemini/gemini-2.5-flash");
        assert_eq!(normalize_model(" models/gemini-2.5-pro "), "gemini/gemini-2.5-pro");
        assert_eq!(normalize_model("gemini/gemini-2.5-pro"), "gemini/gemini-2.5-pro");
        assert_eq!(normalize_model("openai/gpt-4.1"), "openai/gpt-4.1");
        assert_eq!(normalize_model("   "), "");
    }

    #[test]
    fn test_candidates_dedupe_in_order() {
        let candidates = model_candidates([
            "gemini/gemini-3-flash-preview",
            DEFAULT_GEMINI_MODEL,
            "gemini-2.5-flash",
            "",
        ]);
        assert_eq!(
            candidates,
            vec!["gemini/gemini-3-flash-preview", "gemini/gemini-2.5-flash"]
        );
    }

    #[test]
    fn test_catalog_models_carry_provider_prefix() {
        let catalog = provider_catalog();
        assert_eq!(catalog.len(), 3);
        for (key, info) in &catalog {
            assert!(!info.models.is_empty(), "{key} has no models");
            assert!(info.models.iter().any(|m| m.id == info.default_model));
            for model in &info.models {
                assert!(PROVIDER_PREFIXES.iter().any(|p| model.id.starts_with(p)));
            }
        }
    }
}
