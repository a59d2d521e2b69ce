//! Blocking chat client for the supported model providers

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::agent::EngineError;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.3;

/// Wire protocol selected by a model id's prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAi,
    Anthropic,
}

impl Provider {
    /// Split `provider/model` into protocol and bare model name. Unprefixed ids are Gemini.
    pub fn split(model: &str) -> (Self, &str) {
        if let Some(rest) = model.strip_prefix("openai/") {
            (Self::OpenAi, rest)
        } else if let Some(rest) = model.strip_prefix("anthropic/") {
            (Self::Anthropic, rest)
        } else {
            (Self::Gemini, model.strip_prefix("gemini/").unwrap_or(model))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

/// Chat role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Model reply with the provider's raw usage object
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub usage: Value,
}

/// Blocking client; called only from worker threads
pub struct ChatClient {
    http: reqwest::blocking::Client,
}

impl ChatClient {
    /// Create a client with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, EngineError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Send a conversation to the provider selected by `model`
    pub fn chat(
        &self,
        model: &str,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatReply, EngineError> {
        let (provider, bare_model) = Provider::split(model);
        match provider {
            Provider::Gemini => self.gemini(bare_model, api_key, messages),
            Provider::OpenAi => self.openai(bare_model, api_key, messages),
            Provider::Anthropic => self.anthropic(bare_model, api_key, messages),
        }
    }

    /// Gemini models supporting `generateContent`, without the `models/` prefix
    pub fn list_gemini_models(&self, api_key: &str) -> Result<Vec<String>, EngineError> {
        let response = self
            .http
            .get(format!("{}/models", GEMINI_BASE_URL))
            .query(&[("pageSize", "1000")])
            .header("x-goog-api-key", api_key)
            .send()
            .map_err(|e| EngineError::provider(Provider::Gemini.name(), e.to_string()))?;
        let listing: ModelListing = parse_response(Provider::Gemini.name(), response)?;

        Ok(listing
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }

    fn gemini(
        &self,
        model: &str,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatReply, EngineError> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let request = GeminiRequest {
            system_instruction: (!system.is_empty()).then(|| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: system.join("\n\n"),
                }],
            }),
            contents: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| GeminiContent {
                    role: Some(if m.role == Role::Assistant { "model" } else { "user" }),
                    parts: vec![GeminiPart {
                        text: m.content.clone(),
                    }],
                })
                .collect(),
            generation_config: GeminiGenerationConfig {
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .http
            .post(format!("{}/models/{}:generateContent", GEMINI_BASE_URL, model))
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .map_err(|e| EngineError::provider(Provider::Gemini.name(), e.to_string()))?;
        let body: GeminiResponse = parse_response(Provider::Gemini.name(), response)?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| {
                EngineError::provider(Provider::Gemini.name(), "response contained no candidates")
            })?;

        Ok(ChatReply {
            text,
            usage: body.usage_metadata.unwrap_or(Value::Null),
        })
    }

    fn openai(
        &self,
        model: &str,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatReply, EngineError> {
        let request = OpenAiRequest {
            model,
            messages,
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", OPENAI_BASE_URL))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .map_err(|e| EngineError::provider(Provider::OpenAi.name(), e.to_string()))?;
        let body: OpenAiResponse = parse_response(Provider::OpenAi.name(), response)?;

        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| {
                EngineError::provider(Provider::OpenAi.name(), "response contained no choices")
            })?;

        Ok(ChatReply {
            text,
            usage: body.usage.unwrap_or(Value::Null),
        })
    }

    fn anthropic(
        &self,
        model: &str,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatReply, EngineError> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let request = AnthropicRequest {
            model,
            max_tokens: ANTHROPIC_MAX_TOKENS,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages.iter().filter(|m| m.role != Role::System).collect(),
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(format!("{}/messages", ANTHROPIC_BASE_URL))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .map_err(|e| EngineError::provider(Provider::Anthropic.name(), e.to_string()))?;
        let body: AnthropicResponse = parse_response(Provider::Anthropic.name(), response)?;

        let text = body
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(ChatReply {
            text,
            usage: body.usage.unwrap_or(Value::Null),
        })
    }
}

fn parse_response<T: for<'de> Deserialize<'de>>(
    provider: &str,
    response: reqwest::blocking::Response,
) -> Result<T, EngineError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(EngineError::provider(
            provider,
            format!("{}: {}", status, truncate(&body, 500)),
        ));
    }
    response
        .json()
        .map_err(|e| EngineError::provider(provider, format!("invalid response: {}", e)))
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<Value>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ModelListing {
    #[serde(default)]
    models: Vec<ListedModel>,
}

#[derive(Deserialize)]
struct ListedModel {
    name: String,
    #[serde(rename = "supportedGenerationMethods", default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<Value>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
    usage: Option<Value>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    text: Option<String>,
}
