//! Configuration for the document explorer

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main explorer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Cross-origin configuration
    pub cors: CorsConfig,
    /// Code interpreter used by the reasoning engine
    pub interpreter: InterpreterConfig,
    /// Reasoning agent configuration
    pub agent: AgentConfig,
}

impl ExplorerConfig {
    /// Load configuration: defaults, then an optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(origins) = var("CORS_ORIGINS") {
            self.cors.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(pattern) = var("CORS_ORIGIN_REGEX") {
            self.cors.origin_pattern = Some(pattern);
        }
        if let Some(path) = var("INTERPRETER_PATH") {
            self.interpreter.path = Some(PathBuf::from(path));
        }
        if let Some(key) = var("GOOGLE_API_KEY") {
            self.agent.api_key = Some(key);
        }
        if let Some(model) = var("GEMINI_MODEL") {
            self.agent.default_model = model;
        }
        if let Some(flag) = var("MULTI_PROVIDER") {
            self.agent.multi_provider = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// Cross-origin request configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins allowed to call the API
    pub allowed_origins: Vec<String>,
    /// Optional regex matched against the full origin
    pub origin_pattern: Option<String>,
    /// Allow cookies/credentials on cross-origin requests
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:4321".to_string()],
            origin_pattern: None,
            allow_credentials: true,
        }
    }
}

/// Code interpreter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Absolute path to the interpreter binary (overrides discovery)
    pub path: Option<PathBuf>,
    /// Maximum seconds to wait on a single sandbox message
    pub exec_timeout_secs: u64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            path: None,
            exec_timeout_secs: 120,
        }
    }
}

/// Reasoning agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Require model + API key on every request instead of using server-side defaults
    pub multi_provider: bool,
    /// Model used in single-provider mode
    pub default_model: String,
    /// Models tried after the default when resolving against the provider listing
    pub fallback_models: Vec<String>,
    /// Server-side credential for single-provider mode
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Maximum reasoning iterations per question
    pub max_iterations: u32,
    /// Maximum nested `llm_query` calls per question
    pub max_llm_calls: u32,
    /// Reported exploration depth
    pub depth: u32,
    /// Workers dedicated to blocking agent calls
    pub worker_threads: usize,
    /// Delay between streamed trajectory steps in milliseconds
    pub replay_delay_ms: u64,
    /// HTTP timeout for a single model call in seconds
    pub request_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            multi_provider: false,
            default_model: "gemini/gemini-3-flash-preview".to_string(),
            fallback_models: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-flash-latest".to_string(),
            ],
            api_key: None,
            max_iterations: 10,
            max_llm_calls: 20,
            depth: 1,
            worker_threads: 2,
            replay_delay_ms: 100,
            request_timeout_secs: 120,
        }
    }
}
