//! Configuration management for RagChat services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values
//!
//! The configuration is built once at startup, validated, and shared by
//! reference with the dense retriever, reranker and generator.

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Pre-built vector index location
    #[serde(default)]
    pub index: IndexConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Hybrid retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Reranker configuration
    #[serde(default)]
    pub rerank: RerankConfig,

    /// Generative model configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Conversation memory configuration
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Longest accepted query, in characters
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Path to the JSON vector index
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai (any OpenAI-compatible endpoint), mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service (local servers may not need one)
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_embedding_api_base")]
    pub api_base: String,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Dense-retrieval fan-out (k)
    #[serde(default = "default_retrieval_k")]
    pub k: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RerankConfig {
    /// Rerank provider: cohere, mock
    #[serde(default = "default_cohere_provider")]
    pub provider: String,

    /// API key for the rerank service
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_cohere_api_base")]
    pub api_base: String,

    /// Model to use
    #[serde(default = "default_rerank_model")]
    pub model: String,

    /// Number of hybrid candidates sent to the reranker
    #[serde(default = "default_rerank_fan_out")]
    pub fan_out: usize,

    /// Number of reranked passages kept for the grounding context
    #[serde(default = "default_rerank_top_n")]
    pub top_n: usize,

    /// Request timeout in seconds
    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Generation provider: cohere, openai, mock
    #[serde(default = "default_cohere_provider")]
    pub provider: String,

    /// API key for the generation service
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_cohere_api_base")]
    pub api_base: String,

    /// Model to use
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationConfig {
    /// Number of turns returned by the last-messages view
    #[serde(default = "default_last_messages")]
    pub last_messages: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name reported in logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_request_timeout() -> u64 { 120 }
fn default_max_query_chars() -> usize { 4000 }
fn default_index_path() -> PathBuf { PathBuf::from("faiss_index/index.json") }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_api_base() -> String { "http://localhost:8081/v1".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_collaborator_timeout() -> u64 { 30 }
fn default_retrieval_k() -> usize { crate::DEFAULT_RETRIEVAL_K }
fn default_cohere_provider() -> String { "cohere".to_string() }
fn default_cohere_api_base() -> String { "https://api.cohere.ai/v1".to_string() }
fn default_rerank_model() -> String { "rerank-multilingual-v3.0".to_string() }
fn default_rerank_fan_out() -> usize { crate::DEFAULT_RERANK_FAN_OUT }
fn default_rerank_top_n() -> usize { crate::DEFAULT_RERANK_TOP_N }
fn default_generation_model() -> String { "command-r".to_string() }
fn default_temperature() -> f32 { 0.3 }
fn default_generation_timeout() -> u64 { 60 }
fn default_last_messages() -> usize { 4 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "ragchat".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_query_chars: default_max_query_chars(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { path: default_index_path() }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: default_embedding_api_base(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_collaborator_timeout(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: default_retrieval_k() }
    }
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            provider: default_cohere_provider(),
            api_key: None,
            api_base: default_cohere_api_base(),
            model: default_rerank_model(),
            fan_out: default_rerank_fan_out(),
            top_n: default_rerank_top_n(),
            timeout_secs: default_collaborator_timeout(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_cohere_provider(),
            api_key: None,
            api_base: default_cohere_api_base(),
            model: default_generation_model(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self { last_messages: default_last_messages() }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__RERANK__API_KEY=...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Check cross-field constraints that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.k == 0 {
            return Err(invalid("retrieval.k must be at least 1"));
        }
        if self.rerank.fan_out == 0 {
            return Err(invalid("rerank.fan_out must be at least 1"));
        }
        if self.rerank.top_n == 0 {
            return Err(invalid("rerank.top_n must be at least 1"));
        }
        if self.rerank.top_n > self.rerank.fan_out {
            return Err(invalid(&format!(
                "rerank.top_n ({}) cannot exceed rerank.fan_out ({})",
                self.rerank.top_n, self.rerank.fan_out
            )));
        }
        if self.embedding.dimension == 0 {
            return Err(invalid("embedding.dimension must be at least 1"));
        }

        match self.embedding.provider.as_str() {
            "openai" | "mock" => {}
            other => return Err(invalid(&format!("unknown embedding provider '{}'", other))),
        }

        match self.rerank.provider.as_str() {
            "cohere" => require_key("rerank", &self.rerank.api_key)?,
            "mock" => {}
            other => return Err(invalid(&format!("unknown rerank provider '{}'", other))),
        }

        match self.generation.provider.as_str() {
            "cohere" | "openai" => require_key("generation", &self.generation.api_key)?,
            "mock" => {}
            other => return Err(invalid(&format!("unknown generation provider '{}'", other))),
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Configuration {
        message: message.to_string(),
    }
}

fn require_key(section: &str, key: &Option<String>) -> Result<()> {
    match key.as_deref() {
        Some(k) if !k.trim().is_empty() => Ok(()),
        _ => Err(invalid(&format!("{}.api_key is required for this provider", section))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.rerank.provider = "mock".into();
        config.generation.provider = "mock".into();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.retrieval.k, 10);
        assert_eq!(config.rerank.fan_out, 10);
        assert_eq!(config.rerank.top_n, 3);
        assert_eq!(config.conversation.last_messages, 4);
        assert_eq!(config.generation.model, "command-r");
    }

    #[test]
    fn test_defaults_require_cohere_key() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("rerank.api_key"));
    }

    #[test]
    fn test_mock_providers_validate() {
        assert!(mock_config().validate().is_ok());
    }

    #[test]
    fn test_top_n_bounded_by_fan_out() {
        let mut config = mock_config();
        config.rerank.top_n = 11;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cannot exceed"));
    }

    #[test]
    fn test_zero_k_rejected() {
        let mut config = mock_config();
        config.retrieval.k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = mock_config();
        config.generation.provider = "bard".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bard"));
    }

    #[test]
    fn test_blank_key_rejected() {
        let mut config = mock_config();
        config.generation.provider = "openai".into();
        config.generation.api_key = Some("   ".into());
        assert!(config.validate().is_err());

        config.generation.api_key = Some("sk-test".into());
        assert!(config.validate().is_ok());
    }
}
