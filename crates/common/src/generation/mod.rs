//! Generative model clients
//!
//! Provides:
//! - Cohere chat (`/v1/chat`)
//! - OpenAI-compatible chat completions
//! - A mock generator for development without API keys
//!
//! Every failure, including an empty completion, is reported as
//! `AppError::GenerationUnavailable`. Nothing here retries.

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for answer generation from a fully formatted prompt
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for the prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

fn unavailable(message: impl Into<String>) -> AppError {
    AppError::GenerationUnavailable {
        message: message.into(),
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

fn require_key(config: &GenerationConfig) -> Result<String> {
    config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| AppError::Configuration {
            message: "generation.api_key is required for this provider".to_string(),
        })
}

async fn send_json<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &T,
) -> Result<reqwest::Response> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| unavailable(format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(unavailable(format!("API error {}: {}", status, body)));
    }

    Ok(response)
}

/// Cohere chat client
pub struct CohereGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
}

#[derive(Serialize)]
struct CohereChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    temperature: f32,
}

#[derive(Deserialize)]
struct CohereChatResponse {
    #[serde(default)]
    text: String,
}

impl CohereGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key: require_key(config)?,
            model: config.model.clone(),
            temperature: config.temperature,
            base_url: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Generator for CohereGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat", self.base_url);
        let request = CohereChatRequest {
            model: &self.model,
            message: prompt,
            temperature: self.temperature,
        };

        let response = send_json(&self.client, &url, &self.api_key, &request).await?;
        let parsed: CohereChatResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse response: {}", e)))?;

        non_empty(parsed.text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI-compatible chat completions client
pub struct OpenAIChatGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAIChatGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key: require_key(config)?,
            model: config.model.clone(),
            temperature: config.temperature,
            base_url: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Generator for OpenAIChatGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = send_json(&self.client, &url, &self.api_key, &request).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        non_empty(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn non_empty(text: String) -> Result<String> {
    if text.trim().is_empty() {
        Err(unavailable("Empty response from model"))
    } else {
        Ok(text)
    }
}

/// Mock generator that echoes the question back
pub struct MockGenerator;

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let question = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Question:"))
            .map(str::trim)
            .unwrap_or("");

        Ok(format!(
            "Based on the provided context, here is an answer about {}.\n\n[Mock response - generation provider not configured]",
            question
        ))
    }

    fn model_name(&self) -> &str {
        "mock-generator"
    }
}

/// Wraps a generator with latency and error metrics
pub struct InstrumentedGenerator {
    inner: Arc<dyn Generator>,
}

impl InstrumentedGenerator {
    pub fn new(inner: Arc<dyn Generator>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Generator for InstrumentedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let result = self.inner.generate(prompt).await;
        metrics::record_generation(
            start.elapsed().as_secs_f64(),
            self.inner.model_name(),
            result.is_ok(),
        );
        result
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    let inner: Arc<dyn Generator> = match config.provider.as_str() {
        "cohere" => Arc::new(CohereGenerator::new(config)?),
        "openai" => Arc::new(OpenAIChatGenerator::new(config)?),
        "mock" => Arc::new(MockGenerator),
        other => {
            return Err(AppError::Configuration {
                message: format!("unknown generation provider '{}'", other),
            })
        }
    };

    Ok(Arc::new(InstrumentedGenerator::new(inner)))
}
