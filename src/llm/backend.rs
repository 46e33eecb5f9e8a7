//! Ollama HTTP adapter.
//!
//! Generation goes through `POST /api/generate` with streaming disabled;
//! the health check lists installed models through `GET /api/tags`.

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Failures talking to the language-model backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("cannot connect to Ollama at {0}. Is it running? (ollama serve)")]
    Connect(String),
    #[error("Ollama request timed out after {0}s")]
    Timeout(u64),
    #[error("Ollama API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode Ollama response: {0}")]
    Decode(String),
    #[error("failed to send request: {0}")]
    Request(String),
}

/// A text generation service.
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for `prompt`.
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, BackendError>>;

    /// Names of the models the backend can serve.
    fn list_models(&self) -> BoxFuture<'_, Result<Vec<String>, BackendError>>;

    /// Model used for generation.
    fn model(&self) -> &str;
}

/// Ollama generate API request.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Ollama generate API response.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    #[serde(default)]
    name: String,
}

/// Client for a local or remote Ollama server.
pub struct OllamaBackend {
    base_url: String,
    model: String,
    timeout_seconds: u64,
    health_timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(
        base_url: &str,
        model: &str,
        timeout_seconds: u64,
        health_timeout_seconds: u64,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout_seconds,
            health_timeout_seconds,
            http_client,
        })
    }

    fn classify_error(&self, e: reqwest::Error, timeout_seconds: u64) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(timeout_seconds)
        } else if e.is_connect() {
            BackendError::Connect(self.base_url.clone())
        } else if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Request(e.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status { status, body })
    }

    /// Send `prompt` to `/api/generate` and return the response text.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        debug!("Sending generate request ({} prompt bytes)", prompt.len());

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify_error(e, self.timeout_seconds))?;
        let response = Self::check_status(response).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        Ok(body.response)
    }

    /// List installed models through `/api/tags`.
    pub async fn fetch_models(&self) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .timeout(Duration::from_secs(self.health_timeout_seconds))
            .send()
            .await
            .map_err(|e| self.classify_error(e, self.health_timeout_seconds))?;
        let response = Self::check_status(response).await?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        info!("Ollama reports {} models", names.len());
        Ok(names)
    }
}

impl GenerationBackend for OllamaBackend {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, BackendError>> {
        Box::pin(self.generate_text(prompt))
    }

    fn list_models(&self) -> BoxFuture<'_, Result<Vec<String>, BackendError>> {
        Box::pin(self.fetch_models())
    }

    fn model(&self) -> &str {
        &self.model
    }
}
