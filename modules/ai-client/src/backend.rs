use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use tribuna_common::BackendConfig;

use crate::types::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat};

/// Request timeout for a single completion call. Generation is triggered
/// interactively, so a slow backend is skipped rather than waited on.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(8);

/// One chat-completion backend. A single invocation per request: callers
/// that want resilience iterate over an ordered list of these.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Issue one chat completion requesting strict JSON output and return
    /// the first choice's message content.
    async fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String>;
}

/// OpenAI-compatible HTTP backend. All configured providers (OpenAI, Groq,
/// DeepSeek, OpenRouter) speak this wire format; only base URL, key and
/// model differ.
pub struct HttpBackend {
    config: BackendConfig,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .build()
            .expect("Failed to build completion HTTP client");
        Self { config, http }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    fn name(&self) -> &str {
        self.config.name
    }

    async fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let request = ChatRequest {
            model: self.config.model.clone(),
            temperature,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            response_format: Some(ResponseFormat::json()),
        };

        debug!(backend = self.config.name, model = %request.model, "Chat completion request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!(
                "{} API error ({}): {}",
                self.config.name,
                status,
                error_text
            ));
        }

        let chat_response: ChatResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow!("Empty completion from {}", self.config.name))
    }
}
