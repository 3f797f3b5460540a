//! OpenAI-compatible API client.

use super::request::OpenAIRequest;
use super::response::OpenAIResponse;
use crate::provider::client::LlmApi;
use crate::provider::error::Error;
use crate::provider::http::HttpClient;
use crate::provider::types::ChatRequest;
use async_trait::async_trait;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completion client for `OpenAI` and API-compatible hosts.
#[derive(Debug)]
pub struct OpenAICompatClient {
    http: HttpClient,
}

impl OpenAICompatClient {
    /// Create a client against the public `OpenAI` endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, Error> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (proxies, compatible hosts).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, Error> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::MissingApiKey {
                env_var: "OPENAI_API_KEY",
            });
        }

        Ok(Self {
            http: HttpClient::new(base_url, api_key.trim()),
        })
    }
}

#[async_trait]
impl LlmApi for OpenAICompatClient {
    fn id(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, Error> {
        let body = OpenAIRequest::from(request);

        tracing::debug!(
            model = %body.model,
            messages = body.messages.len(),
            max_tokens = body.max_tokens,
            "chat completion request"
        );

        let response: OpenAIResponse = self.http.post_json("/chat/completions", &body).await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = response.model.as_deref().unwrap_or_default(),
                input_tokens = usage.prompt_tokens,
                output_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }

        response.into_text().ok_or(Error::EmptyResponse)
    }
}
