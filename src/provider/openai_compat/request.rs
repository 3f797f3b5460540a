//! OpenAI-compatible API request types.

use crate::provider::types::{ChatRequest, Message};
use serde::Serialize;

/// Body of `POST /chat/completions`.
#[derive(Debug, Serialize)]
pub struct OpenAIRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub temperature: f32,
    pub max_tokens: u32,
}

impl<'a> From<&'a ChatRequest> for OpenAIRequest<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}
