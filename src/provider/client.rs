//! Provider abstraction used by the processing turn.

use super::error::Error;
use super::types::ChatRequest;
use async_trait::async_trait;

/// A hosted chat-completion endpoint.
///
/// One call is one network round trip; retrying is the caller's concern.
#[async_trait]
pub trait LlmApi: Send + Sync {
    /// Provider identifier, for logs.
    fn id(&self) -> &str;
    /// Get a non-streaming chat completion and return its text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, Error>;
}
