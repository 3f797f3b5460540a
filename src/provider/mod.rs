//! Hosted chat-completion provider.
//!
//! A thin client for OpenAI-compatible `/chat/completions` endpoints plus the
//! message types shared with the session store.
//!
//! # Example
//!
//! ```ignore
//! use nxgenie::provider::{ChatRequest, LlmApi, Message, OpenAICompatClient};
//!
//! let client = OpenAICompatClient::new(api_key)?;
//! let text = client.complete(&request).await?;
//! ```

mod client;
mod error;
mod http;
mod models;
mod openai_compat;
mod types;

pub use client::LlmApi;
pub use error::{Error, format_api_error};
pub use models::{MAX_TOKENS_RANGE, MODELS, TEMPERATURE_RANGE, is_known_model};
pub use openai_compat::{DEFAULT_BASE_URL, OpenAICompatClient};
pub use types::*;
