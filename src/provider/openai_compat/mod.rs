//! OpenAI-compatible chat-completion client.

mod client;
mod request;
mod response;

pub use client::{DEFAULT_BASE_URL, OpenAICompatClient};
