//! Fixed-delay retry around a single completion call.

use crate::error::Error;
use crate::provider::{self, ChatRequest, LlmApi};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1200);

/// How many times to call, and how long to wait between calls.
/// The delay is flat: no backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// A successful completion and how many calls it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub attempts: u32,
}

/// Classify an error that retrying cannot fix, returning the category.
///
/// Everything not listed here is retried the same way.
pub(crate) fn fatal_category(err: &provider::Error) -> Option<&'static str> {
    match err {
        provider::Error::MissingApiKey { .. } => return Some("Missing API key"),
        provider::Error::Build(_) => return Some("Invalid request"),
        _ => {}
    }

    let msg = err.to_string();
    let msg_lower = msg.to_lowercase();

    if msg.contains("HTTP 401") || msg.contains("HTTP 403") || msg_lower.contains("invalid api key")
    {
        return Some("Authentication failed");
    }
    if msg.contains("HTTP 404") {
        return Some("Model or endpoint not found");
    }
    if msg.contains("HTTP 400") {
        return Some("Bad request");
    }

    None
}

/// Call `llm` up to `policy.max_attempts` times, sleeping `policy.delay`
/// between failed attempts.
///
/// Exhaustion yields `Error::Call` carrying the last underlying error.
pub async fn complete_with_retry(
    llm: &dyn LlmApi,
    request: &ChatRequest,
    policy: &RetryPolicy,
) -> Result<Completion, Error> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        debug!(
            provider = llm.id(),
            attempt, max_attempts, "Sending completion request"
        );

        let err = match llm.complete(request).await {
            Ok(text) => {
                return Ok(Completion {
                    text,
                    attempts: attempt,
                });
            }
            Err(e) => e,
        };

        if let Some(reason) = fatal_category(&err) {
            warn!("{reason}, not retrying: {err}");
            return Err(Error::Call {
                attempts: attempt,
                source: err,
            });
        }

        if attempt >= max_attempts {
            warn!("Completion failed on final attempt {attempt}/{max_attempts}: {err}");
            return Err(Error::Call {
                attempts: attempt,
                source: err,
            });
        }

        warn!(
            "Completion failed, retrying in {}ms (attempt {}/{}): {}",
            policy.delay.as_millis(),
            attempt,
            max_attempts,
            err
        );
        tokio::time::sleep(policy.delay).await;
    }
}
