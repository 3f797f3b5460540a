//! Code review turn: prompt, retrying call, code extraction.

pub mod context;
mod extract;
mod retry;
pub mod turn;

pub use context::PromptBuilder;
pub use extract::extract_code;
pub use retry::{Completion, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy, complete_with_retry};
pub use turn::{ProcessMode, TurnContext, TurnOutcome, process};
