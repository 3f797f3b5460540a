use regex::Regex;
use std::sync::LazyLock;

/// Opening fence with an optional language tag, non-greedy body, closing fence.
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-zA-Z0-9_+-]*\n(.*?)```").expect("fenced block pattern is valid")
});

/// Trimmed body of the first fenced code block in `text`.
///
/// Only the first block is returned, even when the response has several.
#[must_use]
pub fn extract_code(text: &str) -> Option<String> {
    FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str().trim().to_string())
}
