//! Models offered in the model selector, and the sampling ranges.

use super::types::CompletionSettings;
use std::ops::RangeInclusive;

/// Selectable model identifiers, first is the default.
pub const MODELS: &[&str] = &["gpt-4o-mini", "gpt-4o", "gpt-4-turbo", "gpt-3.5-turbo"];

pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 256..=8192;

#[must_use]
pub fn is_known_model(model: &str) -> bool {
    MODELS.contains(&model)
}

impl CompletionSettings {
    /// Check every value against the selector options and slider ranges.
    pub fn validate(&self) -> Result<(), String> {
        if !is_known_model(&self.model) {
            return Err(format!(
                "Unknown model '{}'. Choose one of: {}",
                self.model,
                MODELS.join(", ")
            ));
        }
        if !TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(format!(
                "Temperature {} is outside {}..={}",
                self.temperature,
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            ));
        }
        if !MAX_TOKENS_RANGE.contains(&self.max_tokens) {
            return Err(format!(
                "Token limit {} is outside {}..={}",
                self.max_tokens,
                MAX_TOKENS_RANGE.start(),
                MAX_TOKENS_RANGE.end()
            ));
        }
        Ok(())
    }
}
