//! Provider error types.

use thiserror::Error;

/// Make an API error body readable by pulling `error.message` out of JSON.
///
/// `HTTP 401 Unauthorized: {"error":{"message":"Incorrect API key","code":"invalid_api_key"}}`
/// becomes `HTTP 401 Unauthorized: Incorrect API key (code: invalid_api_key)`.
/// Anything that is not JSON is returned unchanged.
#[must_use]
pub fn format_api_error(error: &str) -> String {
    let Some(json_start) = error.find('{') else {
        return error.to_string();
    };

    let parsed = serde_json::from_str::<serde_json::Value>(&error[json_start..]).ok();
    let Some(message) = parsed.as_ref().and_then(error_message) else {
        return error.to_string();
    };

    let prefix = error[..json_start].trim();
    if prefix.is_empty() {
        message
    } else {
        format!("{prefix} {message}")
    }
}

fn error_message(json: &serde_json::Value) -> Option<String> {
    match json.get("error") {
        Some(serde_json::Value::String(msg)) => Some(msg.clone()),
        Some(obj) => {
            let msg = obj.get("message")?.as_str()?;
            match obj.get("code").and_then(|c| c.as_str()) {
                Some(code) => Some(format!("{msg} (code: {code})")),
                None => Some(msg.to_string()),
            }
        }
        None => json.get("message")?.as_str().map(String::from),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing API key. Enter one in the sidebar or set {env_var}")]
    MissingApiKey { env_var: &'static str },

    #[error("Failed to build request: {0}")]
    Build(String),

    #[error("API error: {}", format_api_error(.0))]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Response contained no message content")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_openai_error() {
        let error = r#"HTTP 401 Unauthorized: {"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        assert_eq!(
            format_api_error(error),
            "HTTP 401 Unauthorized: Incorrect API key provided (code: invalid_api_key)"
        );
    }

    #[test]
    fn test_format_string_error() {
        assert_eq!(format_api_error(r#"{"error":"Bad gateway"}"#), "Bad gateway");
    }

    #[test]
    fn test_format_plain_and_broken() {
        assert_eq!(format_api_error("Connection refused"), "Connection refused");
        assert_eq!(
            format_api_error("HTTP 500: {not json}"),
            "HTTP 500: {not json}"
        );
    }
}
