use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing credential or an invalid control value. Never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The hosted call failed, after retries or on a fatal error.
    #[error("Model call failed after {attempts} attempt(s): {source}")]
    Call {
        attempts: u32,
        #[source]
        source: crate::provider::Error,
    },

    #[error("Persistence error: {0}")]
    Persistence(#[from] crate::session::SessionStoreError),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, Error>;
