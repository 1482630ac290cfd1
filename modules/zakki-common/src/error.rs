use thiserror::Error;

/// Result type alias for tag-loader operations.
pub type Result<T> = std::result::Result<T, ZakkiError>;

#[derive(Error, Debug)]
pub enum ZakkiError {
    #[error("Invalid tag name: {0:?}")]
    InvalidTag(String),

    #[error("Path outside the diary archive: {0}")]
    InvalidPath(String),

    #[error("Rate limit reached: {limit} requests per {window_secs}s")]
    RateLimited { limit: usize, window_secs: u64 },

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
