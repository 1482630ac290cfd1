use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid base URL: {0}")]
    BaseUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error (status {status}): {path}")]
    Api { status: u16, path: String },
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            let target = err.url().map(|u| u.path().to_string()).unwrap_or_default();
            return ClientError::Timeout(target);
        }
        ClientError::Network(err.to_string())
    }
}
