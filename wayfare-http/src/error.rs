use thiserror::Error;
use wayfare_game::{LeaderboardError, ProviderError};

pub type Result<T> = std::result::Result<T, HttpError>;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            HttpError::Parse(err.to_string())
        } else {
            HttpError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::Parse(err.to_string())
    }
}

impl From<HttpError> for ProviderError {
    fn from(err: HttpError) -> Self {
        ProviderError::new(err.to_string())
    }
}

impl From<HttpError> for LeaderboardError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Api { status, message } => LeaderboardError::Api { status, message },
            HttpError::Parse(message) => LeaderboardError::Parse(message),
            HttpError::Network(message) | HttpError::Config(message) => {
                LeaderboardError::Network(message)
            }
        }
    }
}
