use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Insufficient data: need at least 2 closed bars, got {bars}")]
    InsufficientData { bars: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Non-monotonic input: timestamp at bar {index} does not follow the previous bar")]
    NonMonotonicInput { index: usize },

    #[error("Non-finite input: bar {index} has a NaN or infinite price")]
    NonFiniteInput { index: usize },

    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
