use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnowfetcherError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("login rejected: {0}")]
    Login(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("missing column in result set: {0}")]
    MissingColumn(&'static str),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SnowfetcherError>;
