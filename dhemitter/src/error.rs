use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid URN component: {0}")]
    InvalidComponent(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EmitterError>;
