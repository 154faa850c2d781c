use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("source error: {0}")]
    Source(#[from] snowfetcher::error::SnowfetcherError),

    #[error("target error: {0}")]
    Target(#[from] dhemitter::error::EmitterError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
