use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("rate limited by embedding provider: {0}")]
    RateLimited(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("input rejected: {0}")]
    Rejected(String),

    #[error("input is empty or whitespace-only")]
    EmptyInput,

    #[error("embedding dimension {actual} does not match configured {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("permanent embedding failure: {0}")]
    Permanent(String),
}

impl EmbedError {
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbedError::RateLimited(_) => true,
            EmbedError::Http(error) => error.is_timeout() || error.is_connect(),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("document tokenizes to nothing")]
    EmptyDocument,

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("store error: {0}")]
    Store(#[from] SearchError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query vector dimension {actual} does not match stored dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("search request failed: {0}")]
    Request(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
