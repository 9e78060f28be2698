use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("counter encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("internal store error: {0}")]
    Internal(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
