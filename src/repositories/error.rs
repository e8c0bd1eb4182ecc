use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("repository initialization failed: {message}")]
    Initialization { message: String },
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
