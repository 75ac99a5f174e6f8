use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("duplicate key (folder_path={folder_path:?}, filename={filename:?}) in artifact")]
    DuplicateKey { folder_path: String, filename: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
