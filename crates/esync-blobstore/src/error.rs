use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("io error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error for {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("backend request failed for {key}: {source}")]
    Backend {
        key: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend returned status {status} for {key}: {body}")]
    BackendStatus {
        key: String,
        status: u16,
        body: String,
    },

    #[error("auth error: {0}")]
    Auth(String),
}
