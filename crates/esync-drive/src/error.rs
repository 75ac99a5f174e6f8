use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("could not resolve a folder id from url {0:?}")]
    UnresolvableFolderUrl(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("drive api returned status {status} for {url}: {body}")]
    ApiStatus { url: String, status: u16, body: String },

    #[error("change feed page token expired (410)")]
    PageTokenExpired,

    #[error("malformed response from {context}: {message}")]
    MalformedResponse { context: String, message: String },
}
