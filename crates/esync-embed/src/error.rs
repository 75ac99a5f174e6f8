use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("provider returned status {status} for {url}: {body}")]
    ProviderStatus { url: String, status: u16, body: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}
