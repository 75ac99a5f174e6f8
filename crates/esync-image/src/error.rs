use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image failed to decode")]
    DecodeFailed,
}
