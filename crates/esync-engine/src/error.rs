use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("blob store error: {0}")]
    BlobStore(#[from] esync_blobstore::BlobStoreError),

    #[error("drive error: {0}")]
    Drive(#[from] esync_drive::DriveError),

    #[error("domain error: {0}")]
    Domain(#[from] esync_domain::DomainError),

    #[error("sync run was cancelled before completing")]
    Cancelled,
}
