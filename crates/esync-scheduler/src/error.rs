use esync_blobstore::BlobStoreError;
use esync_dispatcher::DispatchError;
use esync_drive::DriveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    BlobStore(#[from] BlobStoreError),

    #[error(transparent)]
    Drive(#[from] DriveError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("failed to load tenant registry: {0}")]
    Registry(String),
}
