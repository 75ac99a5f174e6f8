use esync_blobstore::BlobStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no artifact found for tenant")]
    NotFound,

    #[error(transparent)]
    BlobStore(#[from] BlobStoreError),
}
