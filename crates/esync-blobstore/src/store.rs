use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::BlobStoreError;

/// Whole-object byte storage. Every write replaces the object named by `key`
/// in full; there is no partial-write or append primitive, matching the
/// persistence model used throughout the sync pipeline (artifacts,
/// manifests, watch state, run logs are each a single JSON document).
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError>;
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobStoreError>;
    async fn delete(&self, key: &str) -> Result<(), BlobStoreError>;
    async fn exists(&self, key: &str) -> Result<bool, BlobStoreError>;
    /// List keys under `prefix`. Backends are free to implement this as a
    /// linear scan; corpora are small enough that this is never a hot path.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError>;
}

/// Convenience JSON helpers layered over any [`BlobStore`]. Kept as a
/// blanket extension trait (not part of `BlobStore` itself) because generic
/// methods are not dyn-compatible and every call site holds a `dyn BlobStore`
/// or `Arc<dyn BlobStore>`.
#[async_trait]
pub trait BlobStoreJsonExt: BlobStore {
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, BlobStoreError> {
        match self.get(key).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|source| {
                    BlobStoreError::Serialization {
                        key: key.to_string(),
                        source,
                    }
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn put_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), BlobStoreError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| {
            BlobStoreError::Serialization {
                key: key.to_string(),
                source,
            }
        })?;
        self.put(key, bytes).await
    }
}

impl<T: BlobStore + ?Sized> BlobStoreJsonExt for T {}
