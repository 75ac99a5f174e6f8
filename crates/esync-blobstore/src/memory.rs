use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::BlobStoreError;
use crate::store::BlobStore;

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, Vec<u8>>,
}

/// In-memory [`BlobStore`]. All data is lost on process exit; used by tests
/// and as the default backend when no persistent bucket is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError> {
        let guard = self.inner.read().await;
        Ok(guard.objects.get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobStoreError> {
        let mut guard = self.inner.write().await;
        guard.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        let mut guard = self.inner.write().await;
        guard.objects.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobStoreError> {
        let guard = self.inner.read().await;
        Ok(guard.objects.contains_key(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        let guard = self.inner.read().await;
        let mut keys: Vec<String> = guard
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BlobStoreJsonExt;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        n: u32,
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = MemoryBlobStore::new();
        store.put("a.json", b"hello".to_vec()).await.unwrap();
        let got = store.get("a.json").await.unwrap();
        assert_eq!(got, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let store = MemoryBlobStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let store = MemoryBlobStore::new();
        store.put("a", vec![1]).await.unwrap();
        store.delete("a").await.unwrap();
        assert!(!store.exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = MemoryBlobStore::new();
        store.put("watch/1.json", vec![]).await.unwrap();
        store.put("watch/2.json", vec![]).await.unwrap();
        store.put("artifacts/3.json", vec![]).await.unwrap();

        let keys = store.list("watch/").await.unwrap();
        assert_eq!(keys, vec!["watch/1.json", "watch/2.json"]);
    }

    #[tokio::test]
    async fn json_helpers_roundtrip() {
        let store = MemoryBlobStore::new();
        store.put_json("doc.json", &Doc { n: 7 }).await.unwrap();
        let got: Option<Doc> = store.get_json("doc.json").await.unwrap();
        assert_eq!(got, Some(Doc { n: 7 }));
    }
}
