use std::num::NonZeroUsize;

use esync_drive::DriveAdapter;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::error::RouterError;

pub const DEFAULT_PARENT_CACHE_CAPACITY: usize = 1024;

/// Bounded memoization of folder-id -> parent-folder-ids lookups, scoped to
/// one router instance. Least-recently-used entries are evicted once the
/// capacity is reached; there is no invalidation beyond that, so a folder
/// moved in Drive during the process lifetime may be judged by its old
/// ancestry until evicted.
pub struct ParentCache {
    inner: Mutex<LruCache<String, Vec<String>>>,
}

impl ParentCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn parents_of(
        &self,
        drive: &DriveAdapter,
        folder_id: &str,
    ) -> Result<Vec<String>, RouterError> {
        if let Some(cached) = self.inner.lock().await.get(folder_id) {
            return Ok(cached.clone());
        }
        let parents = drive.get_parents(folder_id).await?;
        self.inner.lock().await.put(folder_id.to_string(), parents.clone());
        Ok(parents)
    }
}

impl Default for ParentCache {
    fn default() -> Self {
        Self::new(DEFAULT_PARENT_CACHE_CAPACITY)
    }
}
