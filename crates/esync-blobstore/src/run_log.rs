use std::sync::Arc;

use esync_domain::BatchUpdateResult;

use crate::error::BlobStoreError;
use crate::store::{BlobStore, BlobStoreJsonExt};

/// Writes [`BatchUpdateResult`] run logs to `logs/batch_update_results_<ts>.json`
/// under the artifact bucket. Write-only from the core crates' perspective;
/// logs are operational history, never read back by the sync pipeline.
pub struct RunLogWriter {
    blobs: Arc<dyn BlobStore>,
}

impl RunLogWriter {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub async fn write(
        &self,
        result: &BatchUpdateResult,
        timestamp: &str,
    ) -> Result<(), BlobStoreError> {
        let key = format!("logs/batch_update_results_{timestamp}.json");
        self.blobs.put_json(&key, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBlobStore;
    use chrono::Utc;

    #[tokio::test]
    async fn write_places_log_under_logs_prefix() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let writer = RunLogWriter::new(blobs.clone());
        let result = BatchUpdateResult {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            outcomes: vec![],
        };
        writer.write(&result, "20260727T000000Z").await.unwrap();

        let keys = blobs.list("logs/").await.unwrap();
        assert_eq!(keys, vec!["logs/batch_update_results_20260727T000000Z.json"]);
    }
}
