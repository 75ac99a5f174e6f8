use std::sync::Arc;

use esync_blobstore::BlobStore;
use esync_drive::DriveAdapter;
use esync_embed::EmbeddingProvider;
use esync_image::NormalizeConfig;

/// Collaborators the Sync Engine needs for one run. Held behind `Arc` so a
/// single set can be shared across a batch of tenants.
#[derive(Clone)]
pub struct SyncDeps {
    pub artifacts: Arc<dyn BlobStore>,
    pub drive: Arc<DriveAdapter>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub checkpoint_interval: usize,
    pub normalize: NormalizeConfig,
}

impl SyncDeps {
    pub fn artifact_key(uuid: &esync_domain::TenantId) -> String {
        format!("{uuid}.json")
    }
}
