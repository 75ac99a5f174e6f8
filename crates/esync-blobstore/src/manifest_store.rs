use std::sync::Arc;

use esync_domain::{Manifest, TenantId};

use crate::error::BlobStoreError;
use crate::store::{BlobStore, BlobStoreJsonExt};

/// View over a [`BlobStore`] (the manifest bucket) holding one [`Manifest`]
/// per tenant, used only by the Scheduler's change-detection gate.
pub struct ManifestStore {
    blobs: Arc<dyn BlobStore>,
}

impl ManifestStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    fn key(uuid: &TenantId) -> String {
        format!("{uuid}.json")
    }

    pub async fn load(&self, uuid: &TenantId) -> Result<Manifest, BlobStoreError> {
        Ok(self.blobs.get_json(&Self::key(uuid)).await?.unwrap_or_else(Manifest::empty))
    }

    pub async fn save(&self, uuid: &TenantId, manifest: &Manifest) -> Result<(), BlobStoreError> {
        self.blobs.put_json(&Self::key(uuid), manifest).await
    }
}
