use std::sync::Arc;

use chrono::{DateTime, Utc};
use esync_domain::{CompanyState, DriveChannelState, TenantId};
use serde::{Deserialize, Serialize};

use crate::error::BlobStoreError;
use crate::store::{BlobStore, BlobStoreJsonExt};

/// Tagged union sharing one key namespace so `list()` over the prefix can
/// enumerate both record kinds without a second bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
enum WatchRecord {
    Company(CompanyState),
    DriveChannel(DriveChannelState),
}

/// Namespaced view over a [`BlobStore`] holding `CompanyState` and
/// `DriveChannelState`. Keys: `<prefix>/<uuid>.json` for companies,
/// `<prefix>/drive-channel-<drive_id|"root">.json` for channels.
pub struct WatchStateStore {
    blobs: Arc<dyn BlobStore>,
    prefix: String,
}

impl WatchStateStore {
    pub fn new(blobs: Arc<dyn BlobStore>, prefix: impl Into<String>) -> Self {
        Self {
            blobs,
            prefix: prefix.into(),
        }
    }

    fn company_key(&self, uuid: &TenantId) -> String {
        format!("{}/{}.json", self.prefix, uuid)
    }

    fn channel_key(&self, drive_id: Option<&str>) -> String {
        format!("{}/drive-channel-{}.json", self.prefix, drive_id.unwrap_or("root"))
    }

    pub async fn save_company(&self, state: &CompanyState) -> Result<(), BlobStoreError> {
        self.blobs
            .put_json(&self.company_key(&state.uuid), &WatchRecord::Company(state.clone()))
            .await
    }

    pub async fn load_company(
        &self,
        uuid: &TenantId,
    ) -> Result<Option<CompanyState>, BlobStoreError> {
        match self.blobs.get_json(&self.company_key(uuid)).await? {
            Some(WatchRecord::Company(state)) => Ok(Some(state)),
            Some(WatchRecord::DriveChannel(_)) | None => Ok(None),
        }
    }

    pub async fn delete_company(&self, uuid: &TenantId) -> Result<(), BlobStoreError> {
        self.blobs.delete(&self.company_key(uuid)).await
    }

    /// All companies subscribed under a given physical drive (`None` = My
    /// Drive). Linear scan of the namespace; corpora are small.
    pub async fn list_companies_for_drive(
        &self,
        drive_id: Option<&str>,
    ) -> Result<Vec<CompanyState>, BlobStoreError> {
        let mut out = Vec::new();
        for key in self.blobs.list(&format!("{}/", self.prefix)).await? {
            if key.contains("/drive-channel-") {
                continue;
            }
            if let Some(WatchRecord::Company(state)) = self.blobs.get_json(&key).await? {
                if state.drive_id.as_deref() == drive_id {
                    out.push(state);
                }
            }
        }
        Ok(out)
    }

    /// Every registered company across every physical drive. Linear scan;
    /// used by bulk operations like forced re-registration.
    pub async fn list_all_companies(&self) -> Result<Vec<CompanyState>, BlobStoreError> {
        let mut out = Vec::new();
        for key in self.blobs.list(&format!("{}/", self.prefix)).await? {
            if key.contains("/drive-channel-") {
                continue;
            }
            if let Some(WatchRecord::Company(state)) = self.blobs.get_json(&key).await? {
                out.push(state);
            }
        }
        Ok(out)
    }

    pub async fn save_channel(&self, state: &DriveChannelState) -> Result<(), BlobStoreError> {
        let key = self.channel_key(state.drive_id.as_deref());
        self.blobs
            .put_json(&key, &WatchRecord::DriveChannel(state.clone()))
            .await
    }

    pub async fn load_channel(
        &self,
        drive_id: Option<&str>,
    ) -> Result<Option<DriveChannelState>, BlobStoreError> {
        match self.blobs.get_json(&self.channel_key(drive_id)).await? {
            Some(WatchRecord::DriveChannel(state)) => Ok(Some(state)),
            Some(WatchRecord::Company(_)) | None => Ok(None),
        }
    }

    pub async fn delete_channel(&self, drive_id: Option<&str>) -> Result<(), BlobStoreError> {
        self.blobs.delete(&self.channel_key(drive_id)).await
    }

    /// Linear scan over all channel records for the one matching `channel_id`.
    pub async fn find_channel_by_id(
        &self,
        channel_id: uuid::Uuid,
    ) -> Result<Option<DriveChannelState>, BlobStoreError> {
        for key in self.blobs.list(&format!("{}/drive-channel-", self.prefix)).await? {
            if let Some(WatchRecord::DriveChannel(state)) = self.blobs.get_json(&key).await? {
                if state.channel_id == channel_id {
                    return Ok(Some(state));
                }
            }
        }
        Ok(None)
    }
}

/// Advance the CompanyState cooldown timestamp and persist it.
pub async fn mark_triggered(
    store: &WatchStateStore,
    mut state: CompanyState,
    now: DateTime<Utc>,
) -> Result<(), BlobStoreError> {
    state.last_job_trigger_ts = Some(now);
    store.save_company(&state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBlobStore;
    use uuid::Uuid;

    fn company(uuid: TenantId, drive_id: Option<&str>) -> CompanyState {
        CompanyState {
            uuid,
            drive_url: "https://drive.google.com/drive/folders/abc".into(),
            folder_id: "abc".into(),
            drive_id: drive_id.map(str::to_string),
            use_embed_v4: false,
            last_job_trigger_ts: None,
        }
    }

    #[tokio::test]
    async fn save_then_load_company_roundtrips() {
        let store = WatchStateStore::new(Arc::new(MemoryBlobStore::new()), "watch");
        let tenant = TenantId::new(Uuid::new_v4());
        store.save_company(&company(tenant, None)).await.unwrap();

        let loaded = store.load_company(&tenant).await.unwrap();
        assert!(loaded.is_some());
        assert_eq!(loaded.unwrap().uuid, tenant);
    }

    #[tokio::test]
    async fn list_companies_for_drive_filters_by_drive_id() {
        let store = WatchStateStore::new(Arc::new(MemoryBlobStore::new()), "watch");
        store
            .save_company(&company(TenantId::new(Uuid::new_v4()), Some("drive-1")))
            .await
            .unwrap();
        store
            .save_company(&company(TenantId::new(Uuid::new_v4()), Some("drive-2")))
            .await
            .unwrap();

        let for_drive_1 = store.list_companies_for_drive(Some("drive-1")).await.unwrap();
        assert_eq!(for_drive_1.len(), 1);
    }

    #[tokio::test]
    async fn find_channel_by_id_scans_all_channels() {
        let store = WatchStateStore::new(Arc::new(MemoryBlobStore::new()), "watch");
        let channel_id = Uuid::new_v4();
        let state = DriveChannelState {
            drive_id: Some("drive-1".into()),
            channel_id,
            resource_id: "res-1".into(),
            expiration: Utc::now(),
            page_token: "tok".into(),
        };
        store.save_channel(&state).await.unwrap();

        let found = store.find_channel_by_id(channel_id).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().resource_id, "res-1");
    }

    #[tokio::test]
    async fn list_all_companies_spans_every_drive() {
        let store = WatchStateStore::new(Arc::new(MemoryBlobStore::new()), "watch");
        store
            .save_company(&company(TenantId::new(Uuid::new_v4()), Some("drive-1")))
            .await
            .unwrap();
        store
            .save_company(&company(TenantId::new(Uuid::new_v4()), None))
            .await
            .unwrap();

        let all = store.list_all_companies().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn find_channel_by_id_returns_none_for_unknown() {
        let store = WatchStateStore::new(Arc::new(MemoryBlobStore::new()), "watch");
        assert!(store.find_channel_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }
}
