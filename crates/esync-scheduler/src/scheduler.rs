use std::sync::Arc;

use chrono::Utc;
use esync_blobstore::ManifestStore;
use esync_dispatcher::Dispatcher;
use esync_drive::DriveAdapter;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::error::SchedulerError;
use crate::gate::{build_manifest, needs_update};
use crate::registry::TenantRegistry;

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct SchedulerReport {
    pub considered: usize,
    pub dispatched: usize,
    pub failed: usize,
}

pub struct Scheduler {
    registry: Arc<dyn TenantRegistry>,
    drive: Arc<DriveAdapter>,
    manifests: Arc<ManifestStore>,
    dispatcher: Arc<Dispatcher>,
    max_workers: usize,
}

impl Scheduler {
    pub fn new(
        registry: Arc<dyn TenantRegistry>,
        drive: Arc<DriveAdapter>,
        manifests: Arc<ManifestStore>,
        dispatcher: Arc<Dispatcher>,
        max_workers: usize,
    ) -> Self {
        Self {
            registry,
            drive,
            manifests,
            dispatcher,
            max_workers: max_workers.max(1),
        }
    }

    /// One scheduler pass: enumerate auto-update tenants, gate each on its
    /// manifest, and dispatch the ones that changed. Dispatch concurrency
    /// is bounded by a semaphore; the dispatcher itself is fire-and-forget,
    /// so the manifest is rewritten optimistically right after a
    /// successful dispatch call rather than after true worker completion,
    /// which this architecture cannot observe.
    pub async fn run_once(&self) -> Result<SchedulerReport, SchedulerError> {
        let tenants = self.registry.list_auto_update_tenants().await?;
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut report = SchedulerReport {
            considered: tenants.len(),
            ..Default::default()
        };

        let mut handles = Vec::with_capacity(tenants.len());
        for tenant in tenants {
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let drive = self.drive.clone();
            let manifests = self.manifests.clone();
            let dispatcher = self.dispatcher.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let current = match drive.list_folder_tree(&tenant.drive_url).await {
                    Ok(files) => files,
                    Err(e) => {
                        warn!(uuid = %tenant.uuid, error = %e, "scheduler: failed to list drive tree");
                        return Err(SchedulerError::Drive(e));
                    }
                };

                let should_update = match manifests.load(&tenant.uuid).await {
                    Ok(existing_manifest) => needs_update(&current, &existing_manifest),
                    Err(e) => {
                        warn!(uuid = %tenant.uuid, error = %e, "scheduler: manifest load failed, treating as needs-update");
                        true
                    }
                };
                if !should_update {
                    info!(uuid = %tenant.uuid, "scheduler: no change, skipping");
                    return Ok(false);
                }

                dispatcher.dispatch_single(&tenant.uuid, &tenant.drive_url, tenant.use_embed_v4)?;

                let new_manifest = build_manifest(&current, Utc::now());
                manifests.save(&tenant.uuid, &new_manifest).await?;
                info!(uuid = %tenant.uuid, "scheduler: dispatched update and rewrote manifest");
                Ok(true)
            });
            handles.push(handle);
        }

        for handle in handles {
            match handle.await {
                Ok(Ok(true)) => report.dispatched += 1,
                Ok(Ok(false)) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "scheduler: tenant task failed");
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "scheduler: tenant task panicked");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use esync_blobstore::MemoryBlobStore;
    use esync_config::{AppConfig, EmbeddingProviderKind};
    use esync_domain::TenantId;
    use esync_drive::auth::StaticToken;
    use std::path::PathBuf;

    struct FixedRegistry(Vec<esync_domain::TenantRegistryEntry>);

    #[async_trait]
    impl TenantRegistry for FixedRegistry {
        async fn list_auto_update_tenants(
            &self,
        ) -> Result<Vec<esync_domain::TenantRegistryEntry>, SchedulerError> {
            Ok(self.0.clone())
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            embedding_provider: EmbeddingProviderKind::VertexAi,
            embedding_provider_api_key: "key".into(),
            drive_watch_ttl_seconds: 86400,
            drive_watch_cooldown_seconds: 60,
            checkpoint_interval: 100,
            max_pixels: 2_300_000,
            max_file_size_mb: 5,
            max_workers: 3,
            artifact_bucket: "artifacts".into(),
            manifest_bucket: "manifests".into(),
            watch_state_prefix: "watch".into(),
            gcp_project: None,
            gcp_region: None,
            drive_watch_callback_url: None,
            api_auth_token: None,
            bind_addr: "0.0.0.0:8080".into(),
        }
    }

    #[tokio::test]
    async fn no_tenants_yields_empty_report() {
        let registry = Arc::new(FixedRegistry(vec![]));
        let drive = Arc::new(DriveAdapter::with_base_url_for_tests(
            Box::new(StaticToken("tok".into())),
            "http://127.0.0.1:0".to_string(),
        ));
        let manifests = Arc::new(ManifestStore::new(Arc::new(MemoryBlobStore::new())));
        let dispatcher = Arc::new(Dispatcher::with_binary_for_tests(
            test_config(),
            PathBuf::from("/bin/true"),
        ));
        let scheduler = Scheduler::new(registry, drive, manifests, dispatcher, 3);

        let report = scheduler.run_once().await.unwrap();
        assert_eq!(report.considered, 0);
        assert_eq!(report.dispatched, 0);

        let _ = TenantId::new(uuid::Uuid::new_v4());
    }
}
