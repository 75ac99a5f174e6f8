use std::collections::HashSet;
use std::sync::Arc;

use esync_blobstore::BlobStoreJsonExt;
use esync_domain::{EmbeddingEntry, EntryKey, TenantArtifact, TenantId};
use esync_drive::FileMeta;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::deps::SyncDeps;
use crate::error::EngineError;
use crate::outcome::FileOutcome;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SyncReport {
    pub added: usize,
    pub deleted: usize,
    pub corrupt: usize,
    pub embed_failures: usize,
    pub download_failures: usize,
}

/// Persists the working copy on every exit path. The normal path calls
/// [`CheckpointGuard::finish`] explicitly; if the guard is dropped without
/// `finish` (a `?`-propagated error partway through the loop) it schedules
/// one best-effort final persist on the ambient tokio runtime so in-memory
/// progress is never silently lost — the signal-safe checkpoint this run
/// mode needs, expressed as RAII instead of a signal handler.
struct CheckpointGuard {
    artifacts: Arc<dyn esync_blobstore::BlobStore>,
    key: String,
    artifact: TenantArtifact,
    finished: bool,
}

impl CheckpointGuard {
    fn new(artifacts: Arc<dyn esync_blobstore::BlobStore>, key: String, artifact: TenantArtifact) -> Self {
        Self {
            artifacts,
            key,
            artifact,
            finished: false,
        }
    }

    async fn persist(&self) -> Result<(), EngineError> {
        self.artifacts.put_json(&self.key, &self.artifact).await?;
        Ok(())
    }

    async fn finish(mut self) -> Result<(), EngineError> {
        self.persist().await?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for CheckpointGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(key = %self.key, "sync run exiting without explicit checkpoint, scheduling best-effort final persist");
        let artifacts = self.artifacts.clone();
        let key = self.key.clone();
        let artifact = self.artifact.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = artifacts.put_json(&key, &artifact).await {
                    warn!(key = %key, error = %e, "best-effort final persist failed");
                }
            });
        }
    }
}

/// Run one tenant's sync: diff current Drive state against the persisted
/// artifact, download/normalize/embed every new file, checkpoint
/// periodically and on error, and always persist the final working copy.
pub async fn sync(
    deps: &SyncDeps,
    uuid: &TenantId,
    drive_url: &str,
    cancel: CancellationToken,
) -> Result<SyncReport, EngineError> {
    let key = SyncDeps::artifact_key(uuid);
    let mut artifact: TenantArtifact = deps
        .artifacts
        .get_json(&key)
        .await?
        .unwrap_or_else(TenantArtifact::empty);
    let existing_keys: HashSet<EntryKey> = artifact.keys();

    info!(uuid = %uuid, existing = existing_keys.len(), "starting sync");

    let drive_files = deps.drive.list_folder_tree(drive_url).await?;

    if drive_files.is_empty() && !artifact.entries.is_empty() {
        info!(uuid = %uuid, "drive tree is empty, clearing artifact");
        let deleted = artifact.entries.len();
        deps.artifacts.put_json(&key, &TenantArtifact::empty()).await?;
        return Ok(SyncReport {
            deleted,
            ..Default::default()
        });
    }

    let current_keys: HashSet<EntryKey> = drive_files
        .iter()
        .map(|f| EntryKey {
            folder_path: f.folder_path.clone(),
            filename: f.name.clone(),
        })
        .collect();

    let mut report = SyncReport::default();

    let to_delete: HashSet<&EntryKey> = existing_keys.difference(&current_keys).collect();
    if !to_delete.is_empty() {
        report.deleted = to_delete.len();
        artifact.retain_keys(&current_keys);
        debug!(uuid = %uuid, deleted = report.deleted, "removed stale entries, checkpointing");
        deps.artifacts.put_json(&key, &artifact).await?;
    }

    let to_add: Vec<&FileMeta> = drive_files
        .iter()
        .filter(|f| {
            let k = EntryKey {
                folder_path: f.folder_path.clone(),
                filename: f.name.clone(),
            };
            !existing_keys.contains(&k)
        })
        .collect();

    let mut guard = CheckpointGuard::new(deps.artifacts.clone(), key, artifact);
    let mut since_checkpoint = 0usize;

    for file in to_add {
        if cancel.is_cancelled() {
            warn!(uuid = %uuid, "cancellation requested, stopping before next file");
            break;
        }

        match process_one_file(deps, file).await {
            (FileOutcome::Appended, Some(entry)) => {
                guard.artifact.entries.push(entry);
                report.added += 1;
                since_checkpoint += 1;
                if since_checkpoint >= deps.checkpoint_interval {
                    debug!(uuid = %uuid, added = report.added, "checkpoint interval reached");
                    guard.persist().await?;
                    since_checkpoint = 0;
                }
            }
            (FileOutcome::SkippedNormalize(reason), Some(entry)) => {
                guard.artifact.entries.push(entry);
                report.corrupt += 1;
                debug!(uuid = %uuid, filename = %file.name, reason = %reason, "normalize failed, persisted as corrupt");
                guard.persist().await?;
            }
            (FileOutcome::SkippedEmbed, None) => {
                report.embed_failures += 1;
                warn!(uuid = %uuid, filename = %file.name, "embedding failed, will retry next run");
                guard.persist().await?;
            }
            (FileOutcome::SkippedDownload, None) => {
                report.download_failures += 1;
                warn!(uuid = %uuid, filename = %file.name, "download failed, will retry next run");
                guard.persist().await?;
            }
            _ => unreachable!("process_one_file outcome/entry pairing is exhaustive"),
        }
    }

    guard.finish().await?;
    info!(uuid = %uuid, ?report, "sync complete");
    Ok(report)
}

/// Drive the `NEW -> DOWNLOADED -> NORMALIZED -> EMBEDDED -> APPENDED`
/// pipeline for one file. Each terminal failure is recovered here and
/// classified, never propagated — per-file errors never abort the tenant's
/// run.
async fn process_one_file(
    deps: &SyncDeps,
    file: &FileMeta,
) -> (FileOutcome, Option<EmbeddingEntry>) {
    let bytes = match deps.drive.download(&file.id).await {
        Ok(b) => b,
        Err(e) => {
            warn!(filename = %file.name, error = %e, "download failed");
            return (FileOutcome::SkippedDownload, None);
        }
    };

    let normalized = match esync_image::normalize(&bytes, &file.name, deps.normalize) {
        Ok(b) => b,
        Err(reason) => {
            let entry = EmbeddingEntry::corrupt(&file.name, &file.web_view_link, &file.folder_path, reason);
            return (FileOutcome::SkippedNormalize(reason), Some(entry));
        }
    };

    let embedding = match deps.embedder.embed_image(&normalized, &file.name).await {
        Ok(v) => v,
        Err(e) => {
            warn!(filename = %file.name, error = %e, "embedding failed");
            return (FileOutcome::SkippedEmbed, None);
        }
    };

    let entry = EmbeddingEntry::valid(&file.name, &file.web_view_link, &file.folder_path, embedding);
    (FileOutcome::Appended, Some(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use esync_blobstore::MemoryBlobStore;
    use esync_domain::CorruptReason;
    use esync_drive::{DriveAdapter, StaticToken};
    use esync_embed::{EmbedError, EmbeddingProvider, ModelHint};
    use esync_image::NormalizeConfig;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed_text(&self, _text: &str, _model_hint: ModelHint) -> Result<Vec<f32>, EmbedError> {
            Ok(vec![0.1, 0.2])
        }

        async fn embed_image(&self, _image_bytes: &[u8], _text: &str) -> Result<Vec<f32>, EmbedError> {
            Ok(vec![0.1, 0.2])
        }
    }

    fn test_png() -> Vec<u8> {
        use image::{ImageBuffer, Rgb};
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(4, 4, |_, _| Rgb([10, 20, 30]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    async fn deps_with_one_image(server: &MockServer) -> SyncDeps {
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [{"id": "img1", "name": "a.png", "mimeType": "image/png", "webViewLink": "https://x/a"}]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/img1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(test_png()))
            .mount(server)
            .await;

        let drive = DriveAdapter::with_base_url_for_tests(Box::new(StaticToken("tok".into())), server.uri());
        SyncDeps {
            artifacts: Arc::new(MemoryBlobStore::new()),
            drive: Arc::new(drive),
            embedder: Arc::new(FixedEmbedder),
            checkpoint_interval: 100,
            normalize: NormalizeConfig::default(),
        }
    }

    #[tokio::test]
    async fn fresh_tenant_appends_new_files() {
        let server = MockServer::start().await;
        let deps = deps_with_one_image(&server).await;
        let uuid = TenantId::new(Uuid::new_v4());

        let report = sync(&deps, &uuid, "root", CancellationToken::new()).await.unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.deleted, 0);

        let stored: Option<TenantArtifact> = deps.artifacts.get_json(&SyncDeps::artifact_key(&uuid)).await.unwrap();
        assert_eq!(stored.unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn empty_drive_tree_clears_nonempty_artifact() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
            .mount(&server)
            .await;

        let drive = DriveAdapter::with_base_url_for_tests(Box::new(StaticToken("tok".into())), server.uri());
        let artifacts = Arc::new(MemoryBlobStore::new());
        let uuid = TenantId::new(Uuid::new_v4());
        let mut existing = TenantArtifact::empty();
        existing.entries.push(EmbeddingEntry::valid("old.jpg", "url", "", vec![0.1]));
        artifacts.put_json(&SyncDeps::artifact_key(&uuid), &existing).await.unwrap();

        let deps = SyncDeps {
            artifacts: artifacts.clone(),
            drive: Arc::new(drive),
            embedder: Arc::new(FixedEmbedder),
            checkpoint_interval: 100,
            normalize: NormalizeConfig::default(),
        };

        let report = sync(&deps, &uuid, "root", CancellationToken::new()).await.unwrap();
        assert_eq!(report.deleted, 1);

        let stored: Option<TenantArtifact> = artifacts.get_json(&SyncDeps::artifact_key(&uuid)).await.unwrap();
        assert!(stored.unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_persisted_with_reason() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [{"id": "img1", "name": "bad.png", "mimeType": "image/png", "webViewLink": "https://x/a"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/img1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an image".to_vec()))
            .mount(&server)
            .await;

        let drive = DriveAdapter::with_base_url_for_tests(Box::new(StaticToken("tok".into())), server.uri());
        let deps = SyncDeps {
            artifacts: Arc::new(MemoryBlobStore::new()),
            drive: Arc::new(drive),
            embedder: Arc::new(FixedEmbedder),
            checkpoint_interval: 100,
            normalize: NormalizeConfig::default(),
        };
        let uuid = TenantId::new(Uuid::new_v4());

        let report = sync(&deps, &uuid, "root", CancellationToken::new()).await.unwrap();
        assert_eq!(report.corrupt, 1);
        assert_eq!(report.added, 0);

        let stored: TenantArtifact = deps
            .artifacts
            .get_json(&SyncDeps::artifact_key(&uuid))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.entries[0].corrupt_reason, Some(CorruptReason::CannotIdentify));
    }
}
