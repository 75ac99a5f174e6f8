use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use esync_blobstore::{mark_triggered, WatchStateStore};
use esync_dispatcher::Dispatcher;
use esync_drive::{DriveAdapter, DriveError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::ParentCache;
use crate::error::RouterError;
use crate::types::{RouterOutcome, RouterStatus};

pub struct Router {
    watch_state: Arc<WatchStateStore>,
    drive: Arc<DriveAdapter>,
    dispatcher: Arc<Dispatcher>,
    cooldown_seconds: i64,
    cache: ParentCache,
}

impl Router {
    pub fn new(
        watch_state: Arc<WatchStateStore>,
        drive: Arc<DriveAdapter>,
        dispatcher: Arc<Dispatcher>,
        cooldown_seconds: u64,
    ) -> Self {
        Self {
            watch_state,
            drive,
            dispatcher,
            cooldown_seconds: cooldown_seconds as i64,
            cache: ParentCache::default(),
        }
    }

    pub async fn handle(
        &self,
        channel_id: Uuid,
        resource_state: &str,
        changed_types: Option<&[String]>,
    ) -> Result<RouterOutcome, RouterError> {
        let Some(channel) = self.watch_state.find_channel_by_id(channel_id).await? else {
            warn!(%channel_id, "notification for unknown channel");
            return Ok(RouterOutcome::unknown_channel());
        };

        if resource_state == "sync" {
            return Ok(RouterOutcome::status_only(RouterStatus::Sync));
        }

        if let Some(types) = changed_types {
            if !types.iter().any(|t| t == "content") {
                return Ok(RouterOutcome::status_only(RouterStatus::FilteredChangedType));
            }
        }

        let companies = self
            .watch_state
            .list_companies_for_drive(channel.drive_id.as_deref())
            .await?;
        if companies.is_empty() {
            return Ok(RouterOutcome::status_only(RouterStatus::NoCompanies));
        }

        let page = match self
            .drive
            .list_changes(&channel.page_token, channel.drive_id.as_deref())
            .await
        {
            Ok(page) => page,
            Err(DriveError::PageTokenExpired) => {
                info!(drive_key = %channel.drive_key(), "page token expired, resetting");
                let fresh = self.drive.get_start_page_token(channel.drive_id.as_deref()).await?;
                let mut reset = channel.clone();
                reset.page_token = fresh;
                self.watch_state.save_channel(&reset).await?;
                return Ok(RouterOutcome {
                    handled: true,
                    status: Some(RouterStatus::Processed),
                    changes_found: 0,
                    jobs_triggered: 0,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let next_token = page
            .new_start_page_token
            .clone()
            .or_else(|| page.next_page_token.clone())
            .unwrap_or_else(|| channel.page_token.clone());
        let mut advanced = channel.clone();
        advanced.page_token = next_token;
        self.watch_state.save_channel(&advanced).await?;

        let now = Utc::now();
        let mut jobs_triggered = 0usize;

        for company in &companies {
            let mut relevant = 0usize;
            for change in &page.changes {
                if change.removed {
                    relevant += 1;
                    continue;
                }
                let Some(file) = &change.file else { continue };
                if self.is_descendant(&file.parents, &company.folder_id).await? {
                    relevant += 1;
                }
            }

            if relevant == 0 {
                continue;
            }

            if let Some(last) = company.last_job_trigger_ts {
                let elapsed = (now - last).num_seconds();
                if elapsed < self.cooldown_seconds {
                    debug!(uuid = %company.uuid, elapsed, "skipping dispatch, still in cooldown");
                    continue;
                }
            }

            self.dispatcher
                .dispatch_single(&company.uuid, &company.drive_url, company.use_embed_v4)?;
            mark_triggered(&self.watch_state, company.clone(), now).await?;
            jobs_triggered += 1;
        }

        Ok(RouterOutcome {
            handled: true,
            status: Some(RouterStatus::Processed),
            changes_found: page.changes.len(),
            jobs_triggered,
        })
    }

    /// BFS upward from `parents` looking for `target_folder_id`, using the
    /// shared parent cache. A visited set guards against cycles.
    async fn is_descendant(
        &self,
        parents: &[String],
        target_folder_id: &str,
    ) -> Result<bool, RouterError> {
        let mut frontier: Vec<String> = parents.to_vec();
        let mut visited: HashSet<String> = HashSet::new();

        while let Some(folder_id) = frontier.pop() {
            if folder_id == target_folder_id {
                return Ok(true);
            }
            if !visited.insert(folder_id.clone()) {
                continue;
            }
            let grandparents = self.cache.parents_of(&self.drive, &folder_id).await?;
            frontier.extend(grandparents);
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esync_blobstore::MemoryBlobStore;
    use esync_config::{AppConfig, EmbeddingProviderKind};
    use esync_domain::{CompanyState, DriveChannelState, TenantId};
    use esync_drive::auth::StaticToken;
    use std::path::PathBuf;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

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

    fn router(server: &MockServer) -> (Router, Arc<WatchStateStore>) {
        let watch_state = Arc::new(WatchStateStore::new(Arc::new(MemoryBlobStore::new()), "watch"));
        let drive = Arc::new(DriveAdapter::with_base_url_for_tests(
            Box::new(StaticToken("tok".into())),
            server.uri(),
        ));
        let dispatcher = Arc::new(Dispatcher::with_binary_for_tests(
            test_config(),
            PathBuf::from("/bin/true"),
        ));
        let router = Router::new(watch_state.clone(), drive, dispatcher, 60);
        (router, watch_state)
    }

    #[tokio::test]
    async fn unknown_channel_is_not_handled() {
        let server = MockServer::start().await;
        let (router, _) = router(&server);
        let outcome = router.handle(Uuid::new_v4(), "update", None).await.unwrap();
        assert!(!outcome.handled);
    }

    #[tokio::test]
    async fn sync_resource_state_is_handshake() {
        let server = MockServer::start().await;
        let (router, watch_state) = router(&server);
        let channel_id = Uuid::new_v4();
        watch_state
            .save_channel(&DriveChannelState {
                drive_id: None,
                channel_id,
                resource_id: "res".into(),
                expiration: Utc::now(),
                page_token: "tok1".into(),
            })
            .await
            .unwrap();

        let outcome = router.handle(channel_id, "sync", None).await.unwrap();
        assert!(outcome.handled);
        assert_eq!(outcome.status, Some(RouterStatus::Sync));
    }

    #[tokio::test]
    async fn filtered_changed_type_is_skipped() {
        let server = MockServer::start().await;
        let (router, watch_state) = router(&server);
        let channel_id = Uuid::new_v4();
        watch_state
            .save_channel(&DriveChannelState {
                drive_id: None,
                channel_id,
                resource_id: "res".into(),
                expiration: Utc::now(),
                page_token: "tok1".into(),
            })
            .await
            .unwrap();

        let changed = vec!["properties".to_string()];
        let outcome = router
            .handle(channel_id, "update", Some(&changed))
            .await
            .unwrap();
        assert_eq!(outcome.status, Some(RouterStatus::FilteredChangedType));
    }

    #[tokio::test]
    async fn relevant_change_dispatches_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/changes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "changes": [
                    {"fileId": "f1", "removed": false, "file": {"id": "f1", "name": "a.jpg", "parents": ["folder-a"], "mimeType": "image/jpeg", "trashed": false}}
                ],
                "newStartPageToken": "tok2"
            })))
            .mount(&server)
            .await;

        let (router, watch_state) = router(&server);
        let channel_id = Uuid::new_v4();
        watch_state
            .save_channel(&DriveChannelState {
                drive_id: None,
                channel_id,
                resource_id: "res".into(),
                expiration: Utc::now(),
                page_token: "tok1".into(),
            })
            .await
            .unwrap();
        let uuid = TenantId::new(Uuid::new_v4());
        watch_state
            .save_company(&CompanyState {
                uuid,
                drive_url: "https://drive.google.com/drive/folders/folder-a".into(),
                folder_id: "folder-a".into(),
                drive_id: None,
                use_embed_v4: false,
                last_job_trigger_ts: None,
            })
            .await
            .unwrap();

        let outcome = router.handle(channel_id, "update", None).await.unwrap();
        assert_eq!(outcome.status, Some(RouterStatus::Processed));
        assert_eq!(outcome.changes_found, 1);
        assert_eq!(outcome.jobs_triggered, 1);

        let updated_channel = watch_state.load_channel(None).await.unwrap().unwrap();
        assert_eq!(updated_channel.page_token, "tok2");
    }

    #[tokio::test]
    async fn cooldown_prevents_repeat_dispatch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/changes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "changes": [
                    {"fileId": "f1", "removed": false, "file": {"id": "f1", "name": "a.jpg", "parents": ["folder-a"], "mimeType": "image/jpeg", "trashed": false}}
                ],
                "newStartPageToken": "tok2"
            })))
            .mount(&server)
            .await;

        let (router, watch_state) = router(&server);
        let channel_id = Uuid::new_v4();
        watch_state
            .save_channel(&DriveChannelState {
                drive_id: None,
                channel_id,
                resource_id: "res".into(),
                expiration: Utc::now(),
                page_token: "tok1".into(),
            })
            .await
            .unwrap();
        let uuid = TenantId::new(Uuid::new_v4());
        watch_state
            .save_company(&CompanyState {
                uuid,
                drive_url: "https://drive.google.com/drive/folders/folder-a".into(),
                folder_id: "folder-a".into(),
                drive_id: None,
                use_embed_v4: false,
                last_job_trigger_ts: Some(Utc::now()),
            })
            .await
            .unwrap();

        let outcome = router.handle(channel_id, "update", None).await.unwrap();
        assert_eq!(outcome.jobs_triggered, 0);
    }
}
