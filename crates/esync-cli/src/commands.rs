use std::sync::Arc;

use anyhow::{Context, Result};
use esync_blobstore::{BlobStore, GcsBlobStore, ManifestStore, RunLogWriter, WatchStateStore};
use esync_config::{AppConfig, EmbeddingProviderKind};
use esync_dispatcher::Dispatcher;
use esync_domain::TenantId;
use esync_drive::{AdcTokenProvider, DriveAdapter};
use esync_embed::{CohereProvider, EmbeddingProvider, PassthroughTranslator, VertexAiProvider};
use esync_engine::{sync_batch, BatchTask, SyncDeps};
use esync_image::NormalizeConfig;
use esync_scheduler::{FileTenantRegistry, Scheduler};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

fn build_embedder(config: &AppConfig) -> Arc<dyn EmbeddingProvider> {
    match config.embedding_provider {
        EmbeddingProviderKind::VertexAi => Arc::new(VertexAiProvider::new(config.embedding_provider_api_key.clone())),
        EmbeddingProviderKind::Cohere => Arc::new(CohereProvider::new(config.embedding_provider_api_key.clone())),
    }
}

async fn build_drive() -> Result<Arc<DriveAdapter>> {
    let token = AdcTokenProvider::new().await.context("failed to initialize Drive credentials")?;
    Ok(Arc::new(DriveAdapter::new(Box::new(token))))
}

fn normalize_config(config: &AppConfig) -> NormalizeConfig {
    NormalizeConfig {
        max_pixels: config.max_pixels,
        max_file_size_mb: config.max_file_size_mb,
    }
}

// ── serve ─────────────────────────────────────────────────────────────────────

pub async fn serve(config: AppConfig) -> Result<()> {
    let config = Arc::new(config);
    let artifacts: Arc<dyn BlobStore> = Arc::new(
        GcsBlobStore::from_adc(config.artifact_bucket.clone())
            .await
            .context("failed to initialize artifact blob store")?,
    );
    let manifest_blobs: Arc<dyn BlobStore> = Arc::new(
        GcsBlobStore::from_adc(config.manifest_bucket.clone())
            .await
            .context("failed to initialize manifest blob store")?,
    );
    let watch_state = Arc::new(WatchStateStore::new(artifacts.clone(), config.watch_state_prefix.clone()));
    let drive = build_drive().await?;
    let embedder = build_embedder(&config);
    let translator = Arc::new(PassthroughTranslator);
    let dispatcher = Arc::new(Dispatcher::new((*config).clone()));
    let router = Arc::new(esync_router::Router::new(
        watch_state.clone(),
        drive.clone(),
        dispatcher.clone(),
        config.drive_watch_cooldown_seconds,
    ));
    let manifests = Arc::new(ManifestStore::new(manifest_blobs));
    let registry = Arc::new(FileTenantRegistry::new(std::path::PathBuf::from("tenants.json")));
    let scheduler = Arc::new(Scheduler::new(registry, drive.clone(), manifests, dispatcher.clone(), config.max_workers));

    let app = esync_api::build_app(
        artifacts,
        watch_state,
        drive,
        embedder,
        translator,
        dispatcher,
        router,
        scheduler,
        config.clone(),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "esyncd listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

// ── sync (single-tenant or batch worker) ─────────────────────────────────────

const ENV_BATCH_MODE: &str = esync_dispatcher::ENV_BATCH_MODE;
const ENV_BATCH_TASKS: &str = esync_dispatcher::ENV_BATCH_TASKS;

pub async fn sync(
    config: AppConfig,
    uuid: Option<Uuid>,
    drive_url: Option<String>,
    _use_embed_v4: Option<bool>,
    cancel: CancellationToken,
) -> Result<()> {
    let batch_mode = std::env::var(ENV_BATCH_MODE).map(|v| v == "true").unwrap_or(false);

    let artifacts: Arc<dyn BlobStore> = Arc::new(
        GcsBlobStore::from_adc(config.artifact_bucket.clone())
            .await
            .context("failed to initialize artifact blob store")?,
    );
    let drive = build_drive().await?;
    let embedder = build_embedder(&config);
    let deps = SyncDeps {
        artifacts: artifacts.clone(),
        drive,
        embedder,
        checkpoint_interval: config.checkpoint_interval,
        normalize: normalize_config(&config),
    };

    if batch_mode {
        let raw = std::env::var(ENV_BATCH_TASKS).context("BATCH_MODE is set but BATCH_TASKS is missing")?;
        let tasks: Vec<BatchTask> = serde_json::from_str(&raw).context("BATCH_TASKS is not valid JSON")?;
        info!(task_count = tasks.len(), "starting batch sync run");
        let result = sync_batch(&deps, tasks, cancel.clone()).await;
        info!(
            succeeded = result.total_succeeded(),
            failed = result.total_failed(),
            "batch sync run finished"
        );

        let writer = RunLogWriter::new(artifacts);
        let timestamp = result.finished_at.format("%Y%m%dT%H%M%SZ").to_string();
        if let Err(e) = writer.write(&result, &timestamp).await {
            warn!(error = %e, "failed to write batch run log");
        }

        if result.total_failed() > 0 {
            anyhow::bail!("{} of {} tenant syncs failed", result.total_failed(), result.outcomes.len());
        }
        return Ok(());
    }

    let uuid = uuid.context("--uuid (or UUID env var) is required outside batch mode")?;
    let drive_url = drive_url.context("--drive-url (or DRIVE_URL env var) is required outside batch mode")?;
    let tenant = TenantId::new(uuid);

    let report = esync_engine::run_sync(&deps, &tenant, &drive_url, cancel)
        .await
        .context("sync run failed")?;
    info!(?report, "sync run finished");
    Ok(())
}
