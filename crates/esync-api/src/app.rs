use std::sync::Arc;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use esync_blobstore::{BlobStore, WatchStateStore};
use esync_config::AppConfig;
use esync_dispatcher::Dispatcher;
use esync_drive::DriveAdapter;
use esync_embed::{EmbeddingProvider, Translator};
use esync_router::Router as NotificationRouter;
use esync_scheduler::Scheduler;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer_token;
use crate::handlers;
use crate::state::AppState;

#[allow(clippy::too_many_arguments)]
pub fn build_app(
    artifacts: Arc<dyn BlobStore>,
    watch_state: Arc<WatchStateStore>,
    drive: Arc<DriveAdapter>,
    embedder: Arc<dyn EmbeddingProvider>,
    translator: Arc<dyn Translator>,
    dispatcher: Arc<Dispatcher>,
    router: Arc<NotificationRouter>,
    scheduler: Arc<Scheduler>,
    config: Arc<AppConfig>,
) -> Router {
    let auth_token = config.api_auth_token.clone().map(Arc::new);
    let state = AppState {
        artifacts,
        watch_state,
        drive,
        embedder,
        translator,
        dispatcher,
        router,
        scheduler,
        config,
        auth_token,
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/vectorize", post(handlers::post_vectorize))
        .route("/vectorize-batch", post(handlers::post_vectorize_batch))
        .route("/search", get(handlers::get_search).post(handlers::post_search))
        .route("/drive/watch", post(handlers::post_drive_watch))
        .route("/drive/watch/re-register", post(handlers::post_drive_watch_reregister))
        .route("/drive/watch/:uuid", delete(handlers::delete_drive_watch))
        .route("/drive/notifications", post(handlers::post_drive_notifications))
        .route("/auto-update", post(handlers::post_auto_update))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use esync_blobstore::{ManifestStore, MemoryBlobStore};
    use esync_config::EmbeddingProviderKind;
    use esync_domain::TenantId;
    use esync_drive::StaticToken;
    use std::path::PathBuf;
    use tower::util::ServiceExt;
    use uuid::Uuid as UuidLib;

    struct FixedEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed_text(&self, _text: &str, _model_hint: esync_embed::ModelHint) -> Result<Vec<f32>, esync_embed::EmbedError> {
            Ok(vec![0.1, 0.2])
        }

        async fn embed_image(&self, _image_bytes: &[u8], _text: &str) -> Result<Vec<f32>, esync_embed::EmbedError> {
            Ok(vec![0.1, 0.2])
        }
    }

    struct EmptyRegistry;

    #[async_trait::async_trait]
    impl esync_scheduler::TenantRegistry for EmptyRegistry {
        async fn list_auto_update_tenants(&self) -> Result<Vec<esync_domain::TenantRegistryEntry>, esync_scheduler::SchedulerError> {
            Ok(vec![])
        }
    }

    fn test_config() -> Arc<AppConfig> {
        Arc::new(AppConfig {
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
            api_auth_token: Some("test-token".into()),
            bind_addr: "0.0.0.0:8080".into(),
        })
    }

    fn test_app() -> Router {
        let artifacts: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let config = test_config();
        let watch_state = Arc::new(WatchStateStore::new(artifacts.clone(), config.watch_state_prefix.clone()));
        let drive = Arc::new(DriveAdapter::with_base_url_for_tests(
            Box::new(StaticToken("tok".into())),
            "http://127.0.0.1:0".to_string(),
        ));
        let dispatcher = Arc::new(Dispatcher::with_binary_for_tests(
            (*config).clone(),
            PathBuf::from("/bin/true"),
        ));
        let router = Arc::new(NotificationRouter::new(
            watch_state.clone(),
            drive.clone(),
            dispatcher.clone(),
            config.drive_watch_cooldown_seconds,
        ));
        let manifests = Arc::new(ManifestStore::new(artifacts.clone()));
        let scheduler = Arc::new(Scheduler::new(Arc::new(EmptyRegistry), drive.clone(), manifests, dispatcher.clone(), 3));

        build_app(
            artifacts,
            watch_state,
            drive,
            Arc::new(FixedEmbedder),
            Arc::new(esync_embed::PassthroughTranslator),
            dispatcher,
            router,
            scheduler,
            config,
        )
    }

    fn authed(req: axum::http::request::Builder) -> axum::http::request::Builder {
        req.header("Authorization", "Bearer test-token")
    }

    #[tokio::test]
    async fn unauthenticated_request_returns_401() {
        let app = test_app();
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_returns_200_when_authed() {
        let app = test_app();
        let resp = app
            .oneshot(authed(Request::builder().uri("/health")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_returns_200() {
        let app = test_app();
        let resp = app
            .oneshot(authed(Request::builder().uri("/ready")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn search_missing_artifact_returns_404() {
        let app = test_app();
        let tenant = UuidLib::new_v4();
        let uri = format!("/search?uuid={tenant}&q=cat&trigger=standard");
        let resp = app
            .oneshot(authed(Request::builder().uri(uri)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_missing_q_for_standard_returns_400() {
        let app = test_app();
        let tenant = UuidLib::new_v4();
        let uri = format!("/search?uuid={tenant}&trigger=standard");
        let resp = app
            .oneshot(authed(Request::builder().uri(uri)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn vectorize_dispatches_and_returns_202() {
        let app = test_app();
        let body = serde_json::json!({ "uuid": TenantId::new(UuidLib::new_v4()), "drive_url": "root" });
        let resp = app
            .oneshot(
                authed(
                    Request::builder()
                        .method("POST")
                        .uri("/vectorize")
                        .header("content-type", "application/json"),
                )
                .body(Body::from(body.to_string()))
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn auto_update_returns_200_with_empty_report() {
        let app = test_app();
        let resp = app
            .oneshot(
                authed(Request::builder().method("POST").uri("/auto-update"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
