use std::sync::Arc;

use esync_blobstore::{BlobStore, WatchStateStore};
use esync_config::AppConfig;
use esync_dispatcher::Dispatcher;
use esync_drive::DriveAdapter;
use esync_embed::{EmbeddingProvider, Translator};
use esync_router::Router as NotificationRouter;
use esync_scheduler::Scheduler;

#[derive(Clone)]
pub struct AppState {
    pub artifacts: Arc<dyn BlobStore>,
    pub watch_state: Arc<WatchStateStore>,
    pub drive: Arc<DriveAdapter>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub translator: Arc<dyn Translator>,
    pub dispatcher: Arc<Dispatcher>,
    pub router: Arc<NotificationRouter>,
    pub scheduler: Arc<Scheduler>,
    pub config: Arc<AppConfig>,
    pub auth_token: Option<Arc<String>>,
}
