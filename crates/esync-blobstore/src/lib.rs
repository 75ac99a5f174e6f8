pub mod error;
pub mod gcs;
pub mod local_fs;
pub mod manifest_store;
pub mod memory;
pub mod run_log;
pub mod store;
pub mod watch_state;

pub use error::BlobStoreError;
pub use gcs::GcsBlobStore;
pub use local_fs::LocalFsBlobStore;
pub use manifest_store::ManifestStore;
pub use memory::MemoryBlobStore;
pub use run_log::RunLogWriter;
pub use store::{BlobStore, BlobStoreJsonExt};
pub use watch_state::{mark_triggered, WatchStateStore};
