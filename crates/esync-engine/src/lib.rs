pub mod batch;
pub mod deps;
pub mod error;
pub mod outcome;
pub mod sync;

pub use batch::{sync_batch, BatchTask};
pub use deps::SyncDeps;
pub use error::EngineError;
pub use outcome::FileOutcome;
pub use sync::SyncReport;
pub use sync::sync as run_sync;
