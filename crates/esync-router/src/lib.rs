pub mod cache;
pub mod error;
pub mod router;
pub mod types;

pub use cache::ParentCache;
pub use error::RouterError;
pub use router::Router;
pub use types::{RouterOutcome, RouterStatus};
