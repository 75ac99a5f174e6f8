pub mod error;
pub mod hit;
pub mod index;

pub use error::SearchError;
pub use hit::SearchHit;
pub use index::SearchIndex;
