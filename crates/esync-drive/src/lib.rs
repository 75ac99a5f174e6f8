pub mod adapter;
pub mod auth;
pub mod error;
pub mod folder_url;
pub mod types;

pub use adapter::DriveAdapter;
pub use auth::{AdcTokenProvider, StaticToken, TokenProvider};
pub use error::DriveError;
pub use folder_url::parse_folder_id;
pub use types::{ChangeEntry, ChangeFeedPage, ChangedFile, FileMeta, WatchHandle, IMAGE_MIME_TYPES};
