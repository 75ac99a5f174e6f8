use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const IMAGE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/svg+xml",
];

/// One image file discovered by [`list_folder_tree`](crate::adapter::DriveAdapter::list_folder_tree).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub id: String,
    pub name: String,
    /// Root-relative, slash-joined ancestor folder names. Empty at root.
    pub folder_path: String,
    pub web_view_link: String,
    pub mime_type: String,
    pub modified_time: Option<DateTime<Utc>>,
    pub size: Option<u64>,
    /// Drive's `md5Checksum`; absent for some file types (Google Docs
    /// formats, some shared-drive configurations).
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub id: String,
    pub name: String,
    pub parents: Vec<String>,
    pub mime_type: String,
    pub trashed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub file_id: String,
    pub removed: bool,
    pub file: Option<ChangedFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeFeedPage {
    pub changes: Vec<ChangeEntry>,
    pub next_page_token: Option<String>,
    pub new_start_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchHandle {
    pub resource_id: String,
    pub expiration: DateTime<Utc>,
}
