use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::TokenProvider;
use crate::error::DriveError;
use crate::folder_url::parse_folder_id;
use crate::types::{ChangeEntry, ChangeFeedPage, ChangedFile, FileMeta, WatchHandle, IMAGE_MIME_TYPES};

#[derive(Clone)]
struct BaseUrls {
    drive: String,
}

impl Default for BaseUrls {
    fn default() -> Self {
        Self {
            drive: "https://www.googleapis.com".into(),
        }
    }
}

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Thin client over the Drive v3 REST API. Every call supports shared
/// drives (`supportsAllDrives`, `includeItemsFromAllDrives`).
pub struct DriveAdapter {
    client: reqwest::Client,
    token: Box<dyn TokenProvider>,
    base: BaseUrls,
}

impl DriveAdapter {
    pub fn new(token: Box<dyn TokenProvider>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client"),
            token,
            base: BaseUrls::default(),
        }
    }

    #[doc(hidden)]
    pub fn with_base_url_for_tests(token: Box<dyn TokenProvider>, drive_base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base: BaseUrls {
                drive: drive_base_url.into(),
            },
        }
    }

    async fn bearer(&self) -> Result<String, DriveError> {
        self.token.token().await
    }

    async fn list_children(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<(Vec<Value>, Option<String>), DriveError> {
        let token = self.bearer().await?;
        let query = format!("'{folder_id}' in parents and trashed = false");
        let url = format!("{}/drive/v3/files", self.base.drive);
        let mut req = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                (
                    "fields",
                    "nextPageToken, files(id, name, mimeType, webViewLink, modifiedTime, size, md5Checksum)",
                ),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
                ("pageSize", "1000"),
            ]);
        if let Some(pt) = page_token {
            req = req.query(&[("pageToken", pt)]);
        }
        let resp = req.send().await.map_err(|source| DriveError::Request {
            url: url.clone(),
            source,
        })?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveError::ApiStatus { url, status, body });
        }
        let parsed: Value = resp.json().await.map_err(|source| DriveError::Request { url, source })?;
        let files = parsed
            .get("files")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let next = parsed
            .get("nextPageToken")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok((files, next))
    }

    /// Resolve a folder id from any accepted URL shape, then breadth-first
    /// enumerate every subfolder, returning the image leaves found.
    /// Per-folder listing failures are logged and enumeration continues.
    pub async fn list_folder_tree(&self, folder_url: &str) -> Result<Vec<FileMeta>, DriveError> {
        let root_id = parse_folder_id(folder_url)?;

        let mut queue: VecDeque<(String, String)> = VecDeque::new();
        queue.push_back((root_id, String::new()));
        let mut leaves = Vec::new();

        while let Some((folder_id, folder_path)) = queue.pop_front() {
            let mut page_token: Option<String> = None;
            loop {
                let (files, next) = match self.list_children(&folder_id, page_token.as_deref()).await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(folder_id = %folder_id, error = %e, "folder listing failed, continuing");
                        break;
                    }
                };

                for file in &files {
                    let mime = file.get("mimeType").and_then(Value::as_str).unwrap_or("");
                    let name = file.get("name").and_then(Value::as_str).unwrap_or("").to_string();
                    let id = file.get("id").and_then(Value::as_str).unwrap_or("").to_string();

                    if mime == FOLDER_MIME {
                        let child_path = if folder_path.is_empty() {
                            name.clone()
                        } else {
                            format!("{folder_path}/{name}")
                        };
                        queue.push_back((id, child_path));
                    } else if IMAGE_MIME_TYPES.contains(&mime) {
                        let web_view_link = file
                            .get("webViewLink")
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string();
                        let modified_time = file
                            .get("modifiedTime")
                            .and_then(Value::as_str)
                            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                            .map(|dt| dt.with_timezone(&Utc));
                        let size = file
                            .get("size")
                            .and_then(Value::as_str)
                            .and_then(|s| s.parse().ok());
                        let checksum = file
                            .get("md5Checksum")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        leaves.push(FileMeta {
                            id,
                            name,
                            folder_path: folder_path.clone(),
                            web_view_link,
                            mime_type: mime.to_string(),
                            modified_time,
                            size,
                            checksum,
                        });
                    }
                }

                match next {
                    Some(t) => page_token = Some(t),
                    None => break,
                }
            }
        }

        Ok(leaves)
    }

    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let token = self.bearer().await?;
        let url = format!("{}/drive/v3/files/{}", self.base.drive, file_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|source| DriveError::Request { url: url.clone(), source })?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveError::ApiStatus { url, status, body });
        }
        let bytes = resp.bytes().await.map_err(|source| DriveError::Request { url, source })?;
        Ok(bytes.to_vec())
    }

    pub async fn get_start_page_token(&self, drive_id: Option<&str>) -> Result<String, DriveError> {
        let token = self.bearer().await?;
        let url = format!("{}/drive/v3/changes/startPageToken", self.base.drive);
        let mut req = self.client.get(&url).bearer_auth(token).query(&[("supportsAllDrives", "true")]);
        if let Some(id) = drive_id {
            req = req.query(&[("driveId", id)]);
        }
        let resp = req.send().await.map_err(|source| DriveError::Request { url: url.clone(), source })?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveError::ApiStatus { url, status, body });
        }
        let parsed: Value = resp.json().await.map_err(|source| DriveError::Request { url, source })?;
        parsed
            .get("startPageToken")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DriveError::MalformedResponse {
                context: "changes.getStartPageToken".into(),
                message: "missing startPageToken".into(),
            })
    }

    /// Page through the change feed to exhaustion starting at `page_token`.
    pub async fn list_changes(
        &self,
        page_token: &str,
        drive_id: Option<&str>,
    ) -> Result<ChangeFeedPage, DriveError> {
        let mut changes = Vec::new();
        let mut next_page_token: Option<String> = None;
        let mut new_start_page_token: Option<String> = None;
        let mut cursor = page_token.to_string();

        loop {
            let token = self.bearer().await?;
            let url = format!("{}/drive/v3/changes", self.base.drive);
            let mut req = self
                .client
                .get(&url)
                .bearer_auth(token)
                .query(&[
                    ("pageToken", cursor.as_str()),
                    ("fields", "nextPageToken, newStartPageToken, changes(fileId, removed, file(id, name, parents, mimeType, trashed))"),
                    ("supportsAllDrives", "true"),
                    ("includeItemsFromAllDrives", "true"),
                ]);
            if let Some(id) = drive_id {
                req = req.query(&[("driveId", id)]);
            }
            let resp = req.send().await.map_err(|source| DriveError::Request { url: url.clone(), source })?;

            if resp.status() == reqwest::StatusCode::GONE {
                return Err(DriveError::PageTokenExpired);
            }
            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                return Err(DriveError::ApiStatus { url, status, body });
            }

            let parsed: Value = resp.json().await.map_err(|source| DriveError::Request { url, source })?;
            for c in parsed.get("changes").and_then(Value::as_array).into_iter().flatten() {
                let file_id = c.get("fileId").and_then(Value::as_str).unwrap_or("").to_string();
                let removed = c.get("removed").and_then(Value::as_bool).unwrap_or(false);
                let file = c.get("file").map(|f| ChangedFile {
                    id: f.get("id").and_then(Value::as_str).unwrap_or("").to_string(),
                    name: f.get("name").and_then(Value::as_str).unwrap_or("").to_string(),
                    parents: f
                        .get("parents")
                        .and_then(Value::as_array)
                        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
                        .unwrap_or_default(),
                    mime_type: f.get("mimeType").and_then(Value::as_str).unwrap_or("").to_string(),
                    trashed: f.get("trashed").and_then(Value::as_bool).unwrap_or(false),
                });
                changes.push(ChangeEntry { file_id, removed, file });
            }

            let page_next = parsed.get("nextPageToken").and_then(Value::as_str).map(str::to_string);
            let start_next = parsed.get("newStartPageToken").and_then(Value::as_str).map(str::to_string);

            match page_next {
                Some(t) => {
                    cursor = t.clone();
                    next_page_token = Some(t);
                }
                None => {
                    new_start_page_token = start_next;
                    next_page_token = None;
                    break;
                }
            }
        }

        debug!(count = changes.len(), "advanced drive change feed");
        Ok(ChangeFeedPage {
            changes,
            next_page_token,
            new_start_page_token,
        })
    }

    pub async fn watch_create(
        &self,
        page_token: &str,
        drive_id: Option<&str>,
        callback_url: &str,
        channel_id: Uuid,
        ttl_seconds: u64,
    ) -> Result<WatchHandle, DriveError> {
        let token = self.bearer().await?;
        let url = format!("{}/drive/v3/changes/watch", self.base.drive);
        let mut req = self
            .client
            .post(&url)
            .bearer_auth(token)
            .query(&[("pageToken", page_token), ("supportsAllDrives", "true")])
            .json(&serde_json::json!({
                "id": channel_id.to_string(),
                "type": "web_hook",
                "address": callback_url,
                "expiration": (Utc::now() + chrono::Duration::seconds(ttl_seconds as i64))
                    .timestamp_millis()
                    .to_string(),
            }));
        if let Some(id) = drive_id {
            req = req.query(&[("driveId", id)]);
        }
        let resp = req.send().await.map_err(|source| DriveError::Request { url: url.clone(), source })?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveError::ApiStatus { url, status, body });
        }
        let parsed: Value = resp.json().await.map_err(|source| DriveError::Request { url, source })?;
        let resource_id = parsed
            .get("resourceId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let expiration_ms: i64 = parsed
            .get("expiration")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let expiration = DateTime::<Utc>::from_timestamp_millis(expiration_ms).unwrap_or_else(Utc::now);
        Ok(WatchHandle { resource_id, expiration })
    }

    /// Fetch the immediate parent folder ids of one file. Used by callers
    /// doing transitive ancestry checks against a change feed entry.
    pub async fn get_parents(&self, file_id: &str) -> Result<Vec<String>, DriveError> {
        let token = self.bearer().await?;
        let url = format!("{}/drive/v3/files/{}", self.base.drive, file_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("fields", "parents"), ("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|source| DriveError::Request { url: url.clone(), source })?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveError::ApiStatus { url, status, body });
        }
        let parsed: Value = resp.json().await.map_err(|source| DriveError::Request { url, source })?;
        Ok(parsed
            .get("parents")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default())
    }

    /// Resolve the physical shared drive a folder lives in, if any. `None`
    /// means the folder lives in "My Drive".
    pub async fn get_drive_id(&self, folder_id: &str) -> Result<Option<String>, DriveError> {
        let token = self.bearer().await?;
        let url = format!("{}/drive/v3/files/{}", self.base.drive, folder_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("fields", "driveId"), ("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|source| DriveError::Request { url: url.clone(), source })?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveError::ApiStatus { url, status, body });
        }
        let parsed: Value = resp.json().await.map_err(|source| DriveError::Request { url, source })?;
        Ok(parsed.get("driveId").and_then(Value::as_str).map(str::to_string))
    }

    /// Stop a push channel. 404/410 are treated as success since the
    /// channel is already gone from Drive's perspective.
    pub async fn watch_stop(&self, channel_id: Uuid, resource_id: &str) -> Result<(), DriveError> {
        let token = self.bearer().await?;
        let url = format!("{}/drive/v3/channels/stop", self.base.drive);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "id": channel_id.to_string(),
                "resourceId": resource_id,
            }))
            .send()
            .await
            .map_err(|source| DriveError::Request { url: url.clone(), source })?;

        if resp.status().is_success()
            || resp.status() == reqwest::StatusCode::NOT_FOUND
            || resp.status() == reqwest::StatusCode::GONE
        {
            return Ok(());
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(DriveError::ApiStatus { url, status, body })
    }
}
