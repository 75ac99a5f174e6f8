use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::BlobStoreError;
use crate::store::BlobStore;

/// Filesystem-backed [`BlobStore`]. Each key maps to one file under `root`;
/// writes are whole-file replacements via a temp-file-then-rename so a crash
/// mid-write never leaves a half-written object visible under its real name.
#[derive(Debug, Clone)]
pub struct LocalFsBlobStore {
    root: PathBuf,
}

impl LocalFsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn io_err(key: &str, source: std::io::Error) -> BlobStoreError {
        BlobStoreError::Io {
            key: key.to_string(),
            source,
        }
    }
}

#[async_trait]
impl BlobStore for LocalFsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_err(key, e)),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobStoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_err(key, e))?;
        }
        let tmp_path = tmp_path_for(&path);
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| Self::io_err(key, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Self::io_err(key, e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_err(key, e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobStoreError> {
        Ok(tokio::fs::try_exists(self.path_for(key))
            .await
            .map_err(|e| Self::io_err(key, e))?)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        let mut results = Vec::new();
        walk(&self.root, &self.root, prefix, &mut results)
            .await
            .map_err(|e| Self::io_err(prefix, e))?;
        results.sort();
        Ok(results)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Recursively walk `dir` (relative to `root`), collecting keys whose
/// root-relative path starts with `prefix`.
fn walk<'a>(
    root: &'a Path,
    dir: &'a Path,
    prefix: &'a str,
    out: &'a mut Vec<String>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                walk(root, &path, prefix, out).await?;
            } else {
                if let Ok(rel) = path.strip_prefix(root) {
                    let key = rel.to_string_lossy().replace('\\', "/");
                    if key.starts_with(prefix) && !key.ends_with(".tmp") {
                        out.push(key);
                    }
                }
            }
        }
        Ok(())
    })
}
