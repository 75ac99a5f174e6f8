use async_trait::async_trait;
use esync_domain::TenantRegistryEntry;

use crate::error::SchedulerError;

/// Source of truth for which tenants want periodic auto-update. The
/// original source's spreadsheet-backed registry is intentionally not
/// reimplemented; this trait is the seam a spreadsheet client would plug
/// into, with [`FileTenantRegistry`] standing in for tests and local runs.
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    async fn list_auto_update_tenants(&self) -> Result<Vec<TenantRegistryEntry>, SchedulerError>;
}

/// Reads a JSON array of [`TenantRegistryEntry`] from a local file,
/// returning only the entries with `auto_update = true`.
pub struct FileTenantRegistry {
    path: std::path::PathBuf,
}

impl FileTenantRegistry {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TenantRegistry for FileTenantRegistry {
    async fn list_auto_update_tenants(&self) -> Result<Vec<TenantRegistryEntry>, SchedulerError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SchedulerError::Registry(e.to_string()))?;
        let entries: Vec<TenantRegistryEntry> =
            serde_json::from_str(&raw).map_err(|e| SchedulerError::Registry(e.to_string()))?;
        Ok(entries.into_iter().filter(|e| e.auto_update).collect())
    }
}
