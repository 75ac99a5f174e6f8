use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::DomainError;

// ── Identifiers ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn new(id: Uuid) -> Self {
        TenantId(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TenantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TenantId(Uuid::parse_str(s)?))
    }
}

// ── Corrupt reason ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptReason {
    DecompressionBomb,
    CannotIdentify,
    OpenError,
    TooLarge,
    ResizeFailure,
}

impl std::fmt::Display for CorruptReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CorruptReason::DecompressionBomb => "decompression_bomb",
            CorruptReason::CannotIdentify => "cannot_identify",
            CorruptReason::OpenError => "open_error",
            CorruptReason::TooLarge => "too_large",
            CorruptReason::ResizeFailure => "resize_failure",
        };
        write!(f, "{}", s)
    }
}

// ── EmbeddingEntry ────────────────────────────────────────────────────────────

/// The composite identity of an entry within one tenant artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub folder_path: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingEntry {
    pub filename: String,
    pub filepath: String,
    pub folder_path: String,
    /// Absent when `is_corrupt` is true.
    pub embedding: Option<Vec<f32>>,
    pub is_corrupt: bool,
    pub corrupt_reason: Option<CorruptReason>,
}

impl EmbeddingEntry {
    pub fn valid(
        filename: impl Into<String>,
        filepath: impl Into<String>,
        folder_path: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            filename: filename.into(),
            filepath: filepath.into(),
            folder_path: folder_path.into(),
            embedding: Some(embedding),
            is_corrupt: false,
            corrupt_reason: None,
        }
    }

    pub fn corrupt(
        filename: impl Into<String>,
        filepath: impl Into<String>,
        folder_path: impl Into<String>,
        reason: CorruptReason,
    ) -> Self {
        Self {
            filename: filename.into(),
            filepath: filepath.into(),
            folder_path: folder_path.into(),
            embedding: None,
            is_corrupt: true,
            corrupt_reason: Some(reason),
        }
    }

    pub fn key(&self) -> EntryKey {
        EntryKey {
            folder_path: self.folder_path.clone(),
            filename: self.filename.clone(),
        }
    }
}

// ── Tenant Artifact ───────────────────────────────────────────────────────────

/// The single JSON array persisted per tenant holding all its embeddings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantArtifact {
    pub entries: Vec<EmbeddingEntry>,
}

impl TenantArtifact {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> HashSet<EntryKey> {
        self.entries.iter().map(|e| e.key()).collect()
    }

    /// Validate the invariant: composite keys are unique and non-corrupt
    /// entries all share one embedding dimension.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        let mut dim: Option<usize> = None;
        for e in &self.entries {
            let key = e.key();
            if !seen.insert(key.clone()) {
                return Err(DomainError::DuplicateKey {
                    folder_path: key.folder_path,
                    filename: key.filename,
                });
            }
            if !e.is_corrupt {
                let len = e
                    .embedding
                    .as_ref()
                    .map(|v| v.len())
                    .unwrap_or(0);
                match dim {
                    None => dim = Some(len),
                    Some(d) if d != len => {
                        return Err(DomainError::DimensionMismatch {
                            expected: d,
                            actual: len,
                        })
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn find(&self, key: &EntryKey) -> Option<&EmbeddingEntry> {
        self.entries
            .iter()
            .find(|e| &e.key() == key)
    }

    pub fn retain_keys(&mut self, keep: &HashSet<EntryKey>) {
        self.entries.retain(|e| keep.contains(&e.key()));
    }
}

// ── Manifest ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub modified_time: Option<DateTime<Utc>>,
    pub size: Option<u64>,
    /// Not all Drive file types carry an md5Checksum; see DESIGN.md.
    pub checksum: Option<String>,
    pub name: String,
    pub folder_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub files: HashMap<String, ManifestEntry>,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub files_count: usize,
}

impl Manifest {
    pub fn empty() -> Self {
        Self::default()
    }
}

// ── CompanyState ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyState {
    pub uuid: TenantId,
    pub drive_url: String,
    pub folder_id: String,
    /// Physical drive container; `None` for "My Drive".
    pub drive_id: Option<String>,
    pub use_embed_v4: bool,
    pub last_job_trigger_ts: Option<DateTime<Utc>>,
}

// ── DriveChannelState ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveChannelState {
    /// `None` represents "My Drive" (no shared-drive container).
    pub drive_id: Option<String>,
    pub channel_id: Uuid,
    pub resource_id: String,
    pub expiration: DateTime<Utc>,
    /// Opaque change-feed cursor. Never parsed, only compared for equality.
    pub page_token: String,
}

impl DriveChannelState {
    /// Namespace key suffix used by the Watch State Store: `"root"` for My Drive.
    pub fn drive_key(&self) -> &str {
        self.drive_id.as_deref().unwrap_or("root")
    }
}

// ── BatchUpdateResult ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantOutcome {
    pub uuid: TenantId,
    pub succeeded: bool,
    pub added: usize,
    pub deleted: usize,
    pub corrupt: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUpdateResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<TenantOutcome>,
}

impl BatchUpdateResult {
    pub fn total_succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn total_failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded).count()
    }
}

// ── Tenant registry (external collaborator trait, §1/§3) ─────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRegistryEntry {
    pub uuid: TenantId,
    pub drive_url: String,
    pub company_name: Option<String>,
    pub use_embed_v4: bool,
    pub auto_update: bool,
}

// ── Hashing helper ────────────────────────────────────────────────────────────

/// Serialize `value` to canonical JSON (object keys sorted) and return its
/// SHA-256 hex digest. Used by the Scheduler/Sync Engine to cheaply detect
/// whether Drive metadata changed without diffing full structs.
pub fn canonical_hash<T: Serialize>(value: &T) -> String {
    let v = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
    let canonical = sort_json_keys(v);
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    format!("{:x}", digest)
}

fn sort_json_keys(v: serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::Object(map) => {
            let sorted: std::collections::BTreeMap<String, serde_json::Value> = map
                .into_iter()
                .map(|(k, v)| (k, sort_json_keys(v)))
                .collect();
            serde_json::Value::Object(sorted.into_iter().collect())
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(sort_json_keys).collect())
        }
        other => other,
    }
}
