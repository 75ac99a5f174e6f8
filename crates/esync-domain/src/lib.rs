pub mod error;
pub mod types;

pub use error::DomainError;
pub use types::{
    BatchUpdateResult, CompanyState, CorruptReason, DriveChannelState, EmbeddingEntry, EntryKey,
    Manifest, ManifestEntry, TenantArtifact, TenantId, TenantOutcome, TenantRegistryEntry,
    canonical_hash,
};
