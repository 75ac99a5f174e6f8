use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterStatus {
    /// Initial Drive handshake notification; no changes to process.
    Sync,
    /// `changed_types` was present and did not include `content`.
    FilteredChangedType,
    /// No tenant is subscribed under this physical drive.
    NoCompanies,
    /// Change feed advanced and tenants evaluated (possibly zero jobs).
    Processed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterOutcome {
    pub handled: bool,
    pub status: Option<RouterStatus>,
    pub changes_found: usize,
    pub jobs_triggered: usize,
}

impl RouterOutcome {
    pub fn unknown_channel() -> Self {
        Self {
            handled: false,
            status: None,
            changes_found: 0,
            jobs_triggered: 0,
        }
    }

    pub fn status_only(status: RouterStatus) -> Self {
        Self {
            handled: true,
            status: Some(status),
            changes_found: 0,
            jobs_triggered: 0,
        }
    }
}
