use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a fire-and-forget worker launch. The dispatcher
/// does not await the child, so this carries no exit status; it exists so
/// callers have something to log and correlate against the worker's own
/// tracing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionHandle(pub Uuid);

impl ExecutionHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecutionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
