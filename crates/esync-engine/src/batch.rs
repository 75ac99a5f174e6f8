use chrono::Utc;
use esync_domain::{BatchUpdateResult, TenantId, TenantOutcome};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::deps::SyncDeps;
use crate::sync::sync;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTask {
    pub uuid: TenantId,
    pub drive_url: String,
}

/// Run every task sequentially; a per-tenant failure does not abort the
/// batch. Entered by the CLI when `BATCH_MODE=true` and `BATCH_TASKS` are
/// set in the process environment. `cancel` is shared across every task so
/// a single SIGTERM/SIGINT reaches whichever tenant is currently running
/// and stops the batch from starting any further tenant.
pub async fn sync_batch(deps: &SyncDeps, tasks: Vec<BatchTask>, cancel: CancellationToken) -> BatchUpdateResult {
    let started_at = Utc::now();
    let mut outcomes = Vec::with_capacity(tasks.len());

    for task in tasks {
        if cancel.is_cancelled() {
            warn!(uuid = %task.uuid, "batch: cancellation requested, skipping remaining tenants");
            break;
        }
        info!(uuid = %task.uuid, "batch: starting tenant sync");
        match sync(deps, &task.uuid, &task.drive_url, cancel.clone()).await {
            Ok(report) => {
                outcomes.push(TenantOutcome {
                    uuid: task.uuid,
                    succeeded: true,
                    added: report.added,
                    deleted: report.deleted,
                    corrupt: report.corrupt,
                    error: None,
                });
            }
            Err(e) => {
                warn!(uuid = %task.uuid, error = %e, "batch: tenant sync failed, continuing");
                outcomes.push(TenantOutcome {
                    uuid: task.uuid,
                    succeeded: false,
                    added: 0,
                    deleted: 0,
                    corrupt: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    BatchUpdateResult {
        started_at,
        finished_at: Utc::now(),
        outcomes,
    }
}
