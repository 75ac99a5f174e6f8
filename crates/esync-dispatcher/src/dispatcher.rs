use std::path::PathBuf;
use std::process::Stdio;

use esync_config::AppConfig;
use esync_domain::TenantId;
use esync_engine::BatchTask;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config_env::config_envs;
use crate::error::DispatchError;
use crate::handle::ExecutionHandle;

pub const ENV_UUID: &str = "UUID";
pub const ENV_DRIVE_URL: &str = "DRIVE_URL";
pub const ENV_USE_EMBED_V4: &str = "USE_EMBED_V4";
pub const ENV_BATCH_MODE: &str = "BATCH_MODE";
pub const ENV_BATCH_TASKS: &str = "BATCH_TASKS";

/// Launches Sync Engine worker processes by re-exec'ing the current binary
/// with the worker contract's env vars injected, then walking away. Retry
/// of a failed execution is the caller's problem, not the dispatcher's.
pub struct Dispatcher {
    config: AppConfig,
    binary_override: Option<PathBuf>,
}

impl Dispatcher {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            binary_override: None,
        }
    }

    /// Target a specific executable instead of `current_exe()`, so tests
    /// can spawn a harmless real process instead of re-exec'ing the test
    /// binary itself.
    pub fn with_binary_for_tests(config: AppConfig, binary: PathBuf) -> Self {
        Self {
            config,
            binary_override: Some(binary),
        }
    }

    /// Launch a single-tenant worker. Returns as soon as the child process
    /// has been spawned; does not wait for it to finish.
    pub fn dispatch_single(
        &self,
        uuid: &TenantId,
        drive_url: &str,
        use_embed_v4: bool,
    ) -> Result<ExecutionHandle, DispatchError> {
        let mut cmd = self.worker_command()?;
        cmd.env(ENV_UUID, uuid.to_string());
        cmd.env(ENV_DRIVE_URL, drive_url);
        cmd.env(ENV_USE_EMBED_V4, use_embed_v4.to_string());
        spawn_detached(cmd, "single")
    }

    /// Launch a batch worker covering every task in one process.
    pub fn dispatch_batch(&self, tasks: &[BatchTask]) -> Result<ExecutionHandle, DispatchError> {
        let serialized = serde_json::to_string(tasks).unwrap_or_else(|_| "[]".to_string());
        let mut cmd = self.worker_command()?;
        cmd.env(ENV_BATCH_MODE, "true");
        cmd.env(ENV_BATCH_TASKS, serialized);
        spawn_detached(cmd, "batch")
    }

    fn worker_command(&self) -> Result<Command, DispatchError> {
        let exe = match &self.binary_override {
            Some(path) => path.clone(),
            None => std::env::current_exe().map_err(DispatchError::CurrentExe)?,
        };
        let mut cmd = Command::new(exe);
        if self.binary_override.is_none() {
            cmd.arg("sync");
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(false);
        for (key, value) in config_envs(&self.config) {
            cmd.env(key, value);
        }
        Ok(cmd)
    }
}

/// Spawn the command and detach: stdout/stderr are drained into tracing so
/// worker logs are not lost, and a reaper task waits on the child so it
/// never lingers as a zombie, but none of this blocks the caller.
fn spawn_detached(mut cmd: Command, kind: &'static str) -> Result<ExecutionHandle, DispatchError> {
    let mut child = cmd.spawn().map_err(DispatchError::Spawn)?;
    let handle = ExecutionHandle::new();
    let pid = child.id();
    info!(%handle, kind, pid, "dispatched worker process");

    if let Some(stdout) = child.stdout.take() {
        let handle_copy = handle;
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(%handle_copy, "worker stdout: {line}");
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let handle_copy = handle;
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(%handle_copy, "worker stderr: {line}");
            }
        });
    }

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if status.success() => {
                info!(%handle, "worker process exited successfully");
            }
            Ok(status) => {
                warn!(%handle, ?status, "worker process exited with failure");
            }
            Err(e) => {
                warn!(%handle, error = %e, "failed to wait on worker process");
            }
        }
    });

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use esync_config::EmbeddingProviderKind;

    fn test_config() -> AppConfig {
        AppConfig {
            embedding_provider: EmbeddingProviderKind::VertexAi,
            embedding_provider_api_key: "key".into(),
            drive_watch_ttl_seconds: 86400,
            drive_watch_cooldown_seconds: 60,
            checkpoint_interval: 100,
            max_pixels: 2_300_000,
            max_file_size_mb: 5,
            max_workers: 3,
            artifact_bucket: "artifacts".into(),
            manifest_bucket: "manifests".into(),
            watch_state_prefix: "watch".into(),
            gcp_project: None,
            gcp_region: None,
            drive_watch_callback_url: None,
            api_auth_token: None,
            bind_addr: "0.0.0.0:8080".into(),
        }
    }

    #[tokio::test]
    async fn dispatch_single_spawns_and_returns_immediately() {
        let dispatcher = Dispatcher::with_binary_for_tests(test_config(), PathBuf::from("/bin/true"));
        let uuid = TenantId::new(uuid::Uuid::new_v4());
        let handle = dispatcher
            .dispatch_single(&uuid, "root", false)
            .expect("spawning /bin/true should succeed");
        let _ = handle;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn dispatch_batch_serializes_tasks_into_env() {
        let dispatcher = Dispatcher::with_binary_for_tests(test_config(), PathBuf::from("/bin/true"));
        let tasks = vec![BatchTask {
            uuid: TenantId::new(uuid::Uuid::new_v4()),
            drive_url: "root".into(),
        }];
        let result = dispatcher.dispatch_batch(&tasks);
        assert!(result.is_ok());
    }
}
