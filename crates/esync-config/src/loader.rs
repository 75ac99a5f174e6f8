use std::env;

use crate::error::ConfigError;
use crate::provider::EmbeddingProviderKind;

/// Flat env-driven configuration shared by every `esyncd` run mode (server,
/// single-sync worker, batch worker). Loaded once in `main` and passed down
/// by reference; nothing in the core crates reads the environment directly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub embedding_provider: EmbeddingProviderKind,
    pub embedding_provider_api_key: String,
    pub drive_watch_ttl_seconds: u64,
    pub drive_watch_cooldown_seconds: u64,
    pub checkpoint_interval: usize,
    pub max_pixels: u64,
    pub max_file_size_mb: u64,
    pub max_workers: usize,
    pub artifact_bucket: String,
    pub manifest_bucket: String,
    pub watch_state_prefix: String,
    pub gcp_project: Option<String>,
    pub gcp_region: Option<String>,
    pub drive_watch_callback_url: Option<String>,
    pub api_auth_token: Option<String>,
    pub bind_addr: String,
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn parse_with_default<T: std::str::FromStr>(
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            var: name.to_string(),
            message: format!("could not parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Load and validate configuration from the process environment.
    ///
    /// Missing required values are a `fatal_config` condition per the error
    /// taxonomy: the caller is expected to log and exit non-zero, never to
    /// fall back to a guessed default for values that gate correctness
    /// (bucket names, provider selection, credentials).
    pub fn from_env() -> Result<Self, ConfigError> {
        let embedding_provider: EmbeddingProviderKind = required("EMBEDDING_PROVIDER")?.parse()?;

        Ok(AppConfig {
            embedding_provider,
            embedding_provider_api_key: required("EMBEDDING_PROVIDER_API_KEY")?,
            drive_watch_ttl_seconds: parse_with_default("DRIVE_WATCH_TTL_SECONDS", 86_400)?,
            drive_watch_cooldown_seconds: parse_with_default("DRIVE_WATCH_COOLDOWN_SECONDS", 60)?,
            checkpoint_interval: parse_with_default("CHECKPOINT_INTERVAL", 100)?,
            max_pixels: parse_with_default("MAX_PIXELS", 2_300_000)?,
            max_file_size_mb: parse_with_default("MAX_FILE_SIZE_MB", 5)?,
            max_workers: parse_with_default("MAX_WORKERS", 3)?,
            artifact_bucket: required("ARTIFACT_BUCKET")?,
            manifest_bucket: required("MANIFEST_BUCKET")?,
            watch_state_prefix: parse_with_default(
                "WATCH_STATE_PREFIX",
                "watch".to_string(),
            )?,
            gcp_project: optional("GCP_PROJECT"),
            gcp_region: optional("GCP_REGION"),
            drive_watch_callback_url: optional("DRIVE_WATCH_CALLBACK_URL"),
            api_auth_token: optional("API_AUTH_TOKEN"),
            bind_addr: parse_with_default("BIND_ADDR", "0.0.0.0:8080".to_string())?,
        })
    }
}

/// Log the configuration error and terminate the process. Called from each
/// binary's `main` immediately after `AppConfig::from_env()` fails — never
/// from library code.
pub fn fatal_config(err: ConfigError) -> ! {
    tracing::error!(error = %err, "fatal configuration error, exiting");
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable tests must not run concurrently with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for var in [
            "EMBEDDING_PROVIDER",
            "EMBEDDING_PROVIDER_API_KEY",
            "ARTIFACT_BUCKET",
            "MANIFEST_BUCKET",
            "DRIVE_WATCH_TTL_SECONDS",
            "MAX_WORKERS",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn missing_required_var_is_reported() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::MissingVar(_))));
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("EMBEDDING_PROVIDER", "cohere");
        env::set_var("EMBEDDING_PROVIDER_API_KEY", "key");
        env::set_var("ARTIFACT_BUCKET", "artifacts");
        env::set_var("MANIFEST_BUCKET", "manifests");

        let cfg = AppConfig::from_env().expect("config should load");
        assert_eq!(cfg.drive_watch_ttl_seconds, 86_400);
        assert_eq!(cfg.max_workers, 3);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        clear_all();
    }

    #[test]
    fn invalid_provider_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("EMBEDDING_PROVIDER", "not_a_provider");
        env::set_var("EMBEDDING_PROVIDER_API_KEY", "key");
        env::set_var("ARTIFACT_BUCKET", "artifacts");
        env::set_var("MANIFEST_BUCKET", "manifests");

        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        clear_all();
    }
}
