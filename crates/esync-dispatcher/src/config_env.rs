use esync_config::AppConfig;

/// Serialize shared configuration into the environment variables a worker
/// process needs to reconstruct its own `AppConfig::from_env()` without
/// re-deriving it from scratch.
pub fn config_envs(config: &AppConfig) -> Vec<(String, String)> {
    let mut envs = vec![
        (
            "EMBEDDING_PROVIDER".to_string(),
            match config.embedding_provider {
                esync_config::EmbeddingProviderKind::VertexAi => "vertex_ai".to_string(),
                esync_config::EmbeddingProviderKind::Cohere => "cohere".to_string(),
            },
        ),
        (
            "EMBEDDING_PROVIDER_API_KEY".to_string(),
            config.embedding_provider_api_key.clone(),
        ),
        ("ARTIFACT_BUCKET".to_string(), config.artifact_bucket.clone()),
        ("MANIFEST_BUCKET".to_string(), config.manifest_bucket.clone()),
        ("WATCH_STATE_PREFIX".to_string(), config.watch_state_prefix.clone()),
        (
            "DRIVE_WATCH_TTL_SECONDS".to_string(),
            config.drive_watch_ttl_seconds.to_string(),
        ),
        (
            "DRIVE_WATCH_COOLDOWN_SECONDS".to_string(),
            config.drive_watch_cooldown_seconds.to_string(),
        ),
        (
            "CHECKPOINT_INTERVAL".to_string(),
            config.checkpoint_interval.to_string(),
        ),
        ("MAX_PIXELS".to_string(), config.max_pixels.to_string()),
        ("MAX_FILE_SIZE_MB".to_string(), config.max_file_size_mb.to_string()),
        ("MAX_WORKERS".to_string(), config.max_workers.to_string()),
        ("BIND_ADDR".to_string(), config.bind_addr.clone()),
    ];

    if let Some(project) = &config.gcp_project {
        envs.push(("GCP_PROJECT".to_string(), project.clone()));
    }
    if let Some(region) = &config.gcp_region {
        envs.push(("GCP_REGION".to_string(), region.clone()));
    }
    if let Some(callback) = &config.drive_watch_callback_url {
        envs.push(("DRIVE_WATCH_CALLBACK_URL".to_string(), callback.clone()));
    }
    if let Some(token) = &config.api_auth_token {
        envs.push(("API_AUTH_TOKEN".to_string(), token.clone()));
    }

    envs
}
