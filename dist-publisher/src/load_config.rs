use crate::storage::StorageConfig;
use anyhow::Result;
use dist_publisher_core::config::DeploySettings;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Loads deploy settings from an optional YAML file (no secrets).
///
/// No path means built-in defaults. An empty file is also all defaults; any
/// field left out of the file keeps its default.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<DeploySettings> {
    let Some(path) = path else {
        info!("No settings file given, using defaults");
        let settings = DeploySettings::default();
        settings.trace_loaded();
        return Ok(settings);
    };
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading settings from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Settings file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read settings file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let settings: DeploySettings = if config_content.trim().is_empty() {
        DeploySettings::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(settings) => {
                info!(config_path = ?path_ref, "Parsed settings YAML successfully");
                settings
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse settings YAML");
                return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
            }
        }
    };

    if settings.max_concurrent_uploads == 0 {
        error!("max_concurrent_uploads must be at least 1");
        anyhow::bail!("max_concurrent_uploads must be at least 1");
    }
    if settings.project_timeout_secs == 0 {
        error!("project_timeout_secs must be at least 1");
        anyhow::bail!("project_timeout_secs must be at least 1");
    }

    settings.trace_loaded();
    Ok(settings)
}

/// Reads storage overrides from the environment (`AWS_REGION`, `AWS_ENDPOINT_URL`).
///
/// Credentials are left to the storage client, which reads `AWS_ACCESS_KEY_ID`
/// and `AWS_SECRET_ACCESS_KEY` itself.
pub fn load_storage_config() -> StorageConfig {
    let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
    let config = StorageConfig {
        region: non_empty("AWS_REGION"),
        endpoint: non_empty("AWS_ENDPOINT_URL"),
    };
    info!(
        region_set = config.region.is_some(),
        endpoint_set = config.endpoint.is_some(),
        "Storage config loaded from env"
    );
    config
}
