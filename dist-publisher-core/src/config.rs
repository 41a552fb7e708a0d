use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Tunables for discovery and the per-project pipeline. Every field has a
/// default, so an empty settings file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploySettings {
    /// File whose presence marks a directory as a buildable sub-project.
    pub marker_file: String,
    /// Descriptor file, next to the marker.
    pub descriptor_file: String,
    /// Build-output directory, relative to the project directory.
    pub build_dir: String,
    /// Directory names never descended into during discovery.
    pub ignore_dirs: Vec<String>,
    pub max_concurrent_uploads: usize,
    pub project_timeout_secs: u64,
    pub retry: RetrySettings,
}

impl Default for DeploySettings {
    fn default() -> Self {
        DeploySettings {
            marker_file: "gulpfile.js".to_string(),
            descriptor_file: "package.json".to_string(),
            build_dir: "dist".to_string(),
            ignore_dirs: vec!["node_modules".to_string()],
            max_concurrent_uploads: 8,
            project_timeout_secs: 600,
            retry: RetrySettings::default(),
        }
    }
}

impl DeploySettings {
    pub fn project_timeout(&self) -> Duration {
        Duration::from_secs(self.project_timeout_secs)
    }

    pub fn trace_loaded(&self) {
        info!(
            marker_file = %self.marker_file,
            build_dir = %self.build_dir,
            max_concurrent_uploads = self.max_concurrent_uploads,
            project_timeout_secs = self.project_timeout_secs,
            "Loaded DeploySettings"
        );
        debug!(?self, "DeploySettings loaded (full debug)");
    }
}

/// Backoff for transient storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

impl RetrySettings {
    /// Delay before retry number `retry` (1-based): base * 2^(retry-1), capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}
