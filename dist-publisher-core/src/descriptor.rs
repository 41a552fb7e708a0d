//! Project descriptor (`package.json`) loading.
//!
//! The deploy prefixes live under `meta.deploy.prefix`; a top-level
//! `deploy.prefix` section is accepted when `meta` carries none.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::error::{DeployError, DeployResult};

/// Bucket name prefixes per environment. Either may be left unconfigured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeployPrefixes {
    #[serde(default)]
    pub prod: Option<String>,
    #[serde(default)]
    pub dev: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub name: String,
    pub prefixes: DeployPrefixes,
}

#[derive(Deserialize)]
struct RawDescriptor {
    name: Option<String>,
    meta: Option<RawMeta>,
    deploy: Option<RawDeploy>,
}

#[derive(Deserialize)]
struct RawMeta {
    deploy: Option<RawDeploy>,
}

#[derive(Deserialize)]
struct RawDeploy {
    prefix: Option<DeployPrefixes>,
}

/// Load the descriptor at `path`.
///
/// Missing file is [`DeployError::DescriptorNotFound`]; invalid JSON, a missing
/// `name` or a missing prefix section is [`DeployError::DescriptorMalformed`].
pub async fn load_descriptor(path: &Path) -> DeployResult<ProjectDescriptor> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error!(descriptor = %path.display(), "Build descriptor not found");
            return Err(DeployError::DescriptorNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            error!(descriptor = %path.display(), error = ?e, "Failed to read build descriptor");
            return Err(DeployError::DescriptorMalformed {
                path: path.to_path_buf(),
                reason: format!("unreadable: {e}"),
            });
        }
    };

    let descriptor = parse_descriptor(&content).map_err(|reason| {
        error!(descriptor = %path.display(), %reason, "Malformed build descriptor");
        DeployError::DescriptorMalformed {
            path: path.to_path_buf(),
            reason,
        }
    })?;

    info!(
        descriptor = %path.display(),
        name = %descriptor.name,
        "Loaded build descriptor"
    );
    debug!(?descriptor, "Descriptor loaded (full debug)");
    Ok(descriptor)
}

fn parse_descriptor(content: &str) -> Result<ProjectDescriptor, String> {
    let raw: RawDescriptor =
        serde_json::from_str(content).map_err(|e| format!("invalid JSON: {e}"))?;

    let name = raw
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| "missing `name`".to_string())?;

    let prefixes = raw
        .meta
        .and_then(|m| m.deploy)
        .and_then(|d| d.prefix)
        .or_else(|| raw.deploy.and_then(|d| d.prefix))
        .ok_or_else(|| "missing `meta.deploy.prefix`".to_string())?;

    Ok(ProjectDescriptor { name, prefixes })
}
