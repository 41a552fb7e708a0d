//! High-level pipeline: orchestrates descriptor → bucket → purge → upload per project.
//!
//! This module provides the top-level orchestration for deploying build output to
//! object storage. For every project it:
//!   - Loads the project's descriptor and resolves the bucket for the active branch
//!   - Verifies the build-output directory exists
//!   - Empties the bucket via [`purge::empty_bucket`]
//!   - Uploads the build-output tree via [`upload::upload_tree`]
//!
//! # Major Types
//! - [`ProjectReport`]: what one successful project deploy purged and uploaded
//! - [`ProjectOutcome`]: the result for one project, success or failure
//! - [`SynchroniseReport`]: all outcomes of a run
//!
//! # Responsibilities
//! - Projects are independent: one failure never stops the others
//! - Within a project, any failed step stops that project; nothing is uploaded
//!   unless the purge succeeded
//! - Every project runs under a deadline; expiry cancels its in-flight uploads
//!
//! # Callable From
//! - Used by the CLI crate and the integration tests, with any [`ObjectStorage`]
//!
//! # Navigation
//! - Entrypoints: [`deploy_all`], [`deploy_single`], [`deploy_project`]
//!
//! [`purge::empty_bucket`]: crate::purge::empty_bucket
//! [`upload::upload_tree`]: crate::upload::upload_tree

use std::path::{Path, PathBuf};

use futures::future::join_all;
use tracing::{error, info};

use crate::branch::BranchContext;
use crate::bucket::resolve_bucket;
use crate::config::DeploySettings;
use crate::contract::ObjectStorage;
use crate::descriptor::load_descriptor;
use crate::discovery::{discover_projects, project_dir};
use crate::error::{DeployError, DeployResult};
use crate::purge::empty_bucket;
use crate::upload::upload_tree;

/// A successfully deployed project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReport {
    pub project_name: String,
    pub bucket: String,
    /// Keys removed by the purge.
    pub purged: Vec<String>,
    /// Keys written by the upload, sorted.
    pub uploaded: Vec<String>,
}

#[derive(Debug)]
pub struct ProjectOutcome {
    pub project_dir: PathBuf,
    /// Target bucket, once resolved. Set even when a later step failed.
    pub bucket: Option<String>,
    pub result: DeployResult<ProjectReport>,
}

/// Entrypoint output: one outcome per project, in discovery order.
#[derive(Debug, Default)]
pub struct SynchroniseReport {
    pub projects: Vec<ProjectOutcome>,
}

impl SynchroniseReport {
    pub fn failures(&self) -> impl Iterator<Item = &ProjectOutcome> {
        self.projects.iter().filter(|p| p.result.is_err())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn success_count(&self) -> usize {
        self.projects.len() - self.failure_count()
    }

    /// True when no project failed. An empty run is a success.
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Deploy every project discovered under `workspace_root`, concurrently.
pub async fn deploy_all<S>(
    storage: &S,
    workspace_root: &Path,
    branch: &BranchContext,
    settings: &DeploySettings,
) -> SynchroniseReport
where
    S: ObjectStorage + ?Sized,
{
    info!(workspace = %workspace_root.display(), branch = %branch.name, "[DEPLOY] Starting workspace deploy");
    let projects = discover_projects(workspace_root, settings);
    let outcomes = join_all(
        projects
            .iter()
            .map(|dir| deploy_project(storage, dir, branch, settings)),
    )
    .await;

    let report = SynchroniseReport { projects: outcomes };
    info!(
        succeeded = report.success_count(),
        failed = report.failure_count(),
        "[DEPLOY] Workspace deploy finished"
    );
    report
}

/// Deploy one explicitly named project (its directory or its marker file).
pub async fn deploy_single<S>(
    storage: &S,
    project_path: &Path,
    branch: &BranchContext,
    settings: &DeploySettings,
) -> SynchroniseReport
where
    S: ObjectStorage + ?Sized,
{
    let dir = project_dir(project_path);
    let outcome = deploy_project(storage, &dir, branch, settings).await;
    SynchroniseReport {
        projects: vec![outcome],
    }
}

/// Run the full pipeline for one project under the configured deadline.
pub async fn deploy_project<S>(
    storage: &S,
    project_dir: &Path,
    branch: &BranchContext,
    settings: &DeploySettings,
) -> ProjectOutcome
where
    S: ObjectStorage + ?Sized,
{
    let timeout = settings.project_timeout();
    let mut bucket = None;
    let result = match tokio::time::timeout(
        timeout,
        run_pipeline(storage, project_dir, branch, settings, &mut bucket),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(DeployError::DeadlineExceeded {
            project: project_dir.to_path_buf(),
            timeout,
        }),
    };

    match &result {
        Ok(report) => info!(
            project = %project_dir.display(),
            bucket = %report.bucket,
            purged = report.purged.len(),
            uploaded = report.uploaded.len(),
            "[DEPLOY] Project deployed"
        ),
        Err(e) => error!(
            project = %project_dir.display(),
            bucket = bucket.as_deref().unwrap_or("unresolved"),
            error = %e,
            "[DEPLOY][ERROR] Project deploy failed"
        ),
    }

    ProjectOutcome {
        project_dir: project_dir.to_path_buf(),
        bucket,
        result,
    }
}

async fn run_pipeline<S>(
    storage: &S,
    project_dir: &Path,
    branch: &BranchContext,
    settings: &DeploySettings,
    resolved_bucket: &mut Option<String>,
) -> DeployResult<ProjectReport>
where
    S: ObjectStorage + ?Sized,
{
    let descriptor = load_descriptor(&project_dir.join(&settings.descriptor_file)).await?;
    let target = resolve_bucket(&descriptor, branch)?;
    let bucket = target.bucket_name;
    *resolved_bucket = Some(bucket.clone());
    info!(project = %descriptor.name, bucket = %bucket, environment = branch.environment(), "[DEPLOY] Bucket name");

    let build_root = project_dir.join(&settings.build_dir);
    let has_build_output = tokio::fs::metadata(&build_root)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !has_build_output {
        return Err(DeployError::BuildOutputMissing { path: build_root });
    }

    let purged = empty_bucket(storage, &bucket, &settings.retry).await?;
    let uploaded = upload_tree(
        storage,
        &bucket,
        &build_root,
        settings.max_concurrent_uploads,
        &settings.retry,
    )
    .await?;

    Ok(ProjectReport {
        project_name: descriptor.name,
        bucket,
        purged,
        uploaded,
    })
}
