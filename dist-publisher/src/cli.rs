//! This module implements the CLI interface for dist-publisher: command parsing,
//! the async entrypoint and the user-visible run summary.
//!
//! All pipeline logic (discovery, bucket resolution, purge, upload) lives in the
//! [`dist-publisher-core`] crate. This module is strictly CLI glue.
//!
//! ## How To Use
//! - Command line: `dist-publisher all [BRANCH]` or `dist-publisher project <PATH> [BRANCH]`.
//! - Programmatic/integration use: call [`run`] with a constructed [`Cli`], or
//!   [`dispatch`] with any storage implementation.
//!
//! [`dist-publisher-core`]: ../../dist-publisher-core/

use crate::load_config::{load_config, load_storage_config};
use crate::storage::S3Storage;
use anyhow::Result;
use clap::{Parser, Subcommand};
use dist_publisher_core::branch::{select_branch, BranchContext};
use dist_publisher_core::config::DeploySettings;
use dist_publisher_core::contract::ObjectStorage;
use dist_publisher_core::synchronise::{deploy_all, deploy_single, SynchroniseReport};
use std::path::PathBuf;

/// CLI for dist-publisher: purge and re-upload built projects to their buckets.
#[derive(Parser)]
#[clap(
    name = "dist-publisher",
    version,
    about = "Publish the build output of every project in a workspace to its S3 bucket"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy every project discovered under the workspace
    All {
        /// Branch being deployed; only "prod" targets production buckets
        branch: Option<String>,
        /// Branch override, takes precedence over BRANCH
        #[clap(long = "branch")]
        branch_override: Option<String>,
        /// Workspace root searched for projects
        #[clap(long, default_value = ".")]
        workspace: PathBuf,
        /// Path to an optional YAML settings file
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Deploy a single project (its directory or marker file)
    Project {
        path: PathBuf,
        /// Branch being deployed; only "prod" targets production buckets
        branch: Option<String>,
        /// Branch override, takes precedence over BRANCH
        #[clap(long = "branch")]
        branch_override: Option<String>,
        /// Path to an optional YAML settings file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

impl Commands {
    fn config(&self) -> Option<&PathBuf> {
        match self {
            Commands::All { config, .. } | Commands::Project { config, .. } => config.as_ref(),
        }
    }

    /// The branch for this invocation: `--branch` first, then the positional BRANCH.
    pub fn branch(&self) -> BranchContext {
        match self {
            Commands::All {
                branch,
                branch_override,
                ..
            }
            | Commands::Project {
                branch,
                branch_override,
                ..
            } => select_branch(branch_override.as_deref(), branch.as_deref()),
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main().
///
/// Returns an error when settings cannot be loaded or any project failed.
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let settings = load_config(cli.command.config())?;
    let storage = S3Storage::new(load_storage_config());

    println!("Deploy starting...");
    let report = dispatch(&cli.command, &storage, &settings).await;
    summarize(&report)
}

/// Run the command against `storage`.
pub async fn dispatch<S>(
    command: &Commands,
    storage: &S,
    settings: &DeploySettings,
) -> SynchroniseReport
where
    S: ObjectStorage + ?Sized,
{
    let branch = command.branch();
    match command {
        Commands::All { workspace, .. } => {
            tracing::info!(command = "all", workspace = %workspace.display(), "Starting workspace deploy");
            deploy_all(storage, workspace, &branch, settings).await
        }
        Commands::Project { path, .. } => {
            tracing::info!(command = "project", project = %path.display(), "Starting project deploy");
            deploy_single(storage, path, &branch, settings).await
        }
    }
}

/// Print one line per project and turn any failure into an error.
pub fn summarize(report: &SynchroniseReport) -> Result<()> {
    for outcome in &report.projects {
        match &outcome.result {
            Ok(project) => println!(
                "[OK] {} -> {} ({} removed, {} uploaded)",
                outcome.project_dir.display(),
                project.bucket,
                project.purged.len(),
                project.uploaded.len()
            ),
            Err(e) => match &outcome.bucket {
                Some(bucket) => eprintln!(
                    "[ERROR] {} -> {}: {}",
                    outcome.project_dir.display(),
                    bucket,
                    e
                ),
                None => eprintln!("[ERROR] {}: {}", outcome.project_dir.display(), e),
            },
        }
    }

    if report.projects.is_empty() {
        println!("No projects found.");
    }

    if report.is_success() {
        println!("Deploy complete: {} project(s) deployed.", report.success_count());
        tracing::info!(projects = report.projects.len(), "Deploy complete");
        Ok(())
    } else {
        tracing::error!(
            failed = report.failure_count(),
            total = report.projects.len(),
            "Deploy finished with failures"
        );
        anyhow::bail!(
            "{} of {} project(s) failed to deploy",
            report.failure_count(),
            report.projects.len()
        )
    }
}
