//! Error types for the deploy pipeline.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by an [`ObjectStorage`](crate::contract::ObjectStorage) backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Network hiccups, throttling, 5xx responses: worth retrying.
    #[error("transient storage error: {0}")]
    Transient(String),

    /// Missing bucket, access denied, bad credentials: retrying will not help.
    #[error("storage error: {0}")]
    Permanent(String),
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }
}

/// Why a single file could not be uploaded.
#[derive(Debug, Error)]
pub enum UploadCause {
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error("cannot derive object key: {0}")]
    Key(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A file that failed to upload, with the reason.
#[derive(Debug, Error)]
#[error("{} ({cause})", .path.display())]
pub struct FileUploadError {
    pub path: PathBuf,
    #[source]
    pub cause: UploadCause,
}

/// Result type alias for a single project's deploy.
pub type DeployResult<T> = Result<T, DeployError>;

/// Project-level deploy failure. Each variant is fatal for one project only.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("build descriptor not found: {}", .path.display())]
    DescriptorNotFound { path: PathBuf },

    #[error("malformed build descriptor {}: {reason}", .path.display())]
    DescriptorMalformed { path: PathBuf, reason: String },

    /// The prefix for the selected environment is not configured.
    #[error("cannot resolve bucket for project '{project}': no {environment} deploy prefix configured")]
    BucketResolutionFailed {
        project: String,
        environment: &'static str,
    },

    #[error("build output directory not found: {}", .path.display())]
    BuildOutputMissing { path: PathBuf },

    #[error("failed to purge bucket {bucket}: {source}")]
    PurgeFailed {
        bucket: String,
        #[source]
        source: StorageError,
    },

    #[error(
        "{} file(s) failed to upload to bucket {bucket}: {}",
        .failures.len(),
        summarize(.failures)
    )]
    UploadFailed {
        bucket: String,
        failures: Vec<FileUploadError>,
    },

    #[error("deploy of {} exceeded its {timeout:?} deadline", .project.display())]
    DeadlineExceeded { project: PathBuf, timeout: Duration },
}

fn summarize(failures: &[FileUploadError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
