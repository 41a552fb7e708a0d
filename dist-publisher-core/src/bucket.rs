use crate::branch::BranchContext;
use crate::descriptor::ProjectDescriptor;
use crate::error::{DeployError, DeployResult};

/// The bucket one project deploys into for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketTarget {
    pub bucket_name: String,
}

/// `prefix(environment) + project name`. An unset or empty prefix is an error,
/// never a bucket named after the bare project.
pub fn resolve_bucket(
    descriptor: &ProjectDescriptor,
    branch: &BranchContext,
) -> DeployResult<BucketTarget> {
    let prefix = if branch.is_production {
        descriptor.prefixes.prod.as_deref()
    } else {
        descriptor.prefixes.dev.as_deref()
    };

    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => Ok(BucketTarget {
            bucket_name: format!("{prefix}{}", descriptor.name),
        }),
        None => Err(DeployError::BucketResolutionFailed {
            project: descriptor.name.clone(),
            environment: branch.environment(),
        }),
    }
}
