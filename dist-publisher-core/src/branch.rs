//! Branch selection: which environment a deploy targets.

use tracing::info;

/// The only branch name that deploys to production.
pub const PRODUCTION_BRANCH: &str = "prod";

/// Active branch for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchContext {
    /// Empty when no branch was supplied at all.
    pub name: String,
    pub is_production: bool,
}

impl BranchContext {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let is_production = name == PRODUCTION_BRANCH;
        BranchContext {
            name,
            is_production,
        }
    }

    pub fn environment(&self) -> &'static str {
        if self.is_production {
            "prod"
        } else {
            "dev"
        }
    }
}

/// Pick the branch from an explicit override, falling back to the positional
/// invocation argument. Anything other than exactly `"prod"` is development.
pub fn select_branch(explicit: Option<&str>, positional: Option<&str>) -> BranchContext {
    info!(
        explicit = explicit.unwrap_or("undefined"),
        "Passed in branch"
    );
    let name = match explicit {
        Some(branch) => branch,
        None => {
            info!(positional = positional.unwrap_or("undefined"), "Deploy argument");
            positional.unwrap_or_default()
        }
    };
    let ctx = BranchContext::new(name);
    info!(branch = %ctx.name, environment = ctx.environment(), "Selected branch");
    ctx
}
