//! Workspace discovery: find every directory holding a project marker file.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::DeploySettings;

/// Project directories under `workspace_root` that contain `settings.marker_file`,
/// sorted. Directories named in `settings.ignore_dirs` are never entered.
///
/// Unreadable entries are logged and skipped.
pub fn discover_projects(workspace_root: &Path, settings: &DeploySettings) -> Vec<PathBuf> {
    let walker = WalkDir::new(workspace_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry, &settings.ignore_dirs));

    let mut projects = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable workspace entry");
                continue;
            }
        };
        if entry.file_type().is_file() && entry.file_name() == settings.marker_file.as_str() {
            if let Some(dir) = entry.path().parent() {
                projects.push(dir.to_path_buf());
            }
        }
    }
    projects.sort();

    info!(
        workspace = %workspace_root.display(),
        marker = %settings.marker_file,
        count = projects.len(),
        "Discovered projects"
    );
    projects
}

/// Resolve an explicit project path, which may name the project directory or
/// its marker file.
pub fn project_dir(path: &Path) -> PathBuf {
    if path.is_file() {
        path.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        path.to_path_buf()
    }
}

fn is_ignored(entry: &DirEntry, ignore_dirs: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| ignore_dirs.iter().any(|ignored| ignored == name))
}
