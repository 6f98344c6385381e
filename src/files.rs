//! Local file applier for the config-file actions of a plan.
//!
//! Applies `EnsureDirectory` and `WriteFile` actions on the local filesystem,
//! optionally beneath a staging root. Every other action belongs to an
//! external collaborator and is skipped.
//!
//! - Files are written to a hidden sibling and renamed over the target, so a
//!   reader never sees a half-written config
//! - Files whose content already matches are left untouched
//! - Directories are created and their mode applied; entries the plan does
//!   not name are never removed

use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::engine::plan::{ProvisionAction, ProvisionPlan};
use crate::types::FileMode;

/// What `apply_file_actions` did, or would do in dry-run mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub directories_created: Vec<PathBuf>,
    pub files_written: Vec<PathBuf>,
    pub files_unchanged: Vec<PathBuf>,
}

impl ApplyReport {
    pub fn changed(&self) -> bool {
        !self.directories_created.is_empty() || !self.files_written.is_empty()
    }
}

/// Apply the file actions of `plan` in order.
///
/// With a `root`, absolute plan paths are placed beneath it
/// (`/etc/telegraf/telegraf.conf` becomes `<root>/etc/telegraf/telegraf.conf`).
/// In dry-run mode nothing is written and the report lists what would change.
pub fn apply_file_actions(
    plan: &ProvisionPlan,
    root: Option<&Path>,
    dry_run: bool,
) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();

    for action in &plan.actions {
        match action {
            ProvisionAction::EnsureDirectory { path, mode, .. } => {
                let target = rebase(root, path);
                if !target.is_dir() {
                    report.directories_created.push(target.clone());
                }
                if dry_run {
                    tracing::info!("[dry-run] Would ensure directory {}", target.display());
                    continue;
                }
                fs::create_dir_all(&target)
                    .with_context(|| format!("Failed to create directory {:?}", target))?;
                apply_mode(&target, *mode)?;
            }
            ProvisionAction::WriteFile { path, mode, content } => {
                let target = rebase(root, path);
                let unchanged = fs::read(&target).is_ok_and(|current| current == content.as_bytes());
                if unchanged {
                    tracing::debug!("{} is up to date", target.display());
                    if !dry_run {
                        apply_mode(&target, *mode)?;
                    }
                    report.files_unchanged.push(target);
                    continue;
                }
                if dry_run {
                    tracing::info!("[dry-run] Would write {} ({} bytes)", target.display(), content.len());
                } else {
                    write_replacing(&target, content, *mode)?;
                    tracing::info!("Wrote {}", target.display());
                }
                report.files_written.push(target);
            }
            other => tracing::debug!("Skipping {} (external collaborator)", other),
        }
    }

    Ok(report)
}

/// Place `path` beneath `root`, dropping its root and prefix components.
fn rebase(root: Option<&Path>, path: &Path) -> PathBuf {
    let Some(root) = root else {
        return path.to_path_buf();
    };
    let relative: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    root.join(relative)
}

fn write_replacing(target: &Path, content: &str, mode: Option<FileMode>) -> Result<()> {
    let parent = target
        .parent()
        .with_context(|| format!("{:?} has no parent directory", target))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {:?}", parent))?;

    let file_name = target
        .file_name()
        .with_context(|| format!("{:?} has no file name", target))?;
    let staging = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));

    fs::write(&staging, content)
        .with_context(|| format!("Failed to write {:?}", staging))?;
    apply_mode(&staging, mode)?;
    fs::rename(&staging, target)
        .with_context(|| format!("Failed to replace {:?}", target))?;
    Ok(())
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<FileMode>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        fs::set_permissions(path, fs::Permissions::from_mode(mode.bits()))
            .with_context(|| format!("Failed to set mode {} on {:?}", mode, path))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<FileMode>) -> Result<()> {
    Ok(())
}
