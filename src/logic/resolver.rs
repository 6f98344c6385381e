//! Platform Resolver
//!
//! Translates host facts and caller parameters into a `PlatformProfile`: how
//! the agent gets installed, where its repository lives, where its config
//! goes and with which permissions.
//!
//! # Design
//!
//! - **One dispatch point**: facts are classified into an `OsFamily` once;
//!   every platform decision is a `match` on that tag
//! - **Explicit defaults**: paths, modes and URLs come from a
//!   `PlatformDefaults` argument, never from global state
//! - **Absent, not defaulted**: fields that make no sense on the resolved
//!   platform are `None`, and overriding them is `InapplicableOption`
//! - **Pure logic**: no I/O, no side effects
//!
//! # Resolution Rules
//!
//! | Family      | Install    | Provider   | Repo location                              |
//! |-------------|------------|------------|--------------------------------------------|
//! | debian-like | repository | apt        | `<base><distro>`, component = channel      |
//! | redhat-like | repository | yum        | `<base>rhel/$releasever/$basearch/<channel>` |
//! | suse-like   | archive    | -          | -                                          |
//! | windows     | repository | chocolatey | -                                          |

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::{ProvisionError, Result};
use crate::facts::HostFacts;
use crate::params::ProvisionParams;
use crate::profiles::PlatformDefaults;
use crate::types::{
    Architecture, FileMode, InstallMethod, OsFamily, PackageProvider, RepoChannel,
};

// ============================================================================
// Platform Profile
// ============================================================================

/// Resolved, OS-specific installation plan inputs. Never mutated after `resolve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    pub os_family: OsFamily,
    pub install_method: InstallMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_provider: Option<PackageProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_base_url: Option<String>,
    /// Concrete repository URL handed to the package manager. Yum
    /// placeholders (`$releasever`, `$basearch`) are kept literally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_location: Option<String>,
    /// Apt distribution codename, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_release: Option<String>,
    pub repo_channel: RepoChannel,
    /// Whether the package index must be refreshed after registering the repo
    pub refresh_repo_index: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_install_dir: Option<PathBuf>,
    pub config_file_path: PathBuf,
    pub config_dir_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file_mode: Option<FileMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_dir_mode: Option<FileMode>,
    pub service_managed: bool,
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_restart: Option<String>,
}

impl fmt::Display for PlatformProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Platform Profile: {}", self.os_family)?;
        writeln!(f, "  Install method: {}", self.install_method)?;
        if let Some(provider) = self.package_provider {
            writeln!(f, "  Package provider: {}", provider)?;
        }
        if let Some(location) = &self.repo_location {
            writeln!(f, "  Repository: {} ({})", location, self.repo_channel)?;
        }
        if let Some(url) = &self.archive_url {
            writeln!(f, "  Archive: {}", url)?;
        }
        writeln!(f, "  Config file: {}", self.config_file_path.display())?;
        write!(f, "  Drop-in dir: {}", self.config_dir_path.display())
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Classify host facts into a supported family, or `None` for anything else.
///
/// The OS family fact wins; the OS name and then the kernel are consulted
/// only when the family is not recognised.
pub fn classify_os(facts: &HostFacts) -> Option<OsFamily> {
    classify_name(&facts.os_family)
        .or_else(|| classify_name(&facts.os_name))
        .or_else(|| classify_name(&facts.kernel).filter(|f| *f == OsFamily::Windows))
}

fn classify_name(name: &str) -> Option<OsFamily> {
    match name.trim().to_ascii_lowercase().as_str() {
        "debian" | "ubuntu" | "linuxmint" | "raspbian" => Some(OsFamily::DebianLike),
        "redhat" | "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "oraclelinux"
        | "amazon" | "scientific" => Some(OsFamily::RedhatLike),
        "suse" | "sles" | "sled" => Some(OsFamily::SuseLike),
        s if s.starts_with("opensuse") => Some(OsFamily::SuseLike),
        "windows" => Some(OsFamily::Windows),
        _ => None,
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the platform profile with the built-in defaults.
pub fn resolve(facts: &HostFacts, params: &ProvisionParams) -> Result<PlatformProfile> {
    resolve_with_defaults(facts, params, &PlatformDefaults::default())
}

/// Resolve the platform profile.
///
/// # Errors
///
/// - `UnsupportedPlatform`: facts do not classify into a supported family
/// - `InvalidRepoChannel`: `repo_channel` outside stable/testing/unstable
/// - `UnsupportedArchitecture`: archive install on an unknown architecture
/// - `InapplicableOption`: an override targets a field this platform lacks
///
/// # What This Explicitly Refuses To Do
///
/// - Look at `manage_repo`: it is consumed by the plan, not the profile
/// - Expand yum placeholders: the package manager does that
pub fn resolve_with_defaults(
    facts: &HostFacts,
    params: &ProvisionParams,
    defaults: &PlatformDefaults,
) -> Result<PlatformProfile> {
    let family = classify_os(facts).ok_or_else(|| ProvisionError::UnsupportedPlatform {
        family: facts.os_family.clone(),
        name: facts.os_name.clone(),
    })?;
    tracing::debug!("Classified host as {} ({})", family, facts);

    let overrides = &params.overrides;
    let windows = !family.is_posix();

    // 1. Install method
    let install_method = match overrides.install_method {
        Some(method) => {
            check_method_applicable(family, method)?;
            method
        }
        None => default_install_method(family),
    };
    let platform = format!("{family} ({install_method} install)");

    // 2. Repository
    let repo_channel = params.repo_channel()?;
    let repo_base_url = if windows {
        reject_override(&overrides.repo_base_url, "repo_base_url", &platform)?;
        None
    } else {
        let base = overrides
            .repo_base_url
            .clone()
            .unwrap_or_else(|| defaults.repo_base_url.clone());
        Some(with_trailing_slash(base))
    };

    let uses_repository = install_method == InstallMethod::Repository;
    let package_provider = uses_repository.then(|| package_provider(family)).flatten();
    let repo_location = match (&repo_base_url, uses_repository) {
        (Some(base), true) => repo_location(family, base, &facts.os_name, repo_channel),
        _ => None,
    };
    let repo_release = match family {
        OsFamily::DebianLike if repo_location.is_some() => facts.os_codename.clone(),
        _ => None,
    };
    let refresh_repo_index = family == OsFamily::DebianLike && repo_location.is_some();

    // 3. Archive
    let (archive_url, archive_install_dir) = if install_method == InstallMethod::Archive {
        let url = match &overrides.archive_url {
            Some(url) => url.clone(),
            None => defaults.archive_url(Architecture::from_fact(&facts.architecture)?),
        };
        let dir = overrides
            .archive_install_dir
            .clone()
            .unwrap_or_else(|| defaults.archive_install_dir.clone());
        (Some(url), Some(PathBuf::from(dir)))
    } else {
        reject_override(&overrides.archive_url, "archive_url", &platform)?;
        reject_override(&overrides.archive_install_dir, "archive_install_dir", &platform)?;
        (None, None)
    };

    // 4. Paths and modes
    let config_file_path = overrides
        .config_file_path
        .clone()
        .unwrap_or_else(|| defaults.config_file_path(windows));
    let config_dir_path = overrides
        .config_dir_path
        .clone()
        .unwrap_or_else(|| defaults.config_dir_path(windows));

    let (config_file_mode, config_dir_mode, service_restart) = if windows {
        reject_override(&overrides.config_file_mode, "config_file_mode", &platform)?;
        reject_override(&overrides.config_dir_mode, "config_dir_mode", &platform)?;
        reject_override(&overrides.service_restart, "service_restart", &platform)?;
        (None, None, None)
    } else {
        (
            Some(overrides.config_file_mode.unwrap_or(defaults.config_file_mode)),
            Some(overrides.config_dir_mode.unwrap_or(defaults.config_dir_mode)),
            Some(
                overrides
                    .service_restart
                    .clone()
                    .unwrap_or_else(|| defaults.service_restart()),
            ),
        )
    };

    let profile = PlatformProfile {
        os_family: family,
        install_method,
        package_provider,
        repo_base_url,
        repo_location,
        repo_release,
        repo_channel,
        refresh_repo_index,
        archive_url,
        archive_install_dir,
        config_file_path: PathBuf::from(config_file_path),
        config_dir_path: PathBuf::from(config_dir_path),
        config_file_mode,
        config_dir_mode,
        service_managed: true,
        service_name: defaults.agent_name.clone(),
        service_restart,
    };

    tracing::info!(
        "Resolved {} profile: {} install, config at {}",
        profile.os_family,
        profile.install_method,
        profile.config_file_path.display()
    );

    Ok(profile)
}

// ============================================================================
// Helpers
// ============================================================================

fn default_install_method(family: OsFamily) -> InstallMethod {
    match family {
        OsFamily::SuseLike => InstallMethod::Archive,
        OsFamily::DebianLike | OsFamily::RedhatLike | OsFamily::Windows => InstallMethod::Repository,
    }
}

/// Suse has no repository support here and Windows cannot take a linux tarball.
fn check_method_applicable(family: OsFamily, method: InstallMethod) -> Result<()> {
    let applicable = match (family, method) {
        (_, InstallMethod::Preinstalled) => true,
        (OsFamily::SuseLike, InstallMethod::Repository) => false,
        (OsFamily::Windows, InstallMethod::Archive) => false,
        _ => true,
    };
    if applicable {
        Ok(())
    } else {
        Err(ProvisionError::inapplicable(
            format!("install_method={method}"),
            family.to_string(),
        ))
    }
}

fn package_provider(family: OsFamily) -> Option<PackageProvider> {
    match family {
        OsFamily::DebianLike => Some(PackageProvider::Apt),
        OsFamily::RedhatLike => Some(PackageProvider::Yum),
        OsFamily::Windows => Some(PackageProvider::Chocolatey),
        OsFamily::SuseLike => None,
    }
}

fn repo_location(family: OsFamily, base: &str, os_name: &str, channel: RepoChannel) -> Option<String> {
    match family {
        OsFamily::DebianLike => {
            let distro = match os_name.trim() {
                "" => "debian".to_string(),
                name => name.to_ascii_lowercase(),
            };
            Some(format!("{base}{distro}"))
        }
        OsFamily::RedhatLike => Some(format!("{base}rhel/$releasever/$basearch/{channel}")),
        OsFamily::SuseLike | OsFamily::Windows => None,
    }
}

fn reject_override<T>(value: &Option<T>, option: &str, platform: &str) -> Result<()> {
    match value {
        Some(_) => Err(ProvisionError::inapplicable(option, platform)),
        None => Ok(()),
    }
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

// ============================================================================
// Tests
// ============================================================================
