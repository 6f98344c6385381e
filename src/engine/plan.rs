//! Provision Plan Engine
//!
//! Translates a resolved `PlatformProfile` plus the rendered configuration
//! into an ordered sequence of `ProvisionAction` requests for the external
//! collaborators (package manager, archive installer, file writer, service
//! manager), with explicit dependency edges between them.
//!
//! # Generated Actions
//!
//! | Install method | Actions |
//! |----------------|---------|
//! | repository     | RegisterRepository? → InstallPackage → EnsureDirectory → WriteFile+ → EnsureService |
//! | archive        | InstallArchive → EnsureDirectory → WriteFile+ → EnsureService |
//! | preinstalled   | EnsureDirectory → WriteFile+ → EnsureService |
//!
//! # Design
//!
//! - **Pure logic**: no I/O, no side effects, only generates the plan
//! - **Explicit ordering**: edges say what must happen first and what gets
//!   notified; action order in the list is a valid execution order
//! - **Full replacement**: config files carry their complete content

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

use crate::document::ConfigDocument;
use crate::logic::resolver::PlatformProfile;
use crate::params::ProvisionParams;
use crate::profiles::{archive, repo};
use crate::types::{FileMode, InstallMethod, OsFamily, PackageEnsure, PackageProvider};

// ============================================================================
// Action Types
// ============================================================================

/// Repository definition handed to the package manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepoSource {
    Apt {
        location: String,
        /// Distribution codename; the package manager fills it in when absent
        release: Option<String>,
        /// Repository component, the release channel
        repos: String,
        key_url: String,
    },
    Yum {
        /// Contains literal `$releasever`/`$basearch` placeholders
        baseurl: String,
        gpgkey: String,
    },
}

/// A single request to an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProvisionAction {
    RegisterRepository {
        name: String,
        source: RepoSource,
        /// Refresh the package index once the repository is registered
        refresh_index: bool,
    },
    InstallPackage {
        name: String,
        ensure: PackageEnsure,
        provider: PackageProvider,
        /// The repository is not registered by this plan
        externally_sourced: bool,
    },
    InstallArchive {
        url: String,
        download_path: PathBuf,
        install_dir: PathBuf,
    },
    /// Create the directory if missing; existing entries are never removed
    EnsureDirectory {
        path: PathBuf,
        mode: Option<FileMode>,
        purge: bool,
    },
    /// Replace the file with exactly `content`
    WriteFile {
        path: PathBuf,
        mode: Option<FileMode>,
        content: String,
    },
    EnsureService {
        name: String,
        running: bool,
        enabled: bool,
        restart: Option<String>,
    },
}

impl fmt::Display for ProvisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegisterRepository { name, source, .. } => match source {
                RepoSource::Apt { location, repos, .. } => {
                    write!(f, "RegisterRepository({}, apt {} {})", name, location, repos)
                }
                RepoSource::Yum { baseurl, .. } => {
                    write!(f, "RegisterRepository({}, yum {})", name, baseurl)
                }
            },
            Self::InstallPackage { name, ensure, provider, .. } => {
                write!(f, "InstallPackage({}, ensure={}, provider={})", name, ensure, provider)
            }
            Self::InstallArchive { url, install_dir, .. } => {
                write!(f, "InstallArchive({} -> {})", url, install_dir.display())
            }
            Self::EnsureDirectory { path, mode, .. } => {
                write!(f, "EnsureDirectory({}, mode={})", path.display(), display_mode(mode))
            }
            Self::WriteFile { path, mode, content } => write!(
                f,
                "WriteFile({}, mode={}, {} bytes)",
                path.display(),
                display_mode(mode),
                content.len()
            ),
            Self::EnsureService { name, restart, .. } => {
                write!(f, "EnsureService({}, restart={:?})", name, restart)
            }
        }
    }
}

fn display_mode(mode: &Option<FileMode>) -> String {
    mode.map_or_else(|| "-".to_string(), |m| m.to_string())
}

/// How two actions depend on each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// `from` must complete before `to` starts
    Before,
    /// `from` must complete before `to`, and a change in `from` restarts `to`
    Notify,
}

/// Dependency between two actions, by index into `ProvisionPlan::actions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub kind: EdgeKind,
}

/// A drop-in fragment rendered for the config directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DropInFile {
    pub file_name: String,
    pub document: ConfigDocument,
}

/// A complete provision plan: ordered actions plus dependency edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionPlan {
    pub actions: Vec<ProvisionAction>,
    pub edges: Vec<Edge>,
    /// Family the plan was generated for
    pub os_family: OsFamily,
}

impl ProvisionPlan {
    pub fn repository_registration(&self) -> Option<&ProvisionAction> {
        self.actions
            .iter()
            .find(|a| matches!(a, ProvisionAction::RegisterRepository { .. }))
    }

    /// The package or archive install request, if any
    pub fn install(&self) -> Option<&ProvisionAction> {
        self.actions.iter().find(|a| {
            matches!(
                a,
                ProvisionAction::InstallPackage { .. } | ProvisionAction::InstallArchive { .. }
            )
        })
    }

    pub fn file_writes(&self) -> impl Iterator<Item = &ProvisionAction> {
        self.actions
            .iter()
            .filter(|a| matches!(a, ProvisionAction::WriteFile { .. }))
    }

    pub fn position(&self, predicate: impl Fn(&ProvisionAction) -> bool) -> Option<usize> {
        self.actions.iter().position(predicate)
    }

    /// True if a chain of edges of any kind leads from `from` to `to`.
    pub fn is_ordered_before(&self, from: usize, to: usize) -> bool {
        let mut visited = vec![false; self.actions.len()];
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            for edge in self.edges.iter().filter(|e| e.from == current) {
                if edge.to == to {
                    return true;
                }
                if let Some(seen) = visited.get_mut(edge.to) {
                    if !*seen {
                        *seen = true;
                        queue.push_back(edge.to);
                    }
                }
            }
        }
        false
    }

    /// Returns a summary of the plan for logging/display.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Provision Plan: {}", self.os_family),
            format!("  Actions ({}):", self.actions.len()),
        ];
        for (i, action) in self.actions.iter().enumerate() {
            lines.push(format!("    {}. {}", i + 1, action));
        }
        lines.push(format!("  Edges ({}):", self.edges.len()));
        for edge in &self.edges {
            let arrow = match edge.kind {
                EdgeKind::Before => "->",
                EdgeKind::Notify => "~>",
            };
            lines.push(format!("    {} {} {}", edge.from + 1, arrow, edge.to + 1));
        }
        lines.join("\n")
    }
}

// ============================================================================
// Plan Calculation
// ============================================================================

/// Calculate the provision plan for a resolved profile.
///
/// `document` is the rendered main configuration and `drop_ins` the rendered
/// fragments; both are written with full replacement.
///
/// # What This Explicitly Refuses To Do
///
/// - Register a repository when `manage_repo` is off or the profile has no
///   repository location
/// - Purge the drop-in directory: files it does not manage stay
/// - Check that a pre-existing repository exists when `manage_repo` is off;
///   the install request is issued regardless
pub fn calculate_provision_plan(
    profile: &PlatformProfile,
    params: &ProvisionParams,
    document: &ConfigDocument,
    drop_ins: &[DropInFile],
) -> ProvisionPlan {
    let mut builder = PlanBuilder::default();

    // 1. Repository
    let repository = match (&profile.repo_location, params.manage_repo) {
        (Some(location), true) => repo_source(profile, location).map(|source| {
            builder.push(ProvisionAction::RegisterRepository {
                name: repo::NAME.to_string(),
                source,
                refresh_index: profile.refresh_repo_index,
            })
        }),
        _ => None,
    };

    // 2. Install
    let install = match profile.install_method {
        InstallMethod::Repository => profile.package_provider.map(|provider| {
            let index = builder.push(ProvisionAction::InstallPackage {
                name: profile.service_name.clone(),
                ensure: params.ensure.clone(),
                provider,
                externally_sourced: repository.is_none(),
            });
            if let Some(repo_index) = repository {
                builder.edge(repo_index, index, EdgeKind::Before);
            }
            index
        }),
        InstallMethod::Archive => match (&profile.archive_url, &profile.archive_install_dir) {
            (Some(url), Some(dir)) => Some(builder.push(ProvisionAction::InstallArchive {
                url: url.clone(),
                download_path: PathBuf::from(archive::DOWNLOAD_PATH),
                install_dir: dir.clone(),
            })),
            _ => None,
        },
        InstallMethod::Preinstalled => None,
    };

    // 3. Drop-in directory
    let directory = builder.push(ProvisionAction::EnsureDirectory {
        path: profile.config_dir_path.clone(),
        mode: profile.config_dir_mode,
        purge: false,
    });
    if let Some(install_index) = install {
        builder.edge(install_index, directory, EdgeKind::Before);
    }

    // 4. Config files
    let mut files = vec![builder.push(ProvisionAction::WriteFile {
        path: profile.config_file_path.clone(),
        mode: profile.config_file_mode,
        content: document.to_string(),
    })];
    for drop_in in drop_ins {
        files.push(builder.push(ProvisionAction::WriteFile {
            path: profile.config_dir_path.join(&drop_in.file_name),
            mode: profile.config_file_mode,
            content: drop_in.document.to_string(),
        }));
    }

    // 5. Service
    let service = builder.push(ProvisionAction::EnsureService {
        name: profile.service_name.clone(),
        running: true,
        enabled: true,
        restart: profile.service_restart.clone(),
    });
    for file in files {
        builder.edge(directory, file, EdgeKind::Before);
        builder.edge(file, service, EdgeKind::Notify);
    }

    let plan = builder.finish(profile.os_family);
    tracing::debug!("{}", plan.summary());
    plan
}

fn repo_source(profile: &PlatformProfile, location: &str) -> Option<RepoSource> {
    match profile.package_provider? {
        PackageProvider::Apt => Some(RepoSource::Apt {
            location: location.to_string(),
            release: profile.repo_release.clone(),
            repos: profile.repo_channel.to_string(),
            key_url: repo::GPG_KEY_URL.to_string(),
        }),
        PackageProvider::Yum => Some(RepoSource::Yum {
            baseurl: location.to_string(),
            gpgkey: repo::GPG_KEY_URL.to_string(),
        }),
        PackageProvider::Chocolatey => None,
    }
}

#[derive(Default)]
struct PlanBuilder {
    actions: Vec<ProvisionAction>,
    edges: Vec<Edge>,
}

impl PlanBuilder {
    fn push(&mut self, action: ProvisionAction) -> usize {
        self.actions.push(action);
        self.actions.len() - 1
    }

    fn edge(&mut self, from: usize, to: usize, kind: EdgeKind) {
        self.edges.push(Edge { from, to, kind });
    }

    fn finish(self, os_family: OsFamily) -> ProvisionPlan {
        ProvisionPlan {
            actions: self.actions,
            edges: self.edges,
            os_family,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{PluginSet, PluginTree, Table, Value, render, render_fragment};
    use crate::facts::HostFacts;
    use crate::logic::resolver::resolve;
    use crate::types::PluginCategory;

    fn host(family: &str, name: &str) -> HostFacts {
        HostFacts {
            os_family: family.to_string(),
            os_name: name.to_string(),
            os_major_version: "12".to_string(),
            os_codename: Some("bookworm".to_string()),
            architecture: "x86_64".to_string(),
            kernel: "Linux".to_string(),
        }
    }

    fn cpu_document() -> ConfigDocument {
        let tree = PluginTree {
            inputs: PluginSet::new().with_instance("cpu", Table::new().with("percpu", true)),
            ..PluginTree::default()
        };
        render(&tree).unwrap()
    }

    fn plan_for(facts: &HostFacts, params: &ProvisionParams) -> ProvisionPlan {
        let profile = resolve(facts, params).unwrap();
        calculate_provision_plan(&profile, params, &cpu_document(), &[])
    }

    #[test]
    fn test_debian_plan_registers_apt_repo() {
        let plan = plan_for(&host("Debian", "Debian"), &ProvisionParams::default());

        match plan.repository_registration() {
            Some(ProvisionAction::RegisterRepository { name, source, refresh_index }) => {
                assert_eq!(name, "influxdata");
                assert!(*refresh_index);
                assert_eq!(
                    *source,
                    RepoSource::Apt {
                        location: "https://repos.influxdata.com/debian".to_string(),
                        release: Some("bookworm".to_string()),
                        repos: "stable".to_string(),
                        key_url: repo::GPG_KEY_URL.to_string(),
                    }
                );
            }
            other => panic!("expected repository registration, got {other:?}"),
        }
        assert_eq!(plan.actions.len(), 5);
    }

    #[test]
    fn test_repo_before_package_before_config() {
        let plan = plan_for(&host("RedHat", "CentOS"), &ProvisionParams::default());
        let repo = plan
            .position(|a| matches!(a, ProvisionAction::RegisterRepository { .. }))
            .unwrap();
        let package = plan
            .position(|a| matches!(a, ProvisionAction::InstallPackage { .. }))
            .unwrap();
        let config = plan
            .position(|a| matches!(a, ProvisionAction::WriteFile { .. }))
            .unwrap();
        let service = plan
            .position(|a| matches!(a, ProvisionAction::EnsureService { .. }))
            .unwrap();

        assert!(plan.is_ordered_before(repo, package));
        assert!(plan.is_ordered_before(package, config));
        assert!(plan.is_ordered_before(repo, service));
        assert!(!plan.is_ordered_before(service, repo));
        assert!(plan.edges.contains(&Edge { from: config, to: service, kind: EdgeKind::Notify }));
    }

    #[test]
    fn test_manage_repo_false_skips_registration() {
        let params = ProvisionParams {
            manage_repo: false,
            ..ProvisionParams::default()
        };
        let plan = plan_for(&host("RedHat", "CentOS"), &params);
        assert!(plan.repository_registration().is_none());
        match plan.install() {
            Some(ProvisionAction::InstallPackage { externally_sourced, provider, .. }) => {
                assert!(*externally_sourced);
                assert_eq!(*provider, PackageProvider::Yum);
            }
            other => panic!("expected package install, got {other:?}"),
        }
    }

    #[test]
    fn test_suse_plan_installs_archive() {
        let plan = plan_for(&host("Suse", "SLES"), &ProvisionParams::default());
        assert!(plan.repository_registration().is_none());
        assert_eq!(
            plan.install(),
            Some(&ProvisionAction::InstallArchive {
                url: "https://dl.influxdata.com/telegraf/releases/telegraf-1.15.2_linux_amd64.tar.gz"
                    .to_string(),
                download_path: PathBuf::from("/tmp/telegraf.tar.gz"),
                install_dir: PathBuf::from("/opt/telegraf"),
            })
        );
    }

    #[test]
    fn test_windows_plan_has_no_modes_or_registration() {
        let mut windows = host("windows", "windows");
        windows.kernel = "windows".to_string();
        let plan = plan_for(&windows, &ProvisionParams::default());

        assert!(plan.repository_registration().is_none());
        for action in &plan.actions {
            match action {
                ProvisionAction::WriteFile { mode, .. }
                | ProvisionAction::EnsureDirectory { mode, .. } => assert_eq!(*mode, None),
                ProvisionAction::EnsureService { restart, .. } => assert_eq!(*restart, None),
                _ => {}
            }
        }
        match plan.install() {
            Some(ProvisionAction::InstallPackage { provider, externally_sourced, .. }) => {
                assert_eq!(*provider, PackageProvider::Chocolatey);
                assert!(*externally_sourced);
            }
            other => panic!("expected chocolatey install, got {other:?}"),
        }
    }

    #[test]
    fn test_preinstalled_plan_starts_with_directory() {
        let mut params = ProvisionParams::default();
        params.overrides.install_method = Some(InstallMethod::Preinstalled);
        let plan = plan_for(&host("Debian", "Debian"), &params);

        assert!(plan.install().is_none());
        assert!(plan.repository_registration().is_none());
        assert!(matches!(plan.actions[0], ProvisionAction::EnsureDirectory { purge: false, .. }));
    }

    #[test]
    fn test_drop_ins_written_under_config_dir() {
        let params = ProvisionParams::default();
        let profile = resolve(&host("Debian", "Debian"), &params).unwrap();
        let fragment = DropInFile {
            file_name: "nginx.conf".to_string(),
            document: render_fragment(
                PluginCategory::Inputs,
                "nginx",
                &[Table::new().with("urls", vec![Value::from("http://localhost/status")])],
            )
            .unwrap(),
        };
        let plan = calculate_provision_plan(&profile, &params, &cpu_document(), &[fragment]);

        let paths: Vec<_> = plan
            .file_writes()
            .filter_map(|a| match a {
                ProvisionAction::WriteFile { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/etc/telegraf/telegraf.conf"),
                PathBuf::from("/etc/telegraf/telegraf.d/nginx.conf"),
            ]
        );

        let directory = plan
            .position(|a| matches!(a, ProvisionAction::EnsureDirectory { .. }))
            .unwrap();
        let service = plan.actions.len() - 1;
        for (i, action) in plan.actions.iter().enumerate() {
            if matches!(action, ProvisionAction::WriteFile { .. }) {
                assert!(plan.is_ordered_before(directory, i));
                assert!(plan.edges.contains(&Edge { from: i, to: service, kind: EdgeKind::Notify }));
            }
        }
    }

    #[test]
    fn test_config_content_is_full_document() {
        let plan = plan_for(&host("Debian", "Debian"), &ProvisionParams::default());
        let content = plan
            .file_writes()
            .find_map(|a| match a {
                ProvisionAction::WriteFile { content, .. } => Some(content.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(content, cpu_document().to_string());
        assert!(content.contains("[[inputs.cpu]]\n  percpu = true\n"));
    }

    #[test]
    fn test_summary_lists_actions() {
        let plan = plan_for(&host("RedHat", "CentOS"), &ProvisionParams::default());
        let summary = plan.summary();
        assert!(summary.starts_with("Provision Plan: redhat-like"));
        assert!(summary.contains("1. RegisterRepository(influxdata, yum"));
        assert!(summary.contains("~>"));
    }
}
