//! Platform defaults.
//!
//! All platform knowledge that is data rather than logic lives here: the
//! agent name, repository and archive locations, native config paths and
//! permission modes. The resolver receives a `PlatformDefaults` value
//! explicitly, so tests can substitute any of these without global state.
//!
//! # Defaults by family
//!
//! | Family      | Install    | Config file                               | Modes       |
//! |-------------|------------|-------------------------------------------|-------------|
//! | debian-like | repository | `/etc/telegraf/telegraf.conf`             | 0640 / 0770 |
//! | redhat-like | repository | `/etc/telegraf/telegraf.conf`             | 0640 / 0770 |
//! | suse-like   | archive    | `/etc/telegraf/telegraf.conf`             | 0640 / 0770 |
//! | windows     | repository | `C:/Program Files/telegraf/telegraf.conf` | none        |

use serde::{Deserialize, Serialize};

use crate::types::{Architecture, FileMode};

/// Name of the agent: package name, service name and config file stem.
pub const AGENT_NAME: &str = "telegraf";

/// Repository registered with the host package manager.
pub mod repo {
    /// Name of the apt source / yum repository
    pub const NAME: &str = "influxdata";
    /// Base URL shared by the apt and yum repositories
    pub const BASE_URL: &str = "https://repos.influxdata.com/";
    /// Signing key for both repositories
    pub const GPG_KEY_URL: &str = "https://repos.influxdata.com/influxdata-archive_compat.key";
}

/// Release tarballs for hosts without first-class repository support.
pub mod archive {
    /// Release fetched when the caller does not supply an archive URL
    pub const VERSION: &str = "1.15.2";
    pub const DOWNLOAD_BASE: &str = "https://dl.influxdata.com/telegraf/releases/";
    pub const INSTALL_DIR: &str = "/opt/telegraf";
    /// Where the downloaded tarball is staged before extraction
    pub const DOWNLOAD_PATH: &str = "/tmp/telegraf.tar.gz";
}

/// Default locations, modes and URLs used when resolving a platform profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformDefaults {
    pub agent_name: String,
    pub repo_base_url: String,
    pub archive_version: String,
    pub archive_download_base: String,
    pub archive_install_dir: String,
    pub posix_config_root: String,
    pub windows_config_root: String,
    pub config_file_mode: FileMode,
    pub config_dir_mode: FileMode,
}

impl Default for PlatformDefaults {
    fn default() -> Self {
        Self {
            agent_name: AGENT_NAME.to_string(),
            repo_base_url: repo::BASE_URL.to_string(),
            archive_version: archive::VERSION.to_string(),
            archive_download_base: archive::DOWNLOAD_BASE.to_string(),
            archive_install_dir: archive::INSTALL_DIR.to_string(),
            posix_config_root: "/etc".to_string(),
            windows_config_root: "C:/Program Files".to_string(),
            config_file_mode: FileMode::new(0o640),
            config_dir_mode: FileMode::new(0o770),
        }
    }
}

impl PlatformDefaults {
    /// `<root>/<agent>/<agent>.conf`
    pub fn config_file_path(&self, windows: bool) -> String {
        format!("{}/{}.conf", self.agent_dir(windows), self.agent_name)
    }

    /// `<root>/<agent>/<agent>.d`
    pub fn config_dir_path(&self, windows: bool) -> String {
        format!("{}/{}.d", self.agent_dir(windows), self.agent_name)
    }

    /// Release tarball URL for a linux architecture.
    pub fn archive_url(&self, arch: Architecture) -> String {
        format!(
            "{}{}-{}_linux_{}.tar.gz",
            self.archive_download_base, self.agent_name, self.archive_version, arch
        )
    }

    /// Reload command sent after config changes on POSIX hosts.
    pub fn service_restart(&self) -> String {
        format!("pkill -HUP {}", self.agent_name)
    }

    fn agent_dir(&self, windows: bool) -> String {
        let root = if windows {
            &self.windows_config_root
        } else {
            &self.posix_config_root
        };
        format!("{}/{}", root.trim_end_matches('/'), self.agent_name)
    }
}
