//! Host fact detection
//!
//! Collects the handful of OS facts the platform resolver needs: family,
//! name, major version, codename, architecture and kernel.
//!
//! # Design
//!
//! - **Never panics**: missing or unreadable `/etc/os-release` logs a warning
//!   and leaves the family empty, which the resolver then rejects
//! - **No shelling out**: parsing is done on the file contents directly
//! - **Injectable**: facts can also be loaded from JSON (facter-style keys
//!   are accepted), so resolution never depends on the machine it runs on

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

const OS_RELEASE_PATH: &str = "/etc/os-release";

/// OS facts consumed by the platform resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FacterFacts")]
pub struct HostFacts {
    pub os_family: String,
    pub os_name: String,
    pub os_major_version: String,
    pub os_codename: Option<String>,
    pub architecture: String,
    pub kernel: String,
}

/// Wire shape of a facts file. Facter dumps carry both `architecture` and
/// `hardwaremodel`; the latter only fills an empty architecture.
#[derive(Default, Deserialize)]
#[serde(default)]
struct FacterFacts {
    #[serde(alias = "osfamily")]
    os_family: String,
    #[serde(alias = "operatingsystem")]
    os_name: String,
    #[serde(alias = "operatingsystemmajrelease")]
    os_major_version: String,
    #[serde(alias = "lsbdistcodename")]
    os_codename: Option<String>,
    architecture: String,
    hardwaremodel: Option<String>,
    kernel: String,
}

impl From<FacterFacts> for HostFacts {
    fn from(raw: FacterFacts) -> Self {
        let architecture = match raw.hardwaremodel {
            Some(model) if raw.architecture.trim().is_empty() => model,
            _ => raw.architecture,
        };
        Self {
            os_family: raw.os_family,
            os_name: raw.os_name,
            os_major_version: raw.os_major_version,
            os_codename: raw.os_codename,
            architecture,
            kernel: raw.kernel,
        }
    }
}

impl HostFacts {
    /// Detect facts of the running host.
    ///
    /// Architecture and kernel come from the compile target. On Linux the
    /// distribution facts are read from `/etc/os-release`; on Windows the
    /// family is `windows` and there is nothing else to read.
    pub fn detect() -> Self {
        let architecture = std::env::consts::ARCH.to_string();
        let kernel = std::env::consts::OS.to_string();

        let facts = if kernel == "windows" {
            Self {
                os_family: "windows".to_string(),
                os_name: "windows".to_string(),
                architecture,
                kernel,
                ..Self::default()
            }
        } else {
            match fs::read_to_string(OS_RELEASE_PATH) {
                Ok(content) => Self {
                    architecture,
                    kernel,
                    ..parse_os_release(&content)
                },
                Err(e) => {
                    tracing::warn!("Could not read {}: {}", OS_RELEASE_PATH, e);
                    Self {
                        architecture,
                        kernel,
                        ..Self::default()
                    }
                }
            }
        };

        tracing::info!("Host facts detected: {}", facts);
        facts
    }

    /// Load facts from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read facts from {:?}", path.as_ref()))?;

        let facts: Self = serde_json::from_str(&content).context("Failed to parse facts JSON")?;

        Ok(facts)
    }
}

impl fmt::Display for HostFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "family={}, name={}, major={}, arch={}, kernel={}",
            self.os_family, self.os_name, self.os_major_version, self.architecture, self.kernel
        )
    }
}

// ============================================================================
// os-release parsing
// ============================================================================

/// Parse the contents of an os-release file into distribution facts.
///
/// Architecture and kernel are left empty; the caller fills them in.
pub fn parse_os_release(content: &str) -> HostFacts {
    let mut id = String::new();
    let mut id_like = String::new();
    let mut version_id = String::new();
    let mut codename = None;

    for line in content.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
        match key {
            "ID" => id = value,
            "ID_LIKE" => id_like = value,
            "VERSION_ID" => version_id = value,
            "VERSION_CODENAME" if !value.is_empty() => codename = Some(value),
            _ => {}
        }
    }

    let os_family = family_from_ids(&id, &id_like).unwrap_or_default().to_string();
    let os_major_version = version_id.split('.').next().unwrap_or_default().to_string();

    HostFacts {
        os_family,
        os_name: id,
        os_major_version,
        os_codename: codename,
        ..HostFacts::default()
    }
}

/// Facter-style family name for an os-release `ID` / `ID_LIKE` pair.
fn family_from_ids(id: &str, id_like: &str) -> Option<&'static str> {
    std::iter::once(id)
        .chain(id_like.split_whitespace())
        .find_map(|candidate| match candidate {
            "debian" | "ubuntu" => Some("Debian"),
            "rhel" | "fedora" | "centos" => Some("RedHat"),
            "suse" | "sles" | "opensuse" => Some("Suse"),
            _ if candidate.starts_with("opensuse") => Some("Suse"),
            _ => None,
        })
}
