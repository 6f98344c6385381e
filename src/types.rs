//! Type-safe configuration types for telegraf-provision
//!
//! Platform buckets, install methods, channels and modes are enums or
//! newtypes instead of strings so that every resolution branch is an
//! exhaustive match.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

use crate::error::{ProvisionError, Result};

/// Normalized OS family bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "kebab-case")]
pub enum OsFamily {
    #[strum(serialize = "debian-like")]
    DebianLike,
    #[strum(serialize = "redhat-like")]
    RedhatLike,
    #[strum(serialize = "suse-like")]
    SuseLike,
    #[strum(serialize = "windows")]
    Windows,
}

impl OsFamily {
    /// Every family except Windows follows POSIX path and mode conventions
    pub fn is_posix(self) -> bool {
        !matches!(self, Self::Windows)
    }
}

/// How the agent binaries end up on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InstallMethod {
    /// Package from a registered (or pre-existing) repository
    Repository,
    /// Downloaded tarball extracted into an install directory
    Archive,
    /// Already present; nothing to install
    Preinstalled,
}

/// Repository release channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RepoChannel {
    #[default]
    Stable,
    Testing,
    Unstable,
}

impl RepoChannel {
    /// Parse a caller-supplied channel, mapping failures to `InvalidRepoChannel`
    pub fn parse_channel(value: &str) -> Result<Self> {
        value
            .parse()
            .map_err(|_| ProvisionError::InvalidRepoChannel(value.to_string()))
    }
}

/// Native package manager used for repository installs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PackageProvider {
    Apt,
    Yum,
    Chocolatey,
}

/// CPU architecture as named in release archive file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Architecture {
    Amd64,
    Arm64,
    Armhf,
    I386,
}

impl Architecture {
    /// Map an architecture fact (`x86_64`, `aarch64`, `amd64`, ...) to an archive architecture
    pub fn from_fact(fact: &str) -> Result<Self> {
        match fact.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Ok(Self::Amd64),
            "aarch64" | "arm64" => Ok(Self::Arm64),
            "armv7l" | "armv7" | "armhf" => Ok(Self::Armhf),
            "i386" | "i686" | "x86" => Ok(Self::I386),
            _ => Err(ProvisionError::UnsupportedArchitecture(fact.to_string())),
        }
    }
}

/// Top-level plugin category in the rendered document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PluginCategory {
    #[default]
    Inputs,
    Outputs,
}

/// POSIX permission bits, written and parsed as a four digit octal string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileMode(u32);

impl FileMode {
    pub const fn new(bits: u32) -> Self {
        Self(bits & 0o7777)
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl FromStr for FileMode {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim();
        let valid = (3..=4).contains(&digits.len()) && digits.chars().all(|c| ('0'..='7').contains(&c));
        if !valid {
            return Err(ProvisionError::invalid_parameter(
                "mode",
                format!("'{s}' is not a 3 or 4 digit octal mode"),
            ));
        }
        u32::from_str_radix(digits, 8)
            .map(Self::new)
            .map_err(|e| ProvisionError::invalid_parameter("mode", e.to_string()))
    }
}

impl TryFrom<String> for FileMode {
    type Error = ProvisionError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FileMode> for String {
    fn from(mode: FileMode) -> Self {
        mode.to_string()
    }
}

/// Desired package state: `present`/`installed`, `latest`, or an exact version
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PackageEnsure {
    #[default]
    Present,
    Latest,
    Version(String),
}

impl From<String> for PackageEnsure {
    fn from(value: String) -> Self {
        match value.trim() {
            "" | "present" | "installed" => Self::Present,
            "latest" => Self::Latest,
            version => Self::Version(version.to_string()),
        }
    }
}

impl From<PackageEnsure> for String {
    fn from(ensure: PackageEnsure) -> Self {
        ensure.to_string()
    }
}

impl fmt::Display for PackageEnsure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Latest => write!(f, "latest"),
            Self::Version(v) => write!(f, "{v}"),
        }
    }
}
