//! Provisioning parameters: what the caller wants installed and configured.
//!
//! Parameters are loaded from JSON. Plugin descriptions are kept as raw JSON
//! until `plugin_tree` converts them, so that conversion failures surface as
//! `UnsupportedValueType` with a key path rather than as a parse error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::document::{AgentSettings, PluginSet, PluginTree, Table};
use crate::error::{self, ProvisionError};
use crate::types::{FileMode, InstallMethod, PackageEnsure, PluginCategory, RepoChannel};

/// Caller overrides for resolved platform fields.
///
/// Every field left `None` keeps the resolved default. Setting a field the
/// resolved platform does not have is rejected by the resolver, and an
/// unknown key is rejected at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformOverrides {
    pub install_method: Option<InstallMethod>,
    #[serde(alias = "repo_location")]
    pub repo_base_url: Option<String>,
    #[serde(alias = "archive_location")]
    pub archive_url: Option<String>,
    pub archive_install_dir: Option<String>,
    pub config_file_path: Option<String>,
    #[serde(alias = "config_folder")]
    pub config_dir_path: Option<String>,
    pub config_file_mode: Option<FileMode>,
    #[serde(alias = "config_folder_mode")]
    pub config_dir_mode: Option<FileMode>,
    pub service_restart: Option<String>,
}

/// A plugin rendered into its own file in the drop-in directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropInParams {
    /// File stem; the fragment is written to `<config_dir>/<name>.conf`
    pub name: String,
    #[serde(default)]
    pub category: PluginCategory,
    /// Plugin type, e.g. `nginx` for `[[inputs.nginx]]`
    pub plugin: String,
    /// One instance object, a list of instance objects, or nothing for a
    /// single all-defaults instance
    #[serde(default)]
    pub options: serde_json::Value,
}

impl DropInParams {
    pub fn file_name(&self) -> String {
        format!("{}.conf", self.name)
    }

    /// Instance tables of this fragment.
    pub fn instances(&self) -> error::Result<Vec<Table>> {
        let path = format!("drop_ins.{}", self.name);
        match &self.options {
            serde_json::Value::Null => Ok(vec![Table::new()]),
            serde_json::Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Table::from_json(item, &format!("{path}[{i}]")))
                .collect(),
            other => Ok(vec![Table::from_json(other, &path)?]),
        }
    }

    fn validate_name(&self) -> error::Result<()> {
        let name = self.name.trim();
        if name.is_empty() || name == "." || name == ".." {
            return Err(ProvisionError::invalid_parameter(
                "drop_ins.name",
                format!("'{}' is not a usable file name", self.name),
            ));
        }
        if name.contains(['/', '\\', '\0']) {
            return Err(ProvisionError::invalid_parameter(
                "drop_ins.name",
                format!("'{}' must not contain path separators", self.name),
            ));
        }
        if self.plugin.trim().is_empty() {
            return Err(ProvisionError::invalid_parameter(
                format!("drop_ins.{}.plugin", self.name),
                "plugin type must be specified",
            ));
        }
        Ok(())
    }
}

/// Full parameter set of one provisioning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionParams {
    /// `present`, `latest`, or an exact package version
    pub ensure: PackageEnsure,
    /// Register the upstream repository before installing the package
    pub manage_repo: bool,
    #[serde(alias = "repo_type")]
    pub repo_channel: Option<String>,
    pub overrides: PlatformOverrides,
    #[serde(flatten)]
    pub agent: AgentSettings,
    pub inputs: serde_json::Value,
    pub outputs: serde_json::Value,
    pub drop_ins: Vec<DropInParams>,
}

impl Default for ProvisionParams {
    fn default() -> Self {
        Self {
            ensure: PackageEnsure::Present,
            manage_repo: true,
            repo_channel: None,
            overrides: PlatformOverrides::default(),
            agent: AgentSettings::default(),
            inputs: serde_json::Value::Null,
            outputs: serde_json::Value::Null,
            drop_ins: Vec::new(),
        }
    }
}

impl ProvisionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load parameters from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read parameters from {:?}", path.as_ref()))?;

        let params: Self =
            serde_json::from_str(&content).context("Failed to parse parameters JSON")?;

        Ok(params)
    }

    /// Save parameters to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize parameters to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write parameters to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Requested channel, `stable` when unset.
    pub fn repo_channel(&self) -> error::Result<RepoChannel> {
        match &self.repo_channel {
            Some(channel) => RepoChannel::parse_channel(channel),
            None => Ok(RepoChannel::default()),
        }
    }

    /// Convert the raw plugin descriptions into a plugin tree.
    pub fn plugin_tree(&self) -> error::Result<PluginTree> {
        Ok(PluginTree {
            agent: self.agent.clone(),
            inputs: PluginSet::from_json(&self.inputs, PluginCategory::Inputs)?,
            outputs: PluginSet::from_json(&self.outputs, PluginCategory::Outputs)?,
        })
    }

    /// Platform-independent validation: channel, plugin values and drop-ins.
    ///
    /// Platform-specific checks (inapplicable overrides, architecture) happen
    /// in the resolver.
    pub fn validate(&self) -> error::Result<()> {
        self.repo_channel()?;
        crate::document::render(&self.plugin_tree()?)?;

        let mut seen = HashSet::new();
        for drop_in in &self.drop_ins {
            drop_in.validate_name()?;
            if !seen.insert(drop_in.name.as_str()) {
                return Err(ProvisionError::invalid_parameter(
                    "drop_ins.name",
                    format!("duplicate drop-in '{}'", drop_in.name),
                ));
            }
            crate::document::render_fragment(drop_in.category, &drop_in.plugin, &drop_in.instances()?)?;
        }
        Ok(())
    }
}
