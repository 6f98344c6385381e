//! telegraf-provision library
//!
//! Decides how the Telegraf agent is installed on a host and renders its
//! configuration. Two independent cores feed one plan:
//!
//! - `logic::resolver` maps host facts and parameters to a `PlatformProfile`
//! - `document` turns a `PluginTree` into a deterministic TOML document
//! - `engine::plan` combines both into an ordered `ProvisionPlan`

pub mod cli;
pub mod document;
pub mod engine;
pub mod error;
pub mod facts;
pub mod files;
pub mod installer;
pub mod logic;
pub mod params;
pub mod profiles;
pub mod types;

pub use error::{ProvisionError, Result};
pub use facts::HostFacts;
pub use params::{DropInParams, PlatformOverrides, ProvisionParams};
pub use profiles::PlatformDefaults;

// Platform resolver
pub use logic::resolver::{PlatformProfile, classify_os, resolve, resolve_with_defaults};

// Config document serializer
pub use document::{ConfigDocument, PluginSet, PluginTree, Table, Value, render, render_fragment};

// Plan engine
pub use engine::plan::{
    DropInFile, Edge, EdgeKind, ProvisionAction, ProvisionPlan, RepoSource,
    calculate_provision_plan,
};
pub use files::{ApplyReport, apply_file_actions};
pub use installer::{Provisioning, build_plan, build_plan_with_defaults};

pub use types::{
    Architecture, FileMode, InstallMethod, OsFamily, PackageEnsure, PackageProvider,
    PluginCategory, RepoChannel,
};
