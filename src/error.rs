//! Error handling module for telegraf-provision
//!
//! Every error in this crate is raised while resolving the platform profile or
//! rendering the config document, before any collaborator request is produced.
//! None of them is recoverable inside the crate: they surface to the caller
//! with the offending field or key path attached.

use thiserror::Error;

/// Main error type for provisioning runs
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The OS family (and OS name) did not map to a supported bucket
    #[error("Unsupported platform: os family '{family}' (os name '{name}')")]
    UnsupportedPlatform { family: String, name: String },

    /// Archive installs need a known CPU architecture
    #[error("Unsupported architecture: '{0}'")]
    UnsupportedArchitecture(String),

    /// Repository channel outside stable/testing/unstable
    #[error("Invalid repository channel '{0}': expected one of stable, testing, unstable")]
    InvalidRepoChannel(String),

    /// An override was given for a field the resolved platform does not have
    #[error("Option '{option}' is not applicable on {platform}")]
    InapplicableOption { option: String, platform: String },

    /// The plugin tree holds a value shape the renderer cannot express
    #[error("Unsupported value at '{path}': {reason}")]
    UnsupportedValueType { path: String, reason: String },

    /// Malformed parameter (bad mode string, drop-in name with separators, ...)
    #[error("Invalid parameter '{field}': {reason}")]
    InvalidParameter { field: String, reason: String },

    /// IO errors while reading inputs or applying file actions
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Create an inapplicable-option error
    pub fn inapplicable(option: impl Into<String>, platform: impl Into<String>) -> Self {
        Self::InapplicableOption {
            option: option.into(),
            platform: platform.into(),
        }
    }

    /// Create an unsupported-value error for a dotted key path
    pub fn unsupported_value(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedValueType {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-parameter error
    pub fn invalid_parameter(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedPlatform { .. } => "UnsupportedPlatform",
            Self::UnsupportedArchitecture(_) => "UnsupportedArchitecture",
            Self::InvalidRepoChannel(_) => "InvalidRepoChannel",
            Self::InapplicableOption { .. } => "InapplicableOption",
            Self::UnsupportedValueType { .. } => "UnsupportedValueType",
            Self::InvalidParameter { .. } => "InvalidParameter",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
        }
    }
}
