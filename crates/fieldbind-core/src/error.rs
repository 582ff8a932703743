#![forbid(unsafe_code)]

//! Error taxonomy.
//!
//! | Error | Raised by | Propagation |
//! |-------|-----------|-------------|
//! | [`ConfigurationError`] | `bind`, [`FieldPath::parse`] | Returned to the caller, never swallowed |
//! | [`UpdateTransformError`] | an updater's transformer | Reported to a diagnostic sink, write skipped |
//! | [`WriteRejected`] | a store's `write` | Reported to a diagnostic sink |
//! | [`ConfigLoadError`] | [`BindingConfig`](crate::BindingConfig) loaders | Returned to the caller |

use crate::capability::Capabilities;
use crate::path::FieldPath;

/// Static misuse of a binding: bad path or an under-capable store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// The path was empty or whitespace-only.
    #[error("field path must not be empty or whitespace-only (got {raw:?})")]
    EmptyPath { raw: String },
    /// A `.`-separated segment was empty or whitespace-only.
    #[error("field path {raw:?} has an empty segment")]
    EmptySegment { raw: String },
    /// The store lacks capabilities a binding needs.
    #[error("field store is missing required capabilities: {missing}")]
    MissingCapability { missing: Capabilities },
}

/// A transformer passed to an updater failed; the write was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateTransformError {
    /// The transformer returned an error.
    #[error("update of `{path}` failed: {message}")]
    Failed { path: FieldPath, message: String },
    /// The transformer panicked.
    #[error("update of `{path}` panicked: {message}")]
    Panicked { path: FieldPath, message: String },
}

impl UpdateTransformError {
    /// The field whose update was skipped.
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        match self {
            Self::Failed { path, .. } | Self::Panicked { path, .. } => path,
        }
    }

    /// The failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Failed { message, .. } | Self::Panicked { message, .. } => message,
        }
    }
}

/// A store refused a write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("store rejected write to `{path}`: {reason}")]
pub struct WriteRejected {
    pub path: FieldPath,
    pub reason: String,
}

impl WriteRejected {
    /// Build a rejection for `path`.
    pub fn new(path: FieldPath, reason: impl Into<String>) -> Self {
        Self {
            path,
            reason: reason.into(),
        }
    }
}

/// Failure to load a [`BindingConfig`](crate::BindingConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// JSON input did not match the config schema.
    #[error("invalid binding config JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// TOML input did not match the config schema.
    #[error("invalid binding config TOML: {0}")]
    Toml(String),
    /// An environment variable held an unrecognized value.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}
