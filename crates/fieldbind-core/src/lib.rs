#![forbid(unsafe_code)]

//! Core types shared by fieldbind crates.
//!
//! - [`FieldPath`]: validated, dot-delimited address of one slot in a store.
//! - [`Capabilities`]: what a store can do (read, write, subscribe).
//! - [`FieldValue`] and [`AbsencePolicy`]: when a stored value counts as absent.
//! - [`BindingConfig`]: policy knobs for bindings, loadable from JSON, TOML, or
//!   the environment.
//! - [`error`]: the error taxonomy (configuration misuse, swallowed update
//!   failures, rejected writes).

pub mod capability;
pub mod config;
pub mod error;
pub mod path;
pub mod value;

pub use capability::Capabilities;
pub use config::BindingConfig;
pub use error::{ConfigLoadError, ConfigurationError, UpdateTransformError, WriteRejected};
pub use path::FieldPath;
pub use value::{AbsencePolicy, FieldValue};
