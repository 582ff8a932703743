#![forbid(unsafe_code)]

//! Binding policy configuration.
//!
//! [`BindingConfig`] is plain data. It can be built in code, parsed from JSON,
//! parsed from TOML (with the `policy-config` feature), or read from the
//! environment:
//!
//! | Variable | Values | Field |
//! |----------|--------|-------|
//! | `FIELDBIND_ABSENCE` | `missing`, `blank` | [`BindingConfig::absence`] |
//! | `FIELDBIND_HYDRATE` | `1`/`0`, `true`/`false`, `on`/`off` | [`BindingConfig::hydrate_defaults`] |
//!
//! Unknown keys are rejected so typos surface instead of silently keeping
//! defaults.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::ConfigLoadError;
use crate::value::AbsencePolicy;

/// Environment variable selecting the [`AbsencePolicy`].
pub const ENV_ABSENCE: &str = "FIELDBIND_ABSENCE";
/// Environment variable toggling default hydration.
pub const ENV_HYDRATE: &str = "FIELDBIND_HYDRATE";

/// Policy knobs shared by every binding created from one binder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
    /// When a stored value counts as absent.
    pub absence: AbsencePolicy,
    /// Write the default back into the store when a field is found absent.
    pub hydrate_defaults: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            absence: AbsencePolicy::Missing,
            hydrate_defaults: true,
        }
    }
}

impl BindingConfig {
    /// Set the absence policy.
    #[must_use]
    pub fn with_absence(mut self, absence: AbsencePolicy) -> Self {
        self.absence = absence;
        self
    }

    /// Enable or disable default hydration.
    #[must_use]
    pub fn with_hydrate_defaults(mut self, hydrate: bool) -> Self {
        self.hydrate_defaults = hydrate;
        self
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// [`ConfigLoadError::Json`] on malformed input or unknown keys.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigLoadError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigLoadError::Toml`] on malformed input or unknown keys.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigLoadError> {
        toml::from_str(input).map_err(|err| ConfigLoadError::Toml(err.to_string()))
    }

    /// Defaults overridden by `FIELDBIND_ABSENCE` and `FIELDBIND_HYDRATE`.
    ///
    /// # Errors
    ///
    /// [`ConfigLoadError::InvalidEnv`] if a variable is set to an unknown value.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let absence = env::var(ENV_ABSENCE).ok();
        let hydrate = env::var(ENV_HYDRATE).ok();
        Self::from_env_values(absence.as_deref(), hydrate.as_deref())
    }

    /// [`from_env`](Self::from_env) with the variable values passed in.
    ///
    /// # Errors
    ///
    /// [`ConfigLoadError::InvalidEnv`] if a value is not recognized.
    pub fn from_env_values(
        absence: Option<&str>,
        hydrate: Option<&str>,
    ) -> Result<Self, ConfigLoadError> {
        let mut config = Self::default();
        if let Some(raw) = absence {
            config.absence =
                AbsencePolicy::from_name(raw).ok_or_else(|| ConfigLoadError::InvalidEnv {
                    var: ENV_ABSENCE,
                    value: raw.to_string(),
                })?;
        }
        if let Some(raw) = hydrate {
            config.hydrate_defaults = parse_flag(raw).ok_or_else(|| ConfigLoadError::InvalidEnv {
                var: ENV_HYDRATE,
                value: raw.to_string(),
            })?;
        }
        Ok(config)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BindingConfig::default();
        assert_eq!(config.absence, AbsencePolicy::Missing);
        assert!(config.hydrate_defaults);
    }

    #[test]
    fn builder_overrides() {
        let config = BindingConfig::default()
            .with_absence(AbsencePolicy::Blank)
            .with_hydrate_defaults(false);
        assert_eq!(config.absence, AbsencePolicy::Blank);
        assert!(!config.hydrate_defaults);
    }

    #[test]
    fn json_partial_document_keeps_defaults() {
        let config = BindingConfig::from_json_str(r#"{ "absence": "blank" }"#).unwrap();
        assert_eq!(config.absence, AbsencePolicy::Blank);
        assert!(config.hydrate_defaults);
    }

    #[test]
    fn json_rejects_unknown_keys() {
        let err = BindingConfig::from_json_str(r#"{ "absense": "blank" }"#).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Json(_)));

        // Transformer panics are always caught; there is no switch for it.
        let err = BindingConfig::from_json_str(r#"{ "catch_panics": false }"#).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Json(_)));
    }

    #[cfg(feature = "policy-config")]
    #[test]
    fn toml_document() {
        let config = BindingConfig::from_toml_str(
            "absence = \"blank\"\nhydrate_defaults = false\n",
        )
        .unwrap();
        assert_eq!(config.absence, AbsencePolicy::Blank);
        assert!(!config.hydrate_defaults);
    }

    #[test]
    fn env_values_unset_gives_defaults() {
        let config = BindingConfig::from_env_values(None, None).unwrap();
        assert_eq!(config, BindingConfig::default());
    }

    #[test]
    fn env_values_override() {
        let config = BindingConfig::from_env_values(Some("blank"), Some("off")).unwrap();
        assert_eq!(config.absence, AbsencePolicy::Blank);
        assert!(!config.hydrate_defaults);
    }

    #[test]
    fn env_values_reject_garbage() {
        let err = BindingConfig::from_env_values(Some("falsy"), None).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidEnv { var: ENV_ABSENCE, .. }
        ));

        let err = BindingConfig::from_env_values(None, Some("maybe")).unwrap_err();
        assert_eq!(err.to_string(), "invalid value \"maybe\" for FIELDBIND_HYDRATE");
    }
}
