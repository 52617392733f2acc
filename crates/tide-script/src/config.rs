//! Configuration for the registry, logging and the host's built-in evaluators.
//!
//! Loaded from TOML, then optionally overridden from the environment:
//!
//! - `TIDE_SCRIPT_ALLOW_DUPLICATES` (`true`/`false`)
//! - `TIDE_SCRIPT_LOG_JSON` (`true`/`false`)
//! - `TIDE_SCRIPT_LOG_LEVEL` (e.g. `debug`)
//! - `TIDE_SCRIPT_APP_ROOT` (directory backing `app://` URLs)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Registry behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// When false, adding a handle that is already registered is a no-op.
    pub allow_duplicates: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allow_duplicates: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Parsed level, falling back to INFO for unknown names.
    pub fn tracing_level(&self) -> tracing::Level {
        self.level.parse().unwrap_or(tracing::Level::INFO)
    }

    /// Apply command-line switches: `verbose` forces DEBUG, `json` can only
    /// turn JSON output on.
    pub fn with_overrides(mut self, verbose: bool, json: bool) -> Self {
        if verbose {
            self.level = "debug".to_string();
        }
        self.json |= json;
        self
    }
}

/// Which built-in evaluators a host installs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorsConfig {
    pub app_root: PathBuf,
    pub enable_json: bool,
    pub enable_text: bool,
}

impl Default for EvaluatorsConfig {
    fn default() -> Self {
        Self {
            app_root: PathBuf::from("."),
            enable_json: true,
            enable_text: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
    pub evaluators: EvaluatorsConfig,
}

impl ScriptConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Apply `TIDE_SCRIPT_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_vars(|var| std::env::var(var).ok())
    }

    fn apply_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TIDE_SCRIPT_ALLOW_DUPLICATES") {
            self.registry.allow_duplicates = parse_bool("TIDE_SCRIPT_ALLOW_DUPLICATES", &value)?;
        }
        if let Some(value) = lookup("TIDE_SCRIPT_LOG_JSON") {
            self.logging.json = parse_bool("TIDE_SCRIPT_LOG_JSON", &value)?;
        }
        if let Some(value) = lookup("TIDE_SCRIPT_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = lookup("TIDE_SCRIPT_APP_ROOT") {
            self.evaluators.app_root = PathBuf::from(value);
        }
        Ok(self)
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = ScriptConfig::default();
        assert!(cfg.registry.allow_duplicates);
        assert!(!cfg.logging.json);
        assert_eq!(cfg.logging.tracing_level(), tracing::Level::INFO);
        assert_eq!(cfg.evaluators.app_root, PathBuf::from("."));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = ScriptConfig::from_toml_str(
            r#"
            [registry]
            allow_duplicates = false

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert!(!cfg.registry.allow_duplicates);
        assert_eq!(cfg.logging.tracing_level(), tracing::Level::DEBUG);
        assert!(cfg.evaluators.enable_json);
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = ScriptConfig::from_toml_str("[registry\nallow_duplicates = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tide.toml");
        std::fs::write(
            &path,
            "[logging]\njson = true\n\n[evaluators]\nenable_text = false\n",
        )
        .unwrap();

        let cfg = ScriptConfig::load(&path).unwrap();
        assert!(cfg.logging.json);
        assert!(!cfg.evaluators.enable_text);
        assert!(cfg.registry.allow_duplicates);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScriptConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_env_overrides() {
        let cfg = ScriptConfig::default()
            .apply_vars(vars(&[
                ("TIDE_SCRIPT_ALLOW_DUPLICATES", "no"),
                ("TIDE_SCRIPT_LOG_JSON", "TRUE"),
                ("TIDE_SCRIPT_APP_ROOT", "/srv/app"),
            ]))
            .unwrap();
        assert!(!cfg.registry.allow_duplicates);
        assert!(cfg.logging.json);
        assert_eq!(cfg.evaluators.app_root, PathBuf::from("/srv/app"));
    }

    #[test]
    fn test_invalid_env_bool() {
        let err = ScriptConfig::default()
            .apply_vars(vars(&[("TIDE_SCRIPT_LOG_JSON", "maybe")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidEnv { var, value } => {
                assert_eq!(var, "TIDE_SCRIPT_LOG_JSON");
                assert_eq!(value, "maybe");
            }
            other => panic!("expected InvalidEnv, got {:?}", other),
        }
    }

    #[test]
    fn test_logging_overrides() {
        let logging = LoggingConfig {
            json: true,
            level: "warn".into(),
        };
        let same = logging.clone().with_overrides(false, false);
        assert_eq!(same, logging);

        let verbose = logging.with_overrides(true, false);
        assert_eq!(verbose.tracing_level(), tracing::Level::DEBUG);
        assert!(verbose.json);
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let logging = LoggingConfig {
            json: false,
            level: "chatty".into(),
        };
        assert_eq!(logging.tracing_level(), tracing::Level::INFO);
    }
}
