//! Configuration file structures for embed-bridge.
//!
//! A config file carries the [`BridgeConfig`] under `[runtime]` and a list of
//! `[[scripts]]` that map module names to script files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::BridgeConfig;

/// Top-level configuration file structure.
///
/// # Example
///
/// ```toml
/// [runtime.engine]
/// memory_limit_mb = 32
/// max_stack_size_kb = 512
///
/// [runtime.loader]
/// strip_terminator = true
///
/// [runtime.call]
/// failure_sentinel = -1
///
/// [[scripts]]
/// module = "foo"
/// path = "./demos/my-foo-lib.mjs"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Bridge configuration (engine, loader, call settings).
    #[serde(default)]
    pub runtime: BridgeConfig,

    /// Script files that stand in for embedded resources.
    #[serde(default)]
    pub scripts: Vec<ScriptEntry>,
}

impl ConfigFile {
    /// Read and parse a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml(&content)?;
        debug!(
            path = %path.display(),
            scripts = config.scripts.len(),
            "Config file loaded"
        );
        Ok(config)
    }

    /// Parse a config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(content)?)
    }

    /// Find the script registered for a module name.
    pub fn script(&self, module: &str) -> Option<&ScriptEntry> {
        self.scripts.iter().find(|entry| entry.module == module)
    }
}

/// A script file registered under a module name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptEntry {
    /// Logical module name; the entry point is `require_<module>`.
    pub module: String,

    /// Path to the compiled script file.
    pub path: String,
}

/// Errors reading a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// The config file could not be read.
    #[error("Cannot read '{}': {source}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file content is not a valid config.
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();

        assert_eq!(config.runtime.engine.memory_limit_mb, 64);
        assert!(config.runtime.loader.strip_terminator);
        assert!(config.scripts.is_empty());
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [runtime.call]
            failure_sentinel = -2
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert_eq!(config.runtime.call.failure_sentinel, -2);
        // Defaults applied
        assert_eq!(config.runtime.engine.max_stack_size_kb, 1024);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [runtime.engine]
            memory_limit_mb = 32
            max_stack_size_kb = 512
            gc_threshold_kb = 128

            [runtime.loader]
            strip_terminator = false

            [runtime.call]
            failure_sentinel = -7

            [[scripts]]
            module = "foo"
            path = "./demos/my-foo-lib.mjs"

            [[scripts]]
            module = "determine_basal_mjs"
            path = "./demos/determine-basal.mjs"
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert_eq!(config.runtime.engine.memory_limit_mb, 32);
        assert_eq!(config.runtime.engine.max_stack_size_kb, 512);
        assert_eq!(config.runtime.engine.gc_threshold_kb, 128);
        assert!(!config.runtime.loader.strip_terminator);
        assert_eq!(config.runtime.call.failure_sentinel, -7);
        assert_eq!(config.scripts.len(), 2);
        assert_eq!(config.scripts[0].module, "foo");
        assert_eq!(config.scripts[1].path, "./demos/determine-basal.mjs");
    }

    #[test]
    fn test_script_lookup() {
        let toml = r#"
            [[scripts]]
            module = "foo"
            path = "foo.mjs"
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert_eq!(config.script("foo").map(|s| s.path.as_str()), Some("foo.mjs"));
        assert!(config.script("bar").is_none());
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = ConfigFile::from_toml("scripts = 3 [");
        assert!(matches!(result, Err(ConfigFileError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigFile::from_file("/nonexistent/embed-bridge.toml");
        assert!(matches!(result, Err(ConfigFileError::Read { .. })));
    }
}
