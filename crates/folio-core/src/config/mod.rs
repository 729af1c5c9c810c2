//! Configuration system for folio.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FolioError, FolioResult};

/// Versioning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningConfig {
    /// Path to the version database.
    pub database_path: PathBuf,
    /// Keep versions in memory instead of on disk.
    pub in_memory: bool,
    /// Check that every master referenced by a rebuilt version still exists.
    pub verify_masters: bool,
    /// Pretty-print version blobs.
    pub pretty_blobs: bool,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        let folio_dir = dirs::home_dir()
            .map(|h| h.join(".folio"))
            .unwrap_or_else(|| PathBuf::from(".folio"));

        Self {
            database_path: folio_dir.join("versions.db"),
            in_memory: false,
            verify_masters: true,
            pretty_blobs: false,
        }
    }
}

impl VersioningConfig {
    /// In-memory configuration, mostly for tests.
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            ..Default::default()
        }
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> FolioResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| FolioError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| FolioError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| FolioError::Configuration(e.to_string())),
            _ => Err(FolioError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Override fields from `FOLIO_*` variables provided by `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("FOLIO_DB_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(flag) = lookup("FOLIO_IN_MEMORY").and_then(|v| parse_flag(&v)) {
            self.in_memory = flag;
        }
        if let Some(flag) = lookup("FOLIO_VERIFY_MASTERS").and_then(|v| parse_flag(&v)) {
            self.verify_masters = flag;
        }
        if let Some(flag) = lookup("FOLIO_PRETTY_BLOBS").and_then(|v| parse_flag(&v)) {
            self.pretty_blobs = flag;
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = VersioningConfig::default();
        assert!(config.database_path.ends_with(".folio/versions.db"));
        assert!(!config.in_memory);
        assert!(config.verify_masters);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "database_path = \"/tmp/folio.db\"\npretty_blobs = true").unwrap();

        let config = VersioningConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/folio.db"));
        assert!(config.pretty_blobs);
        assert!(config.verify_masters);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "in_memory: true\nverify_masters: false").unwrap();

        let config = VersioningConfig::from_file(file.path()).unwrap();
        assert!(config.in_memory);
        assert!(!config.verify_masters);
    }

    #[test]
    fn test_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = VersioningConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, FolioError::Configuration(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FOLIO_DB_PATH", "/var/lib/folio/v.db"),
            ("FOLIO_IN_MEMORY", "yes"),
            ("FOLIO_VERIFY_MASTERS", "0"),
            ("FOLIO_PRETTY_BLOBS", "maybe"),
        ]
        .into_iter()
        .collect();

        let mut config = VersioningConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path, PathBuf::from("/var/lib/folio/v.db"));
        assert!(config.in_memory);
        assert!(!config.verify_masters);
        assert!(!config.pretty_blobs);
    }
}
