//! Configuration for ibgib-space

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GibError, Result};

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ibgib-space")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the space and zero-space databases
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Name given to a newly created space
    #[serde(default = "default_space_name")]
    pub space_name: String,

    /// Rel8n used when relating new timelines to the current root
    #[serde(default = "default_root_rel8n_name")]
    pub root_rel8n_name: String,

    /// Roots created with the roots index; the first becomes current
    #[serde(default = "default_root_names")]
    pub root_names: Vec<String>,

    /// Tags seeded into a new tags index
    #[serde(default = "default_tags")]
    pub default_tags: Vec<String>,

    /// Event bus capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_space_name() -> String {
    "default".to_string()
}

fn default_root_rel8n_name() -> String {
    "x".to_string()
}

fn default_root_names() -> Vec<String> {
    ["A", "B", "C", "D", "E", "F", "G"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_tags() -> Vec<String> {
    vec!["home".to_string(), "favorite".to_string()]
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            space_name: default_space_name(),
            root_rel8n_name: default_root_rel8n_name(),
            root_names: default_root_names(),
            default_tags: default_tags(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| GibError::Config(e.to_string()))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| GibError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Database of the working space
    pub fn space_db_path(&self) -> PathBuf {
        self.storage_dir.join("space.sled")
    }

    /// Database of the zero space, which holds the bootstrap record
    pub fn zero_space_db_path(&self) -> PathBuf {
        self.storage_dir.join("zero.sled")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }

    pub fn registry_settings(&self) -> Result<RegistrySettings> {
        let settings = RegistrySettings {
            root_rel8n_name: self.root_rel8n_name.clone(),
            root_names: self.root_names.clone(),
            default_tags: self.default_tags.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Naming policy for the special-index registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    pub root_rel8n_name: String,
    pub root_names: Vec<String>,
    pub default_tags: Vec<String>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            root_rel8n_name: default_root_rel8n_name(),
            root_names: default_root_names(),
            default_tags: default_tags(),
        }
    }
}

impl RegistrySettings {
    pub fn validate(&self) -> Result<()> {
        if self.root_names.is_empty() {
            return Err(GibError::Config("at least one root name is required".to_string()));
        }
        if self.root_rel8n_name.is_empty() {
            return Err(GibError::Config("root_rel8n_name must not be empty".to_string()));
        }
        let bad = self
            .root_names
            .iter()
            .chain(&self.default_tags)
            .chain(std::iter::once(&self.root_rel8n_name))
            .find(|name| name.contains(crate::ibgib::IBGIB_DELIMITER));
        if let Some(name) = bad {
            return Err(GibError::Config(format!("'{}' contains the address delimiter", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.root_rel8n_name, "x");
        assert_eq!(config.root_names.len(), 7);
        assert_eq!(config.default_tags, vec!["home", "favorite"]);
        assert_eq!(config.event_capacity, 1024);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let config = Config {
            storage_dir: temp.path().to_path_buf(),
            space_name: "work".to_string(),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.space_name, "work");
        assert_eq!(loaded.space_db_path(), temp.path().join("space.sled"));
    }

    #[test]
    fn test_registry_settings_validation() {
        let config = Config {
            root_names: Vec::new(),
            ..Default::default()
        };
        assert!(config.registry_settings().is_err());

        let config = Config {
            default_tags: vec!["a^b".to_string()],
            ..Default::default()
        };
        assert!(config.registry_settings().is_err());
        assert!(Config::default().registry_settings().is_ok());
    }
}
