//! Infrastructure implementation of the `ConfigStore` port.

use std::path::PathBuf;

use crate::application::ports::ConfigStore;
use crate::domain::ConfigError;
use crate::domain::config::ManagerConfig;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "KWARDEN_CONFIG";

fn kwarden_home() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHome)?;
    Ok(home.join(".kwarden"))
}

/// Production implementation of `ConfigStore` that reads a YAML file.
pub struct YamlConfigStore;

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<ManagerConfig, ConfigError> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(ManagerConfig::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Unreadable {
            path: path.clone(),
            source: e,
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Invalid { path, source: e })
    }

    fn path(&self) -> Result<PathBuf, ConfigError> {
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        Ok(kwarden_home()?.join("config.yaml"))
    }
}

/// Database location: the configured path, or `~/.kwarden/kwarden.db`.
///
/// # Errors
///
/// Returns `NoHome` when no path is configured and the home directory is
/// unknown.
pub fn database_path(config: &ManagerConfig) -> Result<PathBuf, ConfigError> {
    match &config.database {
        Some(path) => Ok(path.clone()),
        None => Ok(kwarden_home()?.join("kwarden.db")),
    }
}
