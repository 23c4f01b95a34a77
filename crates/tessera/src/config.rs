//! Configuration file (tessera.toml).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tessera_envelope::DEFAULT_SLOT;
use tessera_server::ServerConfig;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub demo: DemoSettings,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub open: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open: false,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct StoreSettings {
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_slot")]
    pub slot: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            slot: default_slot(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct DemoSettings {
    /// Simulated upstream latency
    #[serde(default = "default_data_delay_ms")]
    pub data_delay_ms: u64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            data_delay_ms: default_data_delay_ms(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    7878
}
fn default_store_dir() -> PathBuf {
    PathBuf::from(".tessera")
}
fn default_slot() -> String {
    DEFAULT_SLOT.to_string()
}
fn default_data_delay_ms() -> u64 {
    500
}

/// Errors loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

impl ConfigFile {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the config file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config: ConfigFile =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn data_delay(&self) -> Duration {
        Duration::from_millis(self.demo.data_delay_ms)
    }

    /// Server settings as a [`ServerConfig`].
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            open: self.server.open,
            store_dir: self.store.dir.clone(),
            data_delay: self.data_delay(),
        }
    }
}

pub const DEFAULT_CONFIG: &str = r#"# Tessera Configuration

[server]
# Address the HTTP server binds to
host = "127.0.0.1"
port = 7878

# Open the default slot in a browser on start
open = false

[store]
# Directory holding one <slot>.json envelope per slot
dir = ".tessera"

# Slot used by export and hydrate
slot = "serializedCounter"

[demo]
# Simulated upstream latency before the root component renders
data_delay_ms = 500
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let config = ConfigFile::load(&temp.path().join("tessera.toml")).unwrap();

        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.server.port, 7878);
        assert_eq!(config.store.slot, "serializedCounter");
        assert_eq!(config.data_delay(), Duration::from_millis(500));
    }

    #[test]
    fn default_config_matches_defaults() {
        let config: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("tessera.toml");
        fs::write(&path, "[server]\nport = 9000\n\n[demo]\ndata_delay_ms = 0\n").unwrap();

        let config = ConfigFile::load(&path).unwrap();
        let server = config.server_config();

        assert_eq!(server.port, 9000);
        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.data_delay, Duration::ZERO);
        assert_eq!(server.store_dir, PathBuf::from(".tessera"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("tessera.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        assert!(matches!(
            ConfigFile::load(&path),
            Err(ConfigError::Parse(_, _))
        ));
    }
}
