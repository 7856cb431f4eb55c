//! Exporter configuration loaded from YAML.
//!
//! ```yaml
//! server:
//!   port: 9100
//! stream:
//!   verify_checksum: false
//! stations:
//!   - name: base1
//!     host: 192.168.1.20
//!     port: 28784
//! ```
//!
//! The `stream` section is optional. Station names become metric labels and must be unique.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::framing::SyncOptions;
use crate::types::Station;
use crate::{ExporterError, Result};

/// Default port of the metrics endpoint.
pub const DEFAULT_SERVER_PORT: u16 = 9100;

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    pub stations: Vec<Station>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_SERVER_PORT }
    }
}

/// Stream handling switches applied to every station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub verify_checksum: bool,
}

impl StreamConfig {
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions { verify_checksum: self.verify_checksum }
    }
}

impl Config {
    /// Read, parse and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ExporterError::config(path, format!("cannot read file: {}", e)))?;
        let config = Self::parse(&text).map_err(|e| match e {
            ExporterError::Config { details, .. } => ExporterError::config(path, details),
            other => other,
        })?;
        debug!("Loaded {} stations from {}", config.stations.len(), path.display());
        Ok(config)
    }

    /// Parse and validate a configuration document.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = serde_yaml_ng::from_str(text)
            .map_err(|e| ExporterError::config(PathBuf::from("<inline>"), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |details: String| Err(ExporterError::config(PathBuf::from("<inline>"), details));

        if self.server.port == 0 {
            return fail("server port must be non-zero".to_string());
        }
        if self.stations.is_empty() {
            return fail("at least one station is required".to_string());
        }

        let mut names = HashSet::new();
        for station in &self.stations {
            if station.name.trim().is_empty() {
                return fail("station name cannot be empty".to_string());
            }
            if station.host.trim().is_empty() {
                return fail(format!("station '{}' has no host", station.name));
            }
            if station.port == 0 {
                return fail(format!("station '{}' has port 0", station.name));
            }
            if !names.insert(station.name.as_str()) {
                return fail(format!("duplicate station name '{}'", station.name));
            }
        }

        Ok(())
    }
}
