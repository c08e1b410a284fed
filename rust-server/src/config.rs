//! Server configuration.
//!
//! Read from a TOML file (path in `STEPOWL_CONFIG`, default
//! `stepowl-server.toml`), then overridden by `STEPOWL_BIND` and
//! `STEPOWL_DATABASE_URL`.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "stepowl-server.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 4000)),
            database_url: "sqlite:stepowl.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl ServerConfig {
    /// Load from the config file and process environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var("STEPOWL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load_file(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(bind) = lookup("STEPOWL_BIND") {
            self.bind = bind
                .parse()
                .with_context(|| format!("STEPOWL_BIND is not a socket address: {}", bind))?;
        }
        if let Some(url) = lookup("STEPOWL_DATABASE_URL") {
            self.database_url = url;
        }
        Ok(())
    }
}
