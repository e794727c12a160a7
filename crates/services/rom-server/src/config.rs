//! Server configuration
//!
//! Loaded from a TOML file named by the first CLI argument or the
//! `MEDIAROM_CONFIG` environment variable; defaults apply when neither is
//! set. `MEDIAROM_BIND` overrides the bind address either way.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// Configuration of the standalone ROM server
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the TCP listener binds to
    pub bind_addr: String,
    /// Cap on a single frame's payload in bytes
    pub max_frame_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9966".to_string(),
            max_frame_bytes: 4 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Resolve configuration from CLI argument, environment, and defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::args()
            .nth(1)
            .or_else(|| std::env::var("MEDIAROM_CONFIG").ok());

        let mut config = match path {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(bind_addr) = std::env::var("MEDIAROM_BIND") {
            config.bind_addr = bind_addr;
        }

        Ok(config)
    }

    /// Parse configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}
