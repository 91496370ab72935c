//! Client settings.
//!
//! Layered the usual way: built-in defaults, then an optional TOML file at
//! `<config_dir>/mudlark/config.toml`, then `MUDLARK_`-prefixed environment
//! variables (e.g. `MUDLARK_SERVER__URL`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "mudlark";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// WebSocket URL of the game server.
    pub url: String,
    /// Keepalive send interval, in seconds.
    pub heartbeat_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            url: "ws://localhost:35496/game_socket".to_string(),
            heartbeat_secs: 10,
        }
    }
}

/// Default location of the config file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join("config.toml")
}

impl Settings {
    /// Resolve settings from the given file (or the default location) plus
    /// the environment. A missing file is fine; defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);

        let cfg = Config::builder()
            .add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix("MUDLARK").separator("__"))
            .build()
            .with_context(|| format!("loading configuration from {}", path.display()))?;

        cfg.try_deserialize().context("parsing configuration")
    }

    /// Render as TOML, for `config init` and `config show`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing configuration")
    }
}
