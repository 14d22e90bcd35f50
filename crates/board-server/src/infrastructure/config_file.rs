//! Optional TOML configuration file for the server.
//!
//! Every key is optional.  Keys present in the file override the built-in
//! defaults of [`ServerConfig`]; command-line flags and environment variables
//! override the file.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1"
//! port = 8080
//! ws_port = 8081
//!
//! [storage]
//! settings_path = "/var/lib/status-board/settings.json"
//! default_settings_path = "/usr/share/status-board/default-settings.json"
//!
//! [push]
//! keepalive_secs = 20
//! subscriber_queue = 32
//! send_timeout_secs = 5
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ServerConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Top-level structure of the TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerFileConfig {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub push: PushSection,
}

/// `[server]`: listen addresses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// IP address both listeners bind to.
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub ws_port: Option<u16>,
}

/// `[storage]`: document locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    pub settings_path: Option<PathBuf>,
    pub default_settings_path: Option<PathBuf>,
}

/// `[push]`: subscriber tuning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PushSection {
    pub keepalive_secs: Option<u64>,
    pub subscriber_queue: Option<usize>,
    pub send_timeout_secs: Option<u64>,
}

impl ServerFileConfig {
    /// Overlays every key present in the file onto `config`.
    ///
    /// # Errors
    ///
    /// [`ConfigFileError::Invalid`] for an unparsable bind address or a zero
    /// duration / queue size.
    pub fn apply_to(&self, config: &mut ServerConfig) -> Result<(), ConfigFileError> {
        if let Some(bind) = &self.server.bind {
            let ip = parse_bind(bind)?;
            config.http_bind_addr.set_ip(ip);
            config.ws_bind_addr.set_ip(ip);
        }
        if let Some(port) = self.server.port {
            config.http_bind_addr.set_port(port);
        }
        if let Some(port) = self.server.ws_port {
            config.ws_bind_addr.set_port(port);
        }

        if let Some(path) = &self.storage.settings_path {
            config.settings_path = path.clone();
        }
        if let Some(path) = &self.storage.default_settings_path {
            config.default_settings_path = path.clone();
        }

        if let Some(secs) = self.push.keepalive_secs {
            config.keepalive_interval = positive_secs("push.keepalive_secs", secs)?;
        }
        if let Some(queue) = self.push.subscriber_queue {
            if queue == 0 {
                return Err(ConfigFileError::Invalid {
                    key: "push.subscriber_queue",
                    reason: "must be at least 1".to_string(),
                });
            }
            config.subscriber_queue = queue;
        }
        if let Some(secs) = self.push.send_timeout_secs {
            config.send_timeout = positive_secs("push.send_timeout_secs", secs)?;
        }

        Ok(())
    }
}

/// Parses the IP part of a bind address.
pub fn parse_bind(bind: &str) -> Result<IpAddr, ConfigFileError> {
    bind.parse::<IpAddr>()
        .or_else(|_| bind.parse::<SocketAddr>().map(|addr| addr.ip()))
        .map_err(|e| ConfigFileError::Invalid {
            key: "bind",
            reason: format!("'{bind}': {e}"),
        })
}

fn positive_secs(key: &'static str, secs: u64) -> Result<Duration, ConfigFileError> {
    if secs == 0 {
        return Err(ConfigFileError::Invalid {
            key,
            reason: "must be at least 1 second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Reads and parses the TOML file at `path`.
///
/// # Errors
///
/// [`ConfigFileError::Io`] if the file cannot be read (including when it
/// does not exist: an explicitly named config file must be present) and
/// [`ConfigFileError::Parse`] for malformed TOML or unknown keys.
pub fn load_config_file(path: &Path) -> Result<ServerFileConfig, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
