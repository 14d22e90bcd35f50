//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings of
//! the server process.  `main.rs` builds it from CLI arguments, environment
//! variables, and an optional TOML file; tests build it directly.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// All runtime configuration for the settings server.
///
/// # Example
///
/// ```rust
/// use board_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.http_bind_addr.port(), 3333);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address of the HTTP API (`/api/settings`, `/api/stream`).
    pub http_bind_addr: SocketAddr,

    /// Address of the WebSocket push feed.
    pub ws_bind_addr: SocketAddr,

    /// Where the live settings document is persisted.
    pub settings_path: PathBuf,

    /// Bundled default document copied to `settings_path` on first run.
    pub default_settings_path: PathBuf,

    /// How often idle push connections are probed (SSE comment, WebSocket
    /// ping).  A failed probe ends the connection and releases its
    /// registration.
    pub keepalive_interval: Duration,

    /// Capacity of each subscriber's delivery queue.  A subscriber whose
    /// queue is full when a broadcast arrives is dropped as too slow.
    pub subscriber_queue: usize,

    /// Upper bound on a single write to one WebSocket viewer.
    pub send_timeout: Duration,
}

impl Default for ServerConfig {
    /// | Field                 | Default                        |
    /// |-----------------------|--------------------------------|
    /// | http_bind_addr        | `0.0.0.0:3333`                 |
    /// | ws_bind_addr          | `0.0.0.0:3334`                 |
    /// | settings_path         | `settings.json`                |
    /// | default_settings_path | `assets/default-settings.json` |
    /// | keepalive_interval    | 15 seconds                     |
    /// | subscriber_queue      | 16                             |
    /// | send_timeout          | 5 seconds                      |
    fn default() -> Self {
        Self {
            http_bind_addr: SocketAddr::from(([0, 0, 0, 0], 3333)),
            ws_bind_addr: SocketAddr::from(([0, 0, 0, 0], 3334)),
            settings_path: PathBuf::from("settings.json"),
            default_settings_path: PathBuf::from("assets/default-settings.json"),
            keepalive_interval: Duration::from_secs(15),
            subscriber_queue: 16,
            send_timeout: Duration::from_secs(5),
        }
    }
}
