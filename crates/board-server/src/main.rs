//! Status board settings server: entry point.
//!
//! Serves the single settings document shown by every status-board display:
//! a JSON API to read and replace it, a server-sent event stream that pushes
//! every accepted change, and a WebSocket feed for native viewers such as
//! `board-watch`.
//!
//! # Usage
//!
//! ```text
//! board-server [OPTIONS]
//!
//! Options:
//!   --config <FILE>                  Optional TOML configuration file
//!   --bind <IP>                      Address both listeners bind to [default: 0.0.0.0]
//!   --port <PORT>                    HTTP API port [default: 3333]
//!   --ws-port <PORT>                 WebSocket push feed port [default: 3334]
//!   --settings-path <FILE>           Live settings document [default: settings.json]
//!   --default-settings-path <FILE>   Seed document [default: assets/default-settings.json]
//!   --keepalive <SECS>               Idle probe interval [default: 15]
//!   --subscriber-queue <N>           Per-subscriber queue capacity [default: 16]
//!   --send-timeout <SECS>            WebSocket send timeout [default: 5]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                 | Flag                      |
//! |--------------------------|---------------------------|
//! | `BOARD_CONFIG`           | `--config`                |
//! | `BOARD_BIND`             | `--bind`                  |
//! | `PORT`                   | `--port`                  |
//! | `BOARD_WS_PORT`          | `--ws-port`               |
//! | `SETTINGS_PATH`          | `--settings-path`         |
//! | `DEFAULT_SETTINGS_PATH`  | `--default-settings-path` |
//! | `BOARD_KEEPALIVE`        | `--keepalive`             |
//! | `BOARD_SUBSCRIBER_QUEUE` | `--subscriber-queue`      |
//! | `BOARD_SEND_TIMEOUT`     | `--send-timeout`          |
//!
//! Precedence: flag, then environment, then the TOML file, then the built-in
//! default.
//!
//! # Architecture overview
//!
//! ```text
//! admin page ── POST /api/settings ──┐
//!                                    ▼
//!                               SyncService ── FileDocumentStore ── settings.json
//!                                    │
//!            ┌───────────────────────┼─────────────────────┐
//!            ▼                       ▼                     ▼
//!   GET /api/settings         GET /api/stream        ws://host:3334
//!      (displays)             (SSE, displays)        (board-watch)
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use board_server::application::{SubscriberRegistry, SyncService};
use board_server::domain::ServerConfig;
use board_server::infrastructure::config_file::{load_config_file, parse_bind};
use board_server::infrastructure::http::router;
use board_server::infrastructure::storage::FileDocumentStore;
use board_server::infrastructure::ws_server::{bind_ws_listener, run_ws_server};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Status board settings server.
///
/// Every option is optional; unset options fall back to the TOML file named
/// by `--config` and then to the built-in defaults.
#[derive(Debug, Parser)]
#[command(
    name = "board-server",
    about = "Settings synchronization server for status-board displays",
    version
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "BOARD_CONFIG")]
    config: Option<PathBuf>,

    /// IP address for both listeners.
    ///
    /// Use `0.0.0.0` to accept connections from the whole LAN, or
    /// `127.0.0.1` to accept only local connections.
    #[arg(long, env = "BOARD_BIND")]
    bind: Option<String>,

    /// HTTP API port.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// WebSocket push feed port.
    #[arg(long, env = "BOARD_WS_PORT")]
    ws_port: Option<u16>,

    /// Where the live settings document is stored.
    #[arg(long, env = "SETTINGS_PATH")]
    settings_path: Option<PathBuf>,

    /// Seed document copied into place on first run.
    #[arg(long, env = "DEFAULT_SETTINGS_PATH")]
    default_settings_path: Option<PathBuf>,

    /// Seconds between keep-alive probes on idle push connections.
    #[arg(long, env = "BOARD_KEEPALIVE")]
    keepalive: Option<u64>,

    /// Capacity of each subscriber's delivery queue.
    #[arg(long, env = "BOARD_SUBSCRIBER_QUEUE")]
    subscriber_queue: Option<usize>,

    /// Seconds a single WebSocket send may take before the viewer is dropped.
    #[arg(long, env = "BOARD_SEND_TIMEOUT")]
    send_timeout: Option<u64>,
}

impl Cli {
    /// Resolves the final [`ServerConfig`]: defaults, then the TOML file,
    /// then flags and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if
    /// any value is out of range.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = ServerConfig::default();

        if let Some(path) = &self.config {
            let file = load_config_file(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?;
            file.apply_to(&mut config)
                .with_context(|| format!("invalid config file {}", path.display()))?;
        }

        if let Some(bind) = &self.bind {
            let ip = parse_bind(bind).context("invalid --bind")?;
            config.http_bind_addr.set_ip(ip);
            config.ws_bind_addr.set_ip(ip);
        }
        if let Some(port) = self.port {
            config.http_bind_addr.set_port(port);
        }
        if let Some(port) = self.ws_port {
            config.ws_bind_addr.set_port(port);
        }
        if let Some(path) = self.settings_path {
            config.settings_path = path;
        }
        if let Some(path) = self.default_settings_path {
            config.default_settings_path = path;
        }
        if let Some(secs) = self.keepalive {
            if secs == 0 {
                bail!("--keepalive must be at least 1 second");
            }
            config.keepalive_interval = Duration::from_secs(secs);
        }
        if let Some(queue) = self.subscriber_queue {
            if queue == 0 {
                bail!("--subscriber-queue must be at least 1");
            }
            config.subscriber_queue = queue;
        }
        if let Some(secs) = self.send_timeout {
            if secs == 0 {
                bail!("--send-timeout must be at least 1 second");
            }
            config.send_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. Logging is initialised; `RUST_LOG` controls the level (default `info`).
/// 2. The configuration is resolved from flags, environment, and file.
/// 3. The settings document is loaded, seeding it from the default on first
///    run.  Startup aborts if it cannot be read.
/// 4. Both listeners are bound.
/// 5. The WebSocket accept loop runs in its own task; the HTTP server runs
///    on this one until Ctrl+C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_server_config()?;
    info!(
        "status board server starting: http={}, ws={}, settings={}",
        config.http_bind_addr,
        config.ws_bind_addr,
        config.settings_path.display()
    );

    let store = FileDocumentStore::new(&config.settings_path, &config.default_settings_path);
    let service = SyncService::start(
        Arc::new(store),
        SubscriberRegistry::new(config.subscriber_queue),
    )
    .await
    .context("failed to load the settings document")?;
    let service = Arc::new(service);

    let http_listener = TcpListener::bind(config.http_bind_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", config.http_bind_addr))?;
    info!("HTTP API listening on {}", config.http_bind_addr);
    let ws_listener = bind_ws_listener(&config).await?;

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let shutdown = {
        let running = Arc::clone(&running);
        let service = Arc::clone(&service);
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("received Ctrl+C; shutting down"),
                Err(e) => {
                    error!("failed to listen for Ctrl+C signal: {e}");
                    std::future::pending::<()>().await;
                }
            }
            running.store(false, Ordering::Relaxed);
            service.close_subscriptions().await;
        }
    };

    let config = Arc::new(config);
    let ws_task = tokio::spawn(run_ws_server(
        ws_listener,
        Arc::clone(&service),
        Arc::clone(&config),
        Arc::clone(&running),
    ));

    axum::serve(http_listener, router(Arc::clone(&service), config.keepalive_interval))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    running.store(false, Ordering::Relaxed);
    ws_task.await.context("WebSocket task panicked")??;

    info!("status board server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
