//! `board-watch`: follows a status board's push feed from the terminal.
//!
//! Connects to the server's WebSocket feed, keeps the connection alive with
//! backoff and periodic re-sync, and logs every document it receives along
//! with the figures a display would show.
//!
//! # Usage
//!
//! ```text
//! board-watch [OPTIONS]
//!
//! Options:
//!   --url <URL>                 Push feed URL [default: ws://127.0.0.1:3334]
//!   --resync-interval <SECS>    Re-sync period [default: 30]
//!   --response-timeout <SECS>   Reply timeout [default: 10]
//! ```
//!
//! | Variable                 | Flag                 |
//! |--------------------------|----------------------|
//! | `BOARD_FEED_URL`         | `--url`              |
//! | `BOARD_RESYNC_INTERVAL`  | `--resync-interval`  |
//! | `BOARD_RESPONSE_TIMEOUT` | `--response-timeout` |

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::bail;
use board_core::Settings;
use board_feed::{FeedClient, FeedConfig, FeedState};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Follow a status board's push feed.
#[derive(Debug, Parser)]
#[command(
    name = "board-watch",
    about = "Follows a status board settings feed and logs every update",
    version
)]
struct Cli {
    /// WebSocket URL of the push feed.
    #[arg(long, default_value = "ws://127.0.0.1:3334", env = "BOARD_FEED_URL")]
    url: String,

    /// Seconds between re-sync requests while connected.
    #[arg(long, default_value_t = 30, env = "BOARD_RESYNC_INTERVAL")]
    resync_interval: u64,

    /// Seconds to wait for the server before reconnecting.
    #[arg(long, default_value_t = 10, env = "BOARD_RESPONSE_TIMEOUT")]
    response_timeout: u64,
}

impl Cli {
    fn into_feed_config(self) -> anyhow::Result<FeedConfig> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            bail!("--url must start with ws:// or wss://, got '{}'", self.url);
        }
        if self.resync_interval == 0 || self.response_timeout == 0 {
            bail!("--resync-interval and --response-timeout must be at least 1 second");
        }
        Ok(FeedConfig {
            url: self.url,
            resync_interval: Duration::from_secs(self.resync_interval),
            response_timeout: Duration::from_secs(self.response_timeout),
            ..FeedConfig::default()
        })
    }
}

/// One log line summarizing what a display would show.
fn describe(settings: &Settings) -> String {
    let progress = settings.progress();
    format!(
        "raised {:.2} of {:.2} {} ({:.0}%), {:.2} to go; {} slide(s) every {}s; donate at {}",
        settings.raised_amount,
        settings.goal_amount,
        settings.currency,
        progress.percent,
        progress.remaining,
        settings.slides.len(),
        settings.slide_interval().as_secs_f64(),
        settings.donation_url
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_feed_config()?;
    info!("board-watch following {}", config.url);

    let client = Arc::new(FeedClient::new(config));
    let running = Arc::new(AtomicBool::new(true));

    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; stopping");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    let mut settings_rx = client.settings();
    tokio::spawn(async move {
        while settings_rx.changed().await.is_ok() {
            let line = describe(&settings_rx.borrow_and_update());
            info!("{line}");
        }
    });

    let mut state_rx = client.state();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state: FeedState = *state_rx.borrow_and_update();
            info!("feed {state}");
        }
    });

    client.run(running).await;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_url_override() {
        let cli = Cli::parse_from(["board-watch", "--url", "ws://10.0.0.5:3334"]);
        assert_eq!(cli.url, "ws://10.0.0.5:3334");
    }

    #[test]
    fn test_into_feed_config_converts_seconds() {
        // Arrange
        let cli = Cli {
            url: "ws://127.0.0.1:3334".to_string(),
            resync_interval: 45,
            response_timeout: 5,
        };

        // Act
        let config = tokio_test::assert_ok!(cli.into_feed_config());

        // Assert
        assert_eq!(config.resync_interval, Duration::from_secs(45));
        assert_eq!(config.response_timeout, Duration::from_secs(5));
        assert_eq!(config.initial_backoff, Duration::from_secs(1));
    }

    #[test]
    fn test_http_url_is_rejected() {
        let cli = Cli {
            url: "http://127.0.0.1:3333".to_string(),
            resync_interval: 30,
            response_timeout: 10,
        };
        tokio_test::assert_err!(cli.into_feed_config());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let cli = Cli {
            url: "ws://127.0.0.1:3334".to_string(),
            resync_interval: 0,
            response_timeout: 10,
        };
        tokio_test::assert_err!(cli.into_feed_config());
    }

    #[test]
    fn test_describe_mentions_progress() {
        let settings = Settings {
            goal_amount: 5000.0,
            raised_amount: 1200.0,
            ..Settings::default()
        };

        let line = describe(&settings);

        assert!(line.contains("raised 1200.00 of 5000.00 EUR (24%)"));
        assert!(line.contains("3800.00 to go"));
    }
}
