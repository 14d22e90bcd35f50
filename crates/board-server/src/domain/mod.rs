//! Domain layer for board-server.
//!
//! Holds plain configuration types.  The settings document itself lives in
//! `board-core` because the feed client needs the same definition.

pub mod config;

pub use config::ServerConfig;
