//! JSON file persistence for the settings document.
//!
//! # Layout
//!
//! ```text
//! <settings_path>        the live document, pretty-printed (2-space indent)
//! <settings_path>.tmp    exists only while a write is in flight
//! <default_path>         bundled seed, read once when <settings_path> is absent
//! ```
//!
//! # Atomicity
//!
//! A write serializes the whole document, writes it to `<settings_path>.tmp`,
//! flushes it to disk, and renames it over `<settings_path>`.  `rename` within
//! one directory is atomic on every platform the server targets, so a
//! concurrent [`read`](DocumentStore::read) never observes a truncated file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use board_core::Settings;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::application::document_store::{DocumentStore, StoreError};

/// [`DocumentStore`] backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    settings_path: PathBuf,
    default_path: PathBuf,
}

impl FileDocumentStore {
    pub fn new(settings_path: impl Into<PathBuf>, default_path: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: settings_path.into(),
            default_path: default_path.into(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .settings_path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("settings.json"));
        name.push(".tmp");
        self.settings_path.with_file_name(name)
    }

    /// Writes `bytes` to the settings path via a temporary sibling file.
    async fn write_atomically(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(dir) = self
            .settings_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            fs::create_dir_all(dir).await.map_err(unavailable(dir))?;
        }

        let temp = self.temp_path();
        let result = write_and_rename(&temp, &self.settings_path, bytes).await;
        if result.is_err() {
            // Best effort; the previous document is still in place.
            let _ = fs::remove_file(&temp).await;
        }
        result
    }
}

async fn write_and_rename(temp: &Path, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = fs::File::create(temp).await.map_err(unavailable(temp))?;
    file.write_all(bytes).await.map_err(unavailable(temp))?;
    file.sync_all().await.map_err(unavailable(temp))?;
    drop(file);

    fs::rename(temp, target).await.map_err(unavailable(target))?;
    Ok(())
}

async fn read_document(path: &Path) -> Result<Value, StoreError> {
    let bytes = fs::read(path).await.map_err(unavailable(path))?;
    serde_json::from_slice(&bytes).map_err(corrupt(path))
}

fn unavailable(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::StorageUnavailable {
        path: path.to_path_buf(),
        source,
    }
}

fn corrupt(path: &Path) -> impl FnOnce(serde_json::Error) -> StoreError + '_ {
    move |source| StoreError::CorruptDocument {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn load(&self) -> Result<Value, StoreError> {
        let exists = fs::try_exists(&self.settings_path)
            .await
            .map_err(unavailable(&self.settings_path))?;

        if !exists {
            info!(
                "no settings at {}; seeding from {}",
                self.settings_path.display(),
                self.default_path.display()
            );
            let seed = fs::read(&self.default_path)
                .await
                .map_err(unavailable(&self.default_path))?;
            serde_json::from_slice::<Value>(&seed).map_err(corrupt(&self.default_path))?;
            self.write_atomically(&seed).await?;
        }

        self.read().await
    }

    async fn read(&self) -> Result<Value, StoreError> {
        read_document(&self.settings_path).await
    }

    async fn write(&self, settings: &Settings) -> Result<(), StoreError> {
        let mut text = serde_json::to_string_pretty(settings).map_err(|e| {
            StoreError::StorageUnavailable {
                path: self.settings_path.clone(),
                source: e.into(),
            }
        })?;
        text.push('\n');

        self.write_atomically(text.as_bytes()).await?;
        debug!(
            "wrote {} bytes to {}",
            text.len(),
            self.settings_path.display()
        );
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
