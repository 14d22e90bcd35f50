//! Storage infrastructure: settings document persistence.
//!
//! The `file_store` sub-module keeps the settings document as a
//! pretty-printed JSON file and seeds it from a bundled default on first run.
//! Writes go to a sibling temporary file which is then renamed over the
//! target, so a reader sees either the old document or the new one.

pub mod file_store;

pub use file_store::FileDocumentStore;
