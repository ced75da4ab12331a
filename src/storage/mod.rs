//! Storage module for persisting crawled policies
//!
//! This module handles all persistence for the crawler, including:
//! - The natural deduplication key shared by every store
//! - A JSON-lines repository with merge-and-rewrite upserts
//! - Containment checks against previously stored policies

mod jsonl;
mod traits;

pub use jsonl::JsonlRepository;
pub use traits::{PolicyIndex, PolicyKey, PolicyStore, StorageError, StorageResult};

use crate::config::Config;

/// Opens the repository configured in `config`
///
/// # Returns
///
/// * `Ok(JsonlRepository)` - Repository rooted at `storage.root`
/// * `Err(StorageError)` - The root directory could not be created
pub fn open_repository(config: &Config) -> StorageResult<JsonlRepository> {
    JsonlRepository::open(&config.storage.root, config.site.tag.clone())
}
