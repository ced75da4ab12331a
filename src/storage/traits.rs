//! Storage traits and error types
//!
//! This module defines the trait interface for policy stores and the
//! natural key they deduplicate on.

use crate::model::Policy;
use chrono::NaiveDate;
use indexmap::IndexMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record on line {line}: {source}")]
    Decode {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Natural deduplication key: trimmed title, publish date, and site
///
/// Two policies with the same key are the same policy, whatever their ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyKey {
    pub title: String,
    pub publish_date: Option<NaiveDate>,
    pub site: String,
}

impl PolicyKey {
    /// Builds a key; a missing site falls back to `default_site`
    pub fn new(
        title: &str,
        publish_date: Option<NaiveDate>,
        site: Option<&str>,
        default_site: &str,
    ) -> Self {
        Self {
            title: title.trim().to_string(),
            publish_date,
            site: site.unwrap_or(default_site).to_string(),
        }
    }

    pub fn for_policy(policy: &Policy, default_site: &str) -> Self {
        Self::new(
            &policy.title,
            policy.publish_date,
            policy.site.as_deref(),
            default_site,
        )
    }
}

/// Policies keyed by [`PolicyKey`], in first-insertion order
pub type PolicyIndex = IndexMap<PolicyKey, Policy>;

/// Trait for policy store implementations
///
/// Stores are single-writer: callers must serialize `upsert_many`.
pub trait PolicyStore {
    /// Site used for policies without one
    fn default_site(&self) -> &str;

    /// Loads every stored policy, keyed by natural key
    ///
    /// A missing store is empty, not an error. When a key occurs more than
    /// once the last occurrence wins.
    fn load_index(&self) -> StorageResult<PolicyIndex>;

    /// Merges `policies` over the stored ones and rewrites the store
    ///
    /// Returns the merged index.
    fn upsert_many(&mut self, policies: &[Policy]) -> StorageResult<PolicyIndex>;

    /// Computes the natural key of a policy
    fn key_for(&self, policy: &Policy) -> PolicyKey {
        PolicyKey::for_policy(policy, self.default_site())
    }

    /// Checks whether a policy with this natural key is stored
    fn contains(
        &self,
        title: &str,
        publish_date: Option<NaiveDate>,
        site: Option<&str>,
    ) -> StorageResult<bool> {
        let key = PolicyKey::new(title, publish_date, site, self.default_site());
        Ok(self.load_index()?.contains_key(&key))
    }
}
