//! Exporter traits and types
//!
//! This module defines the capability interface for document exporters and
//! the identifiers they hand back to the pipeline.

use crate::model::{Attachment, Policy};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during export operations
#[derive(Debug, Error)]
pub enum ExportError {
    /// The exporter is missing configuration it needs to run
    #[error("Exporter not configured: {0}")]
    NotConfigured(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export failed: {0}")]
    Failed(String),
}

/// Result type for export operations
pub type ExportOutcome<T> = Result<T, ExportError>;

/// Identifiers assigned by an exporter to one policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportResult {
    /// Provider id of the published document
    pub document_id: String,

    /// Where the published document can be viewed
    pub document_url: String,

    /// Attachments with provider fields filled in
    ///
    /// Matched back onto the policy by `url`; attachments the exporter did
    /// not upload may be omitted.
    pub attachments: Vec<Attachment>,
}

/// Trait for document exporters
///
/// Exporters receive a policy whose attachments are already resolved and
/// must report failures as errors. Implementations must be thread-safe.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Publishes one policy
    ///
    /// # Arguments
    ///
    /// * `policy` - The policy to publish, attachments already downloaded
    ///
    /// # Returns
    ///
    /// * `Ok(ExportResult)` - Identifiers to store back on the policy
    /// * `Err(ExportError)` - The policy was not published
    async fn export(&self, policy: &Policy) -> ExportOutcome<ExportResult>;
}
