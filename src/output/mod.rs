//! Output module for exporting policies and reporting results
//!
//! This module handles:
//! - The exporter capability and its bundled Markdown implementation
//! - Applying exporter-assigned identifiers back onto policies
//! - Run reports and repository statistics

mod markdown;
pub mod stats;
mod traits;

pub use markdown::{document_title, render_document, MarkdownExporter, MAX_TITLE_CHARS};
pub use stats::{
    load_statistics, print_run_report, print_statistics, RepositoryStatistics, RunReport,
};
pub use traits::{ExportError, ExportOutcome, ExportResult, Exporter};

use crate::model::Policy;

/// Stores an export result on the policy it was produced for
///
/// Sets the document id and URL, then copies provider fields onto every
/// attachment whose `url` matches one in the result. Attachments the
/// exporter did not return are left as they are.
///
/// # Arguments
///
/// * `policy` - The exported policy, updated in place
/// * `result` - What the exporter returned for it
pub fn apply_export(policy: &mut Policy, result: ExportResult) {
    policy.google_doc_id = Some(result.document_id);
    policy.google_doc_url = Some(result.document_url);

    for exported in result.attachments {
        if let Some(attachment) = policy
            .attachments
            .iter_mut()
            .find(|a| a.url == exported.url)
        {
            attachment.drive_file_id = exported.drive_file_id;
            attachment.drive_view_url = exported.drive_view_url;
            attachment.drive_download_url = exported.drive_download_url;
            if attachment.mime_type.is_none() {
                attachment.mime_type = exported.mime_type;
            }
        }
    }
}
