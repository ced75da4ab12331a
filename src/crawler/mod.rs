//! Crawler module for the policy site
//!
//! This module contains the crawl-extract logic, including:
//! - HTTP fetching with retry logic
//! - List and detail page parsing
//! - Pagination with the since-date early stop
//! - Attachment download with a local cache

mod attachments;
mod coordinator;
mod fetcher;
mod parser;
mod site;

pub use attachments::{
    guess_mime_type, resolve_attachment, target_file_name, target_path, DownloadOutcome,
    ResolvedAttachment,
};
pub use coordinator::{CrawlOptions, CrawlProgress, PolicyCrawl, SiteClient};
pub use fetcher::{build_http_client, HttpClient, RetryPolicy};
pub use parser::{parse_date, parse_detail, parse_list, DetailPage, IMAGE_ONLY_PLACEHOLDER};
pub use site::SiteProfile;
