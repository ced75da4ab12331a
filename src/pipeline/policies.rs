//! The policies task: crawl, dedupe, download, persist, export
//!
//! [`run`] is the crawl entry. Its collaborators (site client, store, and
//! exporter) are passed in explicitly so tests can substitute any of them.
//!
//! # Ordering
//!
//! 1. The repository index is loaded once.
//! 2. Each crawled policy whose natural key is already indexed is skipped.
//!    New policies have their attachments downloaded and are staged; their
//!    key joins the in-memory index so repeats within the run are skipped.
//! 3. Staged policies are persisted with one upsert, also when the crawl
//!    failed part way. The crawl error is returned afterwards.
//! 4. Persisted policies are exported in order. Each successful export is
//!    upserted again; the first failure ends the run.
//!
//! In dry-run mode detail pages are still fetched, but nothing is
//! downloaded, written, or exported.

use crate::config::Config;
use crate::crawler::{CrawlOptions, DownloadOutcome, PolicyCrawl, SiteClient};
use crate::model::Policy;
use crate::output::{apply_export, print_run_report, Exporter, MarkdownExporter, RunReport};
use crate::storage::{self, PolicyIndex, PolicyStore};
use crate::Result;
use std::path::PathBuf;

/// Options for one run of the policies task
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub crawl: CrawlOptions,

    /// Directory attachments are downloaded into
    pub download_dir: PathBuf,

    /// Do not export, even when an exporter is supplied
    pub skip_export: bool,

    /// Report discoveries only; no downloads, writes, or exports
    pub dry_run: bool,
}

impl RunOptions {
    /// Options with no caps, downloading into the configured directory
    pub fn from_config(config: &Config) -> Self {
        Self {
            crawl: CrawlOptions::default(),
            download_dir: config.storage.download_dir.clone(),
            skip_export: false,
            dry_run: false,
        }
    }
}

/// Crawls the site and merges new policies into the store
///
/// # Arguments
///
/// * `client` - Site client used for list, detail, and attachment fetches
/// * `store` - Repository new policies are merged into
/// * `exporter` - Optional exporter for persisted policies
/// * `options` - Crawl caps, download directory, and mode flags
///
/// # Returns
///
/// * `Ok(RunReport)` - What the run did
/// * `Err(HarvestError)` - A crawl, download, storage, or export failure;
///   policies staged before the failure are already persisted
pub async fn run(
    client: &SiteClient,
    store: &mut dyn PolicyStore,
    exporter: Option<&dyn Exporter>,
    options: &RunOptions,
) -> Result<RunReport> {
    let mut index = store.load_index()?;
    let mut report = RunReport {
        dry_run: options.dry_run,
        ..RunReport::default()
    };

    if !options.dry_run {
        std::fs::create_dir_all(&options.download_dir)?;
    }

    let mut staged = Vec::new();
    let mut crawl = client.crawl(options.crawl.clone());
    let crawled = collect_new(
        &mut crawl,
        client,
        &*store,
        &mut index,
        options,
        &mut staged,
        &mut report,
    )
    .await;

    if options.dry_run {
        crawled?;
        return Ok(report);
    }

    if !staged.is_empty() {
        store.upsert_many(&staged)?;
        report.persisted = staged.len();
        tracing::info!("Persisted {} new policies", staged.len());
    }
    crawled?;

    let Some(exporter) = exporter.filter(|_| !options.skip_export) else {
        return Ok(report);
    };

    for mut policy in staged {
        let result = exporter.export(&policy).await?;
        apply_export(&mut policy, result);
        store.upsert_many(std::slice::from_ref(&policy))?;
        report.exported += 1;
        tracing::debug!("Exported {}", policy.id);
    }

    Ok(report)
}

/// Drains the crawl, staging policies whose key is not yet indexed
async fn collect_new(
    crawl: &mut PolicyCrawl<'_>,
    client: &SiteClient,
    store: &dyn PolicyStore,
    index: &mut PolicyIndex,
    options: &RunOptions,
    staged: &mut Vec<Policy>,
    report: &mut RunReport,
) -> Result<()> {
    while let Some(mut policy) = crawl.next_policy().await? {
        let key = store.key_for(&policy);
        if index.contains_key(&key) {
            tracing::debug!("Skipping existing policy: {}", policy.title);
            report.skipped_existing += 1;
            continue;
        }
        report.discovered += 1;

        if options.dry_run {
            tracing::info!(
                "[DRY RUN] {} {} -> {}",
                policy
                    .publish_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                policy.title,
                policy.source_url
            );
            continue;
        }

        let mut resolved = Vec::with_capacity(policy.attachments.len());
        for attachment in std::mem::take(&mut policy.attachments) {
            let outcome = client
                .download_attachment(attachment, &options.download_dir)
                .await?;
            match outcome.outcome {
                DownloadOutcome::Downloaded => report.attachments_downloaded += 1,
                DownloadOutcome::Cached => report.attachments_cached += 1,
            }
            resolved.push(outcome.attachment);
        }
        policy.attachments = resolved;

        index.insert(key, policy.clone());
        staged.push(policy);
    }

    Ok(())
}

/// Runs the policies task with collaborators built from configuration
///
/// The exporter is built before crawling, so a missing `[export]
/// output-dir` fails the task before any request is made.
pub async fn run_policies_task(config: &Config, options: &RunOptions) -> Result<RunReport> {
    let exporter = if options.skip_export || options.dry_run {
        None
    } else {
        Some(MarkdownExporter::from_config(&config.export)?)
    };

    let client = SiteClient::from_config(config)?;
    let mut store = storage::open_repository(config)?;

    let report = run(
        &client,
        &mut store,
        exporter.as_ref().map(|e| e as &dyn Exporter),
        options,
    )
    .await?;

    print_run_report(&report);
    Ok(report)
}
