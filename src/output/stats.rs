//! Statistics for runs and the policy repository
//!
//! This module provides the per-run report returned by the crawl entry and
//! a summary of everything stored in the repository.

use crate::model::RegionLevel;
use crate::storage::{PolicyStore, StorageResult};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// What a single run of the policies task did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Crawled policies not yet in the repository
    pub discovered: usize,

    /// Crawled policies whose natural key was already stored
    pub skipped_existing: usize,

    pub attachments_downloaded: usize,
    pub attachments_cached: usize,

    /// Policies written by the post-crawl upsert
    pub persisted: usize,

    /// Policies successfully published by the exporter
    pub exported: usize,

    pub dry_run: bool,
}

/// Logs a run report at info level
pub fn print_run_report(report: &RunReport) {
    if report.dry_run {
        tracing::info!(
            "Dry run complete: {} potential new policies ({} already stored)",
            report.discovered,
            report.skipped_existing
        );
        return;
    }

    if report.persisted == 0 {
        tracing::info!(
            "No new policies found ({} already stored)",
            report.skipped_existing
        );
    } else {
        tracing::info!(
            "Stored {} new policies ({} already stored)",
            report.persisted,
            report.skipped_existing
        );
    }
    tracing::info!(
        "Attachments: {} downloaded, {} from cache; {} policies exported",
        report.attachments_downloaded,
        report.attachments_cached,
        report.exported
    );
}

/// Repository statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryStatistics {
    /// Total number of stored policies
    pub total: usize,

    /// Count of policies by region level; unknown levels are not counted
    pub by_region: BTreeMap<RegionLevel, usize>,

    /// Count of policies by site tag
    pub by_site: BTreeMap<String, usize>,

    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,

    /// Policies with at least one attachment
    pub with_attachments: usize,

    /// Policies carrying an exported document id
    pub exported: usize,
}

/// Loads statistics from a policy store
///
/// # Arguments
///
/// * `store` - The store to summarize
///
/// # Returns
///
/// * `Ok(RepositoryStatistics)` - Successfully computed statistics
/// * `Err(StorageError)` - The store could not be read
pub fn load_statistics(store: &dyn PolicyStore) -> StorageResult<RepositoryStatistics> {
    let index = store.load_index()?;
    let mut stats = RepositoryStatistics {
        total: index.len(),
        ..RepositoryStatistics::default()
    };

    for (key, policy) in &index {
        if let Some(level) = policy.region_level {
            *stats.by_region.entry(level).or_insert(0) += 1;
        }
        *stats.by_site.entry(key.site.clone()).or_insert(0) += 1;

        if let Some(date) = policy.publish_date {
            stats.earliest = Some(stats.earliest.map_or(date, |d| d.min(date)));
            stats.latest = Some(stats.latest.map_or(date, |d| d.max(date)));
        }
        if !policy.attachments.is_empty() {
            stats.with_attachments += 1;
        }
        if policy.is_exported() {
            stats.exported += 1;
        }
    }

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RepositoryStatistics) {
    println!("=== Policy Repository Statistics ===\n");

    println!("Overview:");
    println!("  Total policies: {}", stats.total);
    match (stats.earliest, stats.latest) {
        (Some(earliest), Some(latest)) => println!("  Published: {} to {}", earliest, latest),
        _ => println!("  Published: unknown"),
    }
    println!("  With attachments: {}", stats.with_attachments);
    println!("  Exported: {}", stats.exported);
    println!();

    if !stats.by_region.is_empty() {
        println!("Policies by Region:");
        for (level, count) in &stats.by_region {
            println!("  {}: {} ({:.1}%)", level, count, percentage(*count, stats.total));
        }
        println!();
    }

    if !stats.by_site.is_empty() {
        println!("Policies by Site:");
        let mut sites: Vec<_> = stats.by_site.iter().collect();
        sites.sort_by(|a, b| b.1.cmp(a.1));
        for (site, count) in sites {
            println!("  {}: {}", site, count);
        }
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64) * 100.0
    }
}
