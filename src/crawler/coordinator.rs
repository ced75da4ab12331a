//! Crawler coordinator - pagination and detail resolution
//!
//! The coordinator walks the category listing page by page and turns each
//! list entry into a fully parsed [`Policy`]. Output is pulled one record at
//! a time through [`PolicyCrawl::next_policy`], so a consumer can stop early
//! without the crawl fetching anything it will not hand out.
//!
//! # Stop rules
//!
//! | Condition | Action |
//! |-----------|--------|
//! | List page parses to zero items | Stop |
//! | Item dated before `since` | Skip it (no detail fetch), stop after this page |
//! | `limit` policies yielded | Stop immediately, even mid-page |
//! | Next page would exceed `max_pages` | Stop |
//! | Any fetch error (after retries) | Yield the error, then stop |
//!
//! The `since` rule relies on list pages being sorted newest first.

use crate::config::Config;
use crate::crawler::attachments::{resolve_attachment, ResolvedAttachment};
use crate::crawler::fetcher::HttpClient;
use crate::crawler::parser::{parse_detail, parse_list};
use crate::crawler::site::SiteProfile;
use crate::model::{Attachment, ListItem, Policy};
use crate::{FetchError, HarvestError};
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::path::Path;
use url::Url;

/// Caps and cutoff applied to one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Items published before this date are skipped and end the crawl
    pub since: Option<NaiveDate>,
    /// Highest list page to fetch
    pub max_pages: Option<u32>,
    /// Maximum number of policies to yield
    pub limit: Option<usize>,
}

/// Counters describing what a crawl has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlProgress {
    pub pages_fetched: u32,
    pub details_fetched: usize,
    pub skipped_by_cutoff: usize,
}

/// Client for the policy site: list pages, detail pages, and attachments
///
/// Owns the HTTP client for the duration of a crawl.
#[derive(Debug, Clone)]
pub struct SiteClient {
    http: HttpClient,
    site: SiteProfile,
}

impl SiteClient {
    pub fn new(http: HttpClient, site: SiteProfile) -> Self {
        Self { http, site }
    }

    /// Builds the HTTP client and site profile from configuration
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let http = HttpClient::new(&config.http)?;
        let site = SiteProfile::from_config(&config.site)?;
        Ok(Self::new(http, site))
    }

    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Fetches and parses list page `page` (1-based)
    pub async fn fetch_list_page(&self, page: u32) -> Result<Vec<ListItem>, HarvestError> {
        let url = self.site.list_page_url(page)?;
        let html = self.http.get_text(url.as_str()).await?;
        Ok(parse_list(&html, &url))
    }

    /// Fetches a detail page and builds its policy
    pub async fn fetch_policy(&self, item: &ListItem) -> Result<Policy, HarvestError> {
        let page_url = Url::parse(&item.url)?;
        let html = self.http.get_text(page_url.as_str()).await?;
        let detail = parse_detail(&html, &item.title, item.publish_date, &page_url);
        Ok(self.site.build_policy(item, detail))
    }

    /// Makes sure an attachment is present in `download_dir`
    pub async fn download_attachment(
        &self,
        attachment: Attachment,
        download_dir: &Path,
    ) -> Result<ResolvedAttachment, FetchError> {
        resolve_attachment(&self.http, attachment, download_dir).await
    }

    /// Starts a lazy crawl of the listing
    pub fn crawl(&self, options: CrawlOptions) -> PolicyCrawl<'_> {
        PolicyCrawl::new(self, options)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrawlState {
    /// Fetch the next list page
    FetchingPage,
    /// Hand out items from the current page
    IteratingItems,
    Done,
}

/// A forward-only, single-pass crawl over the listing
///
/// Pages are fetched only when the previous page's items are exhausted, and
/// detail pages only when the consumer asks for the next policy.
pub struct PolicyCrawl<'a> {
    client: &'a SiteClient,
    options: CrawlOptions,
    state: CrawlState,
    page: u32,
    pending: VecDeque<ListItem>,
    collected: usize,
    cutoff_reached: bool,
    progress: CrawlProgress,
}

impl<'a> PolicyCrawl<'a> {
    fn new(client: &'a SiteClient, options: CrawlOptions) -> Self {
        Self {
            client,
            options,
            state: CrawlState::FetchingPage,
            page: 0,
            pending: VecDeque::new(),
            collected: 0,
            cutoff_reached: false,
            progress: CrawlProgress::default(),
        }
    }

    pub fn progress(&self) -> CrawlProgress {
        self.progress
    }

    pub fn is_done(&self) -> bool {
        self.state == CrawlState::Done
    }

    /// Returns the next policy, `Ok(None)` when the crawl is over
    ///
    /// After an error the crawl is finished; later calls return `Ok(None)`.
    pub async fn next_policy(&mut self) -> Result<Option<Policy>, HarvestError> {
        match self.advance().await {
            Ok(policy) => Ok(policy),
            Err(e) => {
                self.state = CrawlState::Done;
                Err(e)
            }
        }
    }

    async fn advance(&mut self) -> Result<Option<Policy>, HarvestError> {
        loop {
            match self.state {
                CrawlState::Done => return Ok(None),

                CrawlState::FetchingPage => {
                    if self.limit_reached() || self.page_cap_reached() {
                        self.state = CrawlState::Done;
                        continue;
                    }

                    self.page += 1;
                    let items = self.client.fetch_list_page(self.page).await?;
                    self.progress.pages_fetched += 1;
                    tracing::debug!("List page {} has {} items", self.page, items.len());

                    if items.is_empty() {
                        self.state = CrawlState::Done;
                    } else {
                        self.pending.extend(items);
                        self.state = CrawlState::IteratingItems;
                    }
                }

                CrawlState::IteratingItems => {
                    let Some(item) = self.pending.pop_front() else {
                        self.state = if self.cutoff_reached {
                            tracing::debug!("Reached items older than the cutoff, stopping");
                            CrawlState::Done
                        } else {
                            CrawlState::FetchingPage
                        };
                        continue;
                    };

                    if self.before_cutoff(&item) {
                        tracing::debug!(
                            "Skipping {} ({:?}) older than cutoff",
                            item.url,
                            item.publish_date
                        );
                        self.cutoff_reached = true;
                        self.progress.skipped_by_cutoff += 1;
                        continue;
                    }

                    let policy = self.client.fetch_policy(&item).await?;
                    self.progress.details_fetched += 1;
                    self.collected += 1;

                    if self.limit_reached() {
                        self.state = CrawlState::Done;
                    }
                    return Ok(Some(policy));
                }
            }
        }
    }

    fn before_cutoff(&self, item: &ListItem) -> bool {
        match (self.options.since, item.publish_date) {
            (Some(since), Some(date)) => date < since,
            _ => false,
        }
    }

    fn limit_reached(&self) -> bool {
        self.options
            .limit
            .is_some_and(|limit| self.collected >= limit)
    }

    /// True when fetching the next page would exceed `max_pages`
    fn page_cap_reached(&self) -> bool {
        self.options
            .max_pages
            .is_some_and(|max_pages| self.page >= max_pages)
    }
}
