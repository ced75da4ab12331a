//! Site profile for the crawled policy listing

use crate::config::SiteConfig;
use crate::crawler::parser::DetailPage;
use crate::model::{ListItem, Policy, RegionLevel};
use url::Url;

/// Where the listing lives and how its records are tagged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    pub base_url: Url,
    pub category_id: u32,
    /// Source identifier stored on every policy
    pub tag: String,
}

impl SiteProfile {
    /// Builds the profile; `base_url` always ends in `/` so page paths
    /// resolve under any prefix it carries
    pub fn from_config(config: &SiteConfig) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(&config.base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            category_id: config.category_id,
            tag: config.tag.clone(),
        })
    }

    /// URL of the 1-based list page `page`
    ///
    /// ```
    /// use policy_harvester::config::SiteConfig;
    /// use policy_harvester::crawler::SiteProfile;
    ///
    /// let site = SiteProfile::from_config(&SiteConfig::default()).unwrap();
    /// assert_eq!(
    ///     site.list_page_url(3).unwrap().as_str(),
    ///     "http://www.zxkc.org.cn/index.php?c=category&id=2&page=3"
    /// );
    /// ```
    pub fn list_page_url(&self, page: u32) -> Result<Url, url::ParseError> {
        self.base_url.join(&format!(
            "index.php?c=category&id={}&page={}",
            self.category_id, page
        ))
    }

    /// Stable policy id for an article
    pub fn policy_id(&self, article_id: &str) -> String {
        format!("{}-{}", self.tag, article_id)
    }

    /// Combines a list entry with its parsed detail page
    pub fn build_policy(&self, item: &ListItem, detail: DetailPage) -> Policy {
        Policy {
            id: self.policy_id(&item.article_id),
            region_level: Some(RegionLevel::infer(&detail.title)),
            title: detail.title,
            publish_date: detail.publish_date,
            site: Some(self.tag.clone()),
            source_url: item.url.clone(),
            content_html: Some(detail.content_html),
            content_text: Some(detail.content_text),
            keywords: None,
            attachments: detail.attachments,
            google_doc_id: None,
            google_doc_url: None,
        }
    }
}
