//! HTML parser for the policy site's list and detail pages
//!
//! This module turns raw markup into typed values:
//! - List pages into [`ListItem`]s (detail link, article id, title, date)
//! - Detail pages into a [`DetailPage`] (title, date, content, attachments)
//!
//! Parsing never fails. Missing elements fall back to caller-supplied values
//! or empty content, and unparseable dates become `None`.

use crate::model::{Attachment, ListItem};
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Content text used when a page body is only scanned images
pub const IMAGE_ONLY_PLACEHOLDER: &str = "正文以图片形式呈现，详情见附件中的图片文件。";

/// Name given to an image with neither alt text nor a URL basename
const UNNAMED_IMAGE: &str = "image_from_article";

/// Link targets treated as attachments (matched case-insensitively)
const ATTACHMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "wps", "jpg", "jpeg", "png", "gif", "bmp",
];

const LIST_LINK: &str = "div.lsrw a.newa";
const LIST_DATE: &str = "span";
const DETAIL_TITLE: &str = "div.xw_xq div.b_t";
const DETAIL_META: &str = "div.xw_xq div.z_c span";
const DETAIL_DATE_PREFIX: &str = "时间：";
const CONTENT_PRIMARY: &str = "div.article_con";
const CONTENT_FALLBACK: &str = "div.n_r";

/// Extracted fields of a detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPage {
    pub title: String,
    pub publish_date: Option<NaiveDate>,
    /// Outer HTML of the content container, empty if none was found
    pub content_html: String,
    pub content_text: String,
    pub attachments: Vec<Attachment>,
}

/// Parses a list page into items, in document order
///
/// Anchors without an `href` are skipped. The article id is the `id` query
/// parameter of the resolved link (empty if absent).
///
/// # Example
///
/// ```
/// use policy_harvester::crawler::parse_list;
/// use url::Url;
///
/// let html = r#"<div class="lsrw">
///     <a class="newa" href="/index.php?c=show&id=7">A title<span>2025-08-11</span></a>
/// </div>"#;
/// let base = Url::parse("http://www.zxkc.org.cn").unwrap();
/// let items = parse_list(html, &base);
/// assert_eq!(items[0].article_id, "7");
/// assert_eq!(items[0].title, "A title");
/// ```
pub fn parse_list(html: &str, base_url: &Url) -> Vec<ListItem> {
    let document = Html::parse_document(html);

    let Ok(link_selector) = Selector::parse(LIST_LINK) else {
        return Vec::new();
    };
    let date_selector = Selector::parse(LIST_DATE).ok();

    let mut items = Vec::new();
    for link in document.select(&link_selector) {
        let Some(href) = link.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() {
            continue;
        }

        let url = match base_url.join(href) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping list link {}: {}", href, e);
                continue;
            }
        };

        let article_id = url
            .query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();

        let publish_date = date_selector
            .as_ref()
            .and_then(|selector| link.select(selector).next())
            .and_then(|span| parse_date(&stripped_text(span, "")));

        items.push(ListItem {
            article_id,
            title: text_outside(link, LIST_DATE),
            url: url.to_string(),
            publish_date,
        });
    }

    items
}

/// Parses a detail page
///
/// `fallback_title` and `fallback_date` (usually taken from the list entry)
/// are used when the page lacks a title element or a `时间：` meta span.
/// Relative attachment links are resolved against `page_url`.
pub fn parse_detail(
    html: &str,
    fallback_title: &str,
    fallback_date: Option<NaiveDate>,
    page_url: &Url,
) -> DetailPage {
    let document = Html::parse_document(html);

    let title = select_first(&document, DETAIL_TITLE)
        .map(|node| stripped_text(node, ""))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| fallback_title.to_string());

    let publish_date = extract_meta_date(&document).or(fallback_date);

    let container = select_first(&document, CONTENT_PRIMARY)
        .or_else(|| select_first(&document, CONTENT_FALLBACK));

    let (content_html, mut content_text, attachments) = match container {
        Some(node) => (
            node.html(),
            stripped_text(node, "\n"),
            extract_attachments(node, page_url),
        ),
        None => (String::new(), String::new(), Vec::new()),
    };

    if content_text.is_empty() && attachments.iter().any(Attachment::is_image) {
        content_text = IMAGE_ONLY_PLACEHOLDER.to_string();
    }

    DetailPage {
        title,
        publish_date,
        content_html,
        content_text,
        attachments,
    }
}

/// Parses the first ten characters of `value` as `YYYY-MM-DD`
///
/// Returns `None` for empty, short, or malformed input.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let prefix: String = value.trim().chars().take(10).collect();
    if prefix.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(&prefix, "%Y-%m-%d").ok()
}

/// Returns the last non-empty path segment of a URL, if any
pub(crate) fn url_basename(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// Finds the `时间：` span in the detail meta block
fn extract_meta_date(document: &Html) -> Option<NaiveDate> {
    let selector = Selector::parse(DETAIL_META).ok()?;

    let text = document
        .select(&selector)
        .map(|span| stripped_text(span, ""))
        .find(|text| text.starts_with(DETAIL_DATE_PREFIX))?;

    let value = text.rsplit(DETAIL_DATE_PREFIX).next().unwrap_or_default();
    parse_date(value)
}

/// Collects attachment links and images from the content container
///
/// Anchors count only when their `href` ends in a known document or image
/// extension. Every `<img src>` counts.
fn extract_attachments(container: ElementRef<'_>, page_url: &Url) -> Vec<Attachment> {
    let mut attachments = Vec::new();

    if let Ok(link_selector) = Selector::parse("a[href]") {
        for link in container.select(&link_selector) {
            let Some(href) = link.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.is_empty() || !has_attachment_extension(href) {
                continue;
            }
            let Ok(url) = page_url.join(href) else {
                continue;
            };

            let text = stripped_text(link, "");
            let name = if text.is_empty() {
                url_basename(&url).unwrap_or_default()
            } else {
                text
            };
            attachments.push(Attachment::new(name, url.to_string()));
        }
    }

    if let Ok(img_selector) = Selector::parse("img[src]") {
        for img in container.select(&img_selector) {
            let Some(src) = img.value().attr("src").map(str::trim) else {
                continue;
            };
            if src.is_empty() {
                continue;
            }
            let Ok(url) = page_url.join(src) else {
                continue;
            };

            let name = img
                .value()
                .attr("alt")
                .map(str::trim)
                .filter(|alt| !alt.is_empty())
                .map(str::to_string)
                .or_else(|| url_basename(&url))
                .unwrap_or_else(|| UNNAMED_IMAGE.to_string());
            attachments.push(Attachment::new(name, url.to_string()));
        }
    }

    attachments
}

fn has_attachment_extension(href: &str) -> bool {
    href.rsplit_once('.').is_some_and(|(_, ext)| {
        ATTACHMENT_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

/// Joins the element's trimmed, non-empty text nodes with `separator`
fn stripped_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Like `stripped_text(element, "")`, skipping text inside `skip` elements
fn text_outside(element: ElementRef<'_>, skip: &str) -> String {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let nested = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != element.id())
                .any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|e| e.name() == skip)
                });
            (!nested).then(|| text.trim())
        })
        .filter(|text| !text.is_empty())
        .collect()
}
