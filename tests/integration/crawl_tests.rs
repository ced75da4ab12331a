//! Integration tests for the crawler and the policies task
//!
//! These tests use wiremock to serve list, detail, and attachment pages and
//! run the full crawl-dedupe-persist-export cycle end-to-end.

use async_trait::async_trait;
use chrono::NaiveDate;
use policy_harvester::config::{Config, SiteConfig};
use policy_harvester::crawler::{
    CrawlOptions, DownloadOutcome, HttpClient, RetryPolicy, SiteClient, SiteProfile,
};
use policy_harvester::output::{ExportError, ExportOutcome, ExportResult, Exporter, MarkdownExporter};
use policy_harvester::pipeline::{run, RunOptions};
use policy_harvester::storage::{JsonlRepository, PolicyStore};
use policy_harvester::{Attachment, FetchError, HarvestError, Policy, RegionLevel};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIST_FIXTURE: &str = include_str!("../fixtures/list_page.html");
const DETAIL_FIXTURE: &str = include_str!("../fixtures/detail_page.html");

/// Creates a site client pointed at the mock server, retrying without delay
fn create_test_client(base_url: &str) -> SiteClient {
    let config = Config {
        site: SiteConfig {
            base_url: base_url.to_string(),
            ..SiteConfig::default()
        },
        ..Config::default()
    };
    let http = HttpClient::with_retry(&config.http, RetryPolicy::immediate(3))
        .expect("Failed to build HTTP client");
    let site = SiteProfile::from_config(&config.site).expect("Failed to build site profile");
    SiteClient::new(http, site)
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Renders a list page with one entry per `(article id, title, date)`
fn list_page(items: &[(&str, &str, &str)]) -> String {
    let entries: String = items
        .iter()
        .map(|(id, title, date)| {
            format!(
                r#"<li><a class="newa" href="/index.php?c=show&amp;id={}">{}<span>{}</span></a></li>"#,
                id, title, date
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="lsrw"><ul>{}</ul></div></body></html>"#,
        entries
    )
}

/// Renders a detail page, optionally linking one PDF attachment
fn detail_page(title: &str, date: &str, attachment: Option<&str>) -> String {
    let link = attachment
        .map(|href| format!(r#"<p><a href="{}">附件下载</a></p>"#, href))
        .unwrap_or_default();
    format!(
        r#"<html><body><div class="xw_xq">
        <div class="b_t">{title}</div>
        <div class="z_c"><span>来源：中小科创</span><span>时间：{date}</span></div>
        <div class="article_con"><p>{title}的正文。</p>{link}</div>
        </div></body></html>"#
    )
}

async fn mount_list(server: &MockServer, page: u32, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("c", "category"))
        .and(query_param("page", page.to_string().as_str()))
        .respond_with(html(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("c", "show"))
        .and(query_param("id", id))
        .respond_with(html(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_pdf(server: &MockServer, file_path: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(file_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.4 test".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .expect(expected)
        .mount(server)
        .await;
}

/// Mounts a two-policy listing (page 2 empty), each with one PDF
async fn mount_two_policies(server: &MockServer, pdf_expected: u64) {
    mount_list(
        server,
        1,
        list_page(&[
            ("101", "关于开展科技金融试点的通知", "2025-08-10"),
            ("102", "深圳市中小企业发展专项资金管理办法", "2025-08-01"),
        ]),
        1,
    )
    .await;
    mount_list(server, 2, list_page(&[]), 1).await;
    mount_detail(
        server,
        "101",
        detail_page(
            "关于开展科技金融试点的通知",
            "2025-08-10",
            Some("/uploads/101.pdf"),
        ),
        1,
    )
    .await;
    mount_detail(
        server,
        "102",
        detail_page(
            "深圳市中小企业发展专项资金管理办法",
            "2025-08-01",
            Some("/uploads/102.pdf"),
        ),
        1,
    )
    .await;
    mount_pdf(server, "/uploads/101.pdf", pdf_expected).await;
    mount_pdf(server, "/uploads/102.pdf", pdf_expected).await;
}

fn run_options(download_dir: &Path) -> RunOptions {
    RunOptions {
        crawl: CrawlOptions::default(),
        download_dir: download_dir.to_path_buf(),
        skip_export: false,
        dry_run: false,
    }
}

async fn collect(client: &SiteClient, options: CrawlOptions) -> Vec<Policy> {
    let mut crawl = client.crawl(options);
    let mut policies = Vec::new();
    while let Some(policy) = crawl.next_policy().await.expect("Crawl failed") {
        policies.push(policy);
    }
    policies
}

struct FailingExporter;

#[async_trait]
impl Exporter for FailingExporter {
    async fn export(&self, _policy: &Policy) -> ExportOutcome<ExportResult> {
        Err(ExportError::Failed("service unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_cutoff_skips_old_items_and_stops_after_page() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());

    mount_list(
        &mock_server,
        1,
        list_page(&[
            ("101", "新政策一", "2025-08-10"),
            ("102", "旧政策", "2025-07-01"),
            ("103", "新政策二", "2025-08-01"),
        ]),
        1,
    )
    .await;
    // Never requested: the cutoff ends the crawl after page 1
    mount_list(&mock_server, 2, list_page(&[("104", "更多", "2025-08-09")]), 0).await;
    mount_detail(&mock_server, "101", detail_page("新政策一", "2025-08-10", None), 1).await;
    mount_detail(&mock_server, "102", detail_page("旧政策", "2025-07-01", None), 0).await;
    mount_detail(&mock_server, "103", detail_page("新政策二", "2025-08-01", None), 1).await;

    let mut crawl = client.crawl(CrawlOptions {
        since: NaiveDate::from_ymd_opt(2025, 7, 15),
        ..CrawlOptions::default()
    });
    let mut titles = Vec::new();
    while let Some(policy) = crawl.next_policy().await.unwrap() {
        titles.push(policy.title);
    }

    assert_eq!(titles, vec!["新政策一", "新政策二"]);
    let progress = crawl.progress();
    assert_eq!(progress.pages_fetched, 1);
    assert_eq!(progress.details_fetched, 2);
    assert_eq!(progress.skipped_by_cutoff, 1);
}

#[tokio::test]
async fn test_limit_stops_mid_page() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());

    mount_list(
        &mock_server,
        1,
        list_page(&[
            ("101", "一", "2025-08-10"),
            ("102", "二", "2025-08-09"),
            ("103", "三", "2025-08-08"),
        ]),
        1,
    )
    .await;
    mount_detail(&mock_server, "101", detail_page("一", "2025-08-10", None), 1).await;
    mount_detail(&mock_server, "102", detail_page("二", "2025-08-09", None), 1).await;
    mount_detail(&mock_server, "103", detail_page("三", "2025-08-08", None), 0).await;

    let policies = collect(
        &client,
        CrawlOptions {
            limit: Some(2),
            ..CrawlOptions::default()
        },
    )
    .await;

    assert_eq!(policies.len(), 2);
    assert_eq!(policies[0].id, "zxkc-101");
    assert_eq!(policies[1].id, "zxkc-102");
}

#[tokio::test]
async fn test_max_pages_caps_listing() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());

    mount_list(&mock_server, 1, list_page(&[("101", "一", "2025-08-10")]), 1).await;
    mount_list(&mock_server, 2, list_page(&[("102", "二", "2025-08-09")]), 0).await;
    mount_detail(&mock_server, "101", detail_page("一", "2025-08-10", None), 1).await;

    let policies = collect(
        &client,
        CrawlOptions {
            max_pages: Some(1),
            ..CrawlOptions::default()
        },
    )
    .await;

    assert_eq!(policies.len(), 1);
}

#[tokio::test]
async fn test_empty_list_page_ends_crawl() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());

    mount_list(&mock_server, 1, list_page(&[("101", "一", "2025-08-10")]), 1).await;
    mount_list(&mock_server, 2, list_page(&[]), 1).await;
    mount_list(&mock_server, 3, list_page(&[("103", "三", "2025-08-08")]), 0).await;
    mount_detail(&mock_server, "101", detail_page("一", "2025-08-10", None), 1).await;

    let policies = collect(&client, CrawlOptions::default()).await;
    assert_eq!(policies.len(), 1);
}

#[tokio::test]
async fn test_list_page_extraction() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let client = create_test_client(&base_url);

    mount_list(&mock_server, 1, LIST_FIXTURE.to_string(), 1).await;

    let items = client.fetch_list_page(1).await.unwrap();

    let ids: Vec<_> = items.iter().map(|i| i.article_id.as_str()).collect();
    assert_eq!(ids, vec!["2703", "2702", "2701"]);
    assert_eq!(items[0].title, "国务院办公厅关于进一步优化支付服务的意见");
    assert_eq!(items[0].publish_date, NaiveDate::from_ymd_opt(2025, 8, 11));
    assert_eq!(
        items[1].url,
        format!("{}/index.php?c=show&id=2702", base_url)
    );
    // Unparseable dates become unknown
    assert_eq!(items[2].publish_date, None);
}

#[tokio::test]
async fn test_detail_page_extraction() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let client = create_test_client(&base_url);

    // The list title is shorter than the detail title
    mount_list(
        &mock_server,
        1,
        list_page(&[("301", "广东省若干措施", "2025-08-10")]),
        1,
    )
    .await;
    mount_list(&mock_server, 2, list_page(&[]), 1).await;
    mount_detail(&mock_server, "301", DETAIL_FIXTURE.to_string(), 1).await;

    let policies = collect(&client, CrawlOptions::default()).await;
    assert_eq!(policies.len(), 1);

    let policy = &policies[0];
    assert_eq!(policy.id, "zxkc-301");
    assert_eq!(policy.title, "关于印发广东省支持中小企业科技创新若干措施的通知");
    assert_eq!(policy.publish_date, NaiveDate::from_ymd_opt(2025, 8, 11));
    assert_eq!(policy.region_level, Some(RegionLevel::Provincial));
    assert_eq!(policy.site.as_deref(), Some("zxkc"));
    assert!(policy
        .content_text
        .as_deref()
        .unwrap()
        .contains("请认真贯彻执行"));

    let urls: Vec<_> = policy.attachments.iter().map(|a| a.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/uploads/2025/0811/measures.pdf", base_url),
            format!("{}/uploads/2025/0811/scan.png", base_url),
        ]
    );
    assert_eq!(policy.attachments[0].name, "若干措施全文.pdf");
    assert_eq!(policy.attachments[1].name, "印发通知扫描件");
}

#[tokio::test]
async fn test_retry_recovers_from_server_error() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());

    // First request fails, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("c", "category"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_list(&mock_server, 1, list_page(&[("101", "一", "2025-08-10")]), 1).await;
    mount_list(&mock_server, 2, list_page(&[]), 1).await;
    mount_detail(&mock_server, "101", detail_page("一", "2025-08-10", None), 1).await;

    let policies = collect(&client, CrawlOptions::default()).await;
    assert_eq!(policies.len(), 1);
}

#[tokio::test]
async fn test_retry_gives_up_after_attempt_budget() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut crawl = client.crawl(CrawlOptions::default());
    let result = crawl.next_policy().await;

    assert!(matches!(
        result,
        Err(HarvestError::Fetch(FetchError::Status { status: 503, .. }))
    ));
    // The crawl is over after an error
    assert!(crawl.next_policy().await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_page_redirect_is_followed() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("c", "category"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/moved"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(html(list_page(&[("101", "一", "2025-08-10")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let items = client.fetch_list_page(1).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].article_id, "101");
}

#[tokio::test]
async fn test_redirect_loop_is_an_error() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let client = create_test_client(&base_url);

    // Page 1 redirects to itself until the hop limit is hit
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "location",
            format!("{}/index.php?c=category&id=2&page=1", base_url).as_str(),
        ))
        .mount(&mock_server)
        .await;

    let result = client.fetch_list_page(1).await;

    assert!(matches!(
        result,
        Err(HarvestError::Fetch(FetchError::Transport { .. }))
    ));
}

#[tokio::test]
async fn test_base_url_path_prefix_is_kept() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&format!("{}/site", mock_server.uri()));

    Mock::given(method("GET"))
        .and(path("/site/index.php"))
        .and(query_param("c", "category"))
        .and(query_param("page", "1"))
        .respond_with(html(list_page(&[("101", "一", "2025-08-10")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let items = client.fetch_list_page(1).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_stream_retries_then_returns_body() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let client = create_test_client(&base_url);

    Mock::given(method("GET"))
        .and(path("/feed.txt"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("streamed body"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = client
        .http()
        .stream(&format!("{}/feed.txt", base_url))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "streamed body");
}

#[tokio::test]
async fn test_failed_download_leaves_no_cached_file() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let client = create_test_client(&base_url);

    Mock::given(method("GET"))
        .and(path("/uploads/x.pdf"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let attachment = Attachment::new("x.pdf", format!("{}/uploads/x.pdf", base_url));

    let result = client
        .download_attachment(attachment.clone(), dir.path())
        .await;

    assert!(matches!(
        result,
        Err(FetchError::Status { status: 500, .. })
    ));
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert!(leftovers.is_empty(), "unexpected files: {:?}", leftovers);

    // Once the server recovers the file is fetched, not treated as cached
    mount_pdf(&mock_server, "/uploads/x.pdf", 1).await;
    let resolved = client
        .download_attachment(attachment, dir.path())
        .await
        .unwrap();

    assert_eq!(resolved.outcome, DownloadOutcome::Downloaded);
    assert_eq!(
        std::fs::read(dir.path().join("x.pdf")).unwrap(),
        b"%PDF-1.4 test"
    );
    assert!(!dir.path().join("x.pdf.part").exists());
}

#[tokio::test]
async fn test_failed_download_is_retried_by_next_run() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());

    mount_list(&mock_server, 1, list_page(&[("101", "一", "2025-08-10")]), 2).await;
    mount_list(&mock_server, 2, list_page(&[]), 1).await;
    mount_detail(
        &mock_server,
        "101",
        detail_page("一", "2025-08-10", Some("/uploads/101.pdf")),
        2,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/uploads/101.pdf"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let downloads = dir.path().join("attachments");
    let mut store = JsonlRepository::open(dir.path().join("repo"), "zxkc").unwrap();
    let options = run_options(&downloads);

    let first = run(&client, &mut store, None, &options).await;
    assert!(matches!(first, Err(HarvestError::Fetch(_))));
    assert!(store.load_index().unwrap().is_empty());

    mount_pdf(&mock_server, "/uploads/101.pdf", 1).await;
    let second = run(&client, &mut store, None, &options).await.unwrap();

    assert_eq!(second.attachments_downloaded, 1);
    assert_eq!(second.attachments_cached, 0);
    assert_eq!(second.persisted, 1);
}

#[tokio::test]
async fn test_run_persists_new_policies_and_attachments() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());
    mount_two_policies(&mock_server, 1).await;

    let dir = TempDir::new().unwrap();
    let downloads = dir.path().join("attachments");
    let mut store = JsonlRepository::open(dir.path().join("repo"), "zxkc").unwrap();

    let report = run(&client, &mut store, None, &run_options(&downloads))
        .await
        .unwrap();

    assert_eq!(report.discovered, 2);
    assert_eq!(report.persisted, 2);
    assert_eq!(report.attachments_downloaded, 2);
    assert_eq!(report.exported, 0);

    let index = store.load_index().unwrap();
    assert_eq!(index.len(), 2);
    for policy in index.values() {
        let attachment = &policy.attachments[0];
        let local = attachment.local_path.as_deref().unwrap();
        assert_eq!(std::fs::read(local).unwrap(), b"%PDF-1.4 test");
        assert_eq!(attachment.mime_type.as_deref(), Some("application/pdf"));
    }
    assert!(downloads.join("101.pdf").is_file());
    assert!(!downloads.join("101.pdf.part").exists());
}

#[tokio::test]
async fn test_rerun_finds_no_new_policies() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());

    mount_list(
        &mock_server,
        1,
        list_page(&[("101", "一", "2025-08-10"), ("102", "二", "2025-08-09")]),
        2,
    )
    .await;
    mount_list(&mock_server, 2, list_page(&[]), 2).await;
    mount_detail(&mock_server, "101", detail_page("一", "2025-08-10", None), 2).await;
    mount_detail(&mock_server, "102", detail_page("二", "2025-08-09", None), 2).await;

    let dir = TempDir::new().unwrap();
    let mut store = JsonlRepository::open(dir.path(), "zxkc").unwrap();
    let options = run_options(&dir.path().join("attachments"));

    let first = run(&client, &mut store, None, &options).await.unwrap();
    let second = run(&client, &mut store, None, &options).await.unwrap();

    assert_eq!(first.persisted, 2);
    assert_eq!(second.discovered, 0);
    assert_eq!(second.skipped_existing, 2);
    assert_eq!(second.persisted, 0);

    let content = std::fs::read_to_string(store.data_path()).unwrap();
    assert_eq!(content.lines().count(), 2);
}

#[tokio::test]
async fn test_duplicate_key_within_run_is_skipped() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());

    // Same title and date republished under a second article id
    mount_list(
        &mock_server,
        1,
        list_page(&[("201", "重复发布", "2025-08-10"), ("202", "重复发布", "2025-08-10")]),
        1,
    )
    .await;
    mount_list(&mock_server, 2, list_page(&[]), 1).await;
    mount_detail(&mock_server, "201", detail_page("重复发布", "2025-08-10", None), 1).await;
    mount_detail(&mock_server, "202", detail_page("重复发布", "2025-08-10", None), 1).await;

    let dir = TempDir::new().unwrap();
    let mut store = JsonlRepository::open(dir.path(), "zxkc").unwrap();

    let report = run(&client, &mut store, None, &run_options(&dir.path().join("a")))
        .await
        .unwrap();

    assert_eq!(report.discovered, 1);
    assert_eq!(report.skipped_existing, 1);
    let index = store.load_index().unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.values().next().unwrap().id, "zxkc-201");
}

#[tokio::test]
async fn test_attachment_cache_prevents_second_download() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());

    mount_list(&mock_server, 1, list_page(&[("101", "一", "2025-08-10")]), 2).await;
    mount_list(&mock_server, 2, list_page(&[]), 2).await;
    mount_detail(
        &mock_server,
        "101",
        detail_page("一", "2025-08-10", Some("/uploads/101.pdf")),
        2,
    )
    .await;
    mount_pdf(&mock_server, "/uploads/101.pdf", 1).await;

    let dir = TempDir::new().unwrap();
    let downloads = dir.path().join("attachments");
    let options = run_options(&downloads);

    // Separate repositories so the policy is new both times
    let mut first_store = JsonlRepository::open(dir.path().join("first"), "zxkc").unwrap();
    let mut second_store = JsonlRepository::open(dir.path().join("second"), "zxkc").unwrap();

    let first = run(&client, &mut first_store, None, &options).await.unwrap();
    let second = run(&client, &mut second_store, None, &options).await.unwrap();

    assert_eq!(first.attachments_downloaded, 1);
    assert_eq!(second.attachments_downloaded, 0);
    assert_eq!(second.attachments_cached, 1);

    let index = second_store.load_index().unwrap();
    let attachment = &index.values().next().unwrap().attachments[0];
    assert_eq!(attachment.mime_type.as_deref(), Some("application/pdf"));
    assert!(attachment.local_path.is_some());
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());
    mount_two_policies(&mock_server, 0).await;

    let dir = TempDir::new().unwrap();
    let downloads = dir.path().join("attachments");
    let export_dir = dir.path().join("export");
    let mut store = JsonlRepository::open(dir.path().join("repo"), "zxkc").unwrap();
    let exporter = MarkdownExporter::new(&export_dir);

    let options = RunOptions {
        dry_run: true,
        ..run_options(&downloads)
    };
    let report = run(&client, &mut store, Some(&exporter), &options)
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.discovered, 2);
    assert_eq!(report.persisted, 0);
    assert!(!store.data_path().exists());
    assert!(!downloads.exists());
    assert!(!export_dir.exists());
}

#[tokio::test]
async fn test_export_results_are_persisted() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());
    mount_two_policies(&mock_server, 1).await;

    let dir = TempDir::new().unwrap();
    let export_dir = dir.path().join("export");
    let mut store = JsonlRepository::open(dir.path().join("repo"), "zxkc").unwrap();
    let exporter = MarkdownExporter::new(&export_dir);

    let report = run(
        &client,
        &mut store,
        Some(&exporter),
        &run_options(&dir.path().join("attachments")),
    )
    .await
    .unwrap();

    assert_eq!(report.exported, 2);
    assert!(export_dir.join("zxkc-101.md").is_file());
    assert!(export_dir
        .join("files")
        .join("zxkc-101")
        .join("101.pdf")
        .is_file());

    let index = store.load_index().unwrap();
    assert_eq!(index.len(), 2);
    for policy in index.values() {
        assert!(policy.is_exported());
        assert!(policy.google_doc_url.as_deref().unwrap().starts_with("file://"));
        assert!(policy.attachments[0].drive_file_id.is_some());
    }
}

#[tokio::test]
async fn test_skip_export_ignores_exporter() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());
    mount_two_policies(&mock_server, 1).await;

    let dir = TempDir::new().unwrap();
    let mut store = JsonlRepository::open(dir.path().join("repo"), "zxkc").unwrap();
    let options = RunOptions {
        skip_export: true,
        ..run_options(&dir.path().join("attachments"))
    };

    let report = run(&client, &mut store, Some(&FailingExporter), &options)
        .await
        .unwrap();

    assert_eq!(report.persisted, 2);
    assert_eq!(report.exported, 0);
}

#[tokio::test]
async fn test_failing_exporter_keeps_persisted_policies() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());
    mount_two_policies(&mock_server, 1).await;

    let dir = TempDir::new().unwrap();
    let mut store = JsonlRepository::open(dir.path().join("repo"), "zxkc").unwrap();

    let result = run(
        &client,
        &mut store,
        Some(&FailingExporter),
        &run_options(&dir.path().join("attachments")),
    )
    .await;

    assert!(matches!(
        result,
        Err(HarvestError::Export(ExportError::Failed(_)))
    ));

    let index = store.load_index().unwrap();
    assert_eq!(index.len(), 2);
    assert!(index.values().all(|p| !p.is_exported()));
}

#[tokio::test]
async fn test_crawl_failure_persists_staged_policies() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server.uri());

    mount_list(&mock_server, 1, list_page(&[("101", "一", "2025-08-10")]), 1).await;
    mount_detail(&mock_server, "101", detail_page("一", "2025-08-10", None), 1).await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = JsonlRepository::open(dir.path(), "zxkc").unwrap();

    let result = run(&client, &mut store, None, &run_options(&dir.path().join("a"))).await;

    assert!(matches!(result, Err(HarvestError::Fetch(_))));
    assert!(store.contains("一", NaiveDate::from_ymd_opt(2025, 8, 10), None).unwrap());
}
