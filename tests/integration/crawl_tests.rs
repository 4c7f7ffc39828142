//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! archive cycle end-to-end, then read the resulting WARC file back.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use warcrawl::config::Config;
use warcrawl::crawler::crawl;
use warcrawl::output::{CrawlStatistics, SkipReason};
use warcrawl::warc::{list_target_uris, RecordType, WarcReader};
use warcrawl::{TaskState, WarcrawlError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with the given depth limit
fn create_test_config(max_depth: u32) -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = max_depth;
    config.crawler.max_concurrent_requests = 8;
    config.crawler.max_requests_per_host = 4;
    config.fetch.timeout_ms = 2_000;
    config.fetch.user_agent = "TestBot/1.0".to_string();
    config
}

/// Mounts a GET route answering 200 with `body`
async fn serve(server: &MockServer, route: &str, mime: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), mime))
        .expect(times)
        .mount(server)
        .await;
}

struct Archived {
    stats: CrawlStatistics,
    path: PathBuf,
    _dir: TempDir,
}

impl Archived {
    fn responses(&self) -> Vec<String> {
        let mut uris = list_uris(&self.path, RecordType::Response);
        uris.sort();
        uris
    }
}

fn list_uris(path: &Path, record_type: RecordType) -> Vec<String> {
    let mut reader = WarcReader::open(path).expect("Failed to open archive");
    list_target_uris(&mut reader, &record_type).expect("Failed to list archive")
}

async fn archive_site(config: Config, seeds: &[String]) -> Archived {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("crawl.warc.gz");
    let stats = crawl(config, seeds, &path, CancellationToken::new())
        .await
        .expect("Crawl failed");
    Archived {
        stats,
        path,
        _dir: dir,
    }
}

fn urls(base: &str, paths: &[&str]) -> Vec<String> {
    let mut urls: Vec<String> = paths.iter().map(|p| format!("{}{}", base, p)).collect();
    urls.sort();
    urls
}

#[tokio::test]
async fn test_full_crawl_with_requisites() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    serve(
        &mock_server,
        "/",
        "text/html",
        r#"<html><head>
            <link rel="stylesheet" href="/style.css">
            <script src="/app.js"></script>
            </head><body>
            <img src="logo.png">
            <a href="/page1">Page 1</a>
            </body></html>"#,
        1,
    )
    .await;
    serve(
        &mock_server,
        "/style.css",
        "text/css",
        r#"body { background: url("bg.png") }"#,
        1,
    )
    .await;
    serve(&mock_server, "/app.js", "application/javascript", "run();", 1).await;
    serve(&mock_server, "/logo.png", "image/png", "logo", 1).await;
    serve(&mock_server, "/bg.png", "image/png", "bg", 1).await;
    serve(
        &mock_server,
        "/page1",
        "text/html",
        r#"<img src="/p1.png"><a href="/page2">Page 2</a>"#,
        1,
    )
    .await;
    serve(&mock_server, "/p1.png", "image/png", "p1", 1).await;
    serve(&mock_server, "/page2", "text/html", "too deep", 0).await;

    let archived = archive_site(create_test_config(1), &[format!("{}/", base_url)]).await;

    assert_eq!(
        archived.responses(),
        urls(
            &base_url,
            &["/", "/app.js", "/bg.png", "/logo.png", "/p1.png", "/page1", "/style.css"]
        )
    );
    let requests = list_uris(&archived.path, RecordType::Request);
    assert_eq!(requests.len(), 7);
    assert_eq!(archived.stats.archived, 7);
    assert_eq!(archived.stats.skipped(SkipReason::DepthExceeded), 1);
}

#[tokio::test]
async fn test_depth_zero_keeps_requisites() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    serve(
        &mock_server,
        "/",
        "text/html",
        r#"<img src="/logo.png"><a href="/next">next</a>"#,
        1,
    )
    .await;
    serve(&mock_server, "/logo.png", "image/png", "logo", 1).await;
    serve(&mock_server, "/next", "text/html", "never", 0).await;

    let archived = archive_site(create_test_config(0), &[format!("{}/", base_url)]).await;
    assert_eq!(archived.responses(), urls(&base_url, &["/", "/logo.png"]));
}

#[tokio::test]
async fn test_scope_limits_discovered_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let port = url::Url::parse(&base_url)
        .expect("Failed to parse base URL")
        .port()
        .expect("Mock server has a port");

    serve(
        &mock_server,
        "/docs/",
        "text/html",
        r#"<a href="/docs/guide">guide</a><a href="/blog/post">post</a>"#,
        1,
    )
    .await;
    serve(&mock_server, "/docs/guide", "text/html", "guide", 1).await;
    serve(&mock_server, "/blog/post", "text/html", "post", 0).await;

    let mut config = create_test_config(1);
    config.scope.allowed_uris = vec![format!("127.0.0.1:{}/docs", port)];
    let archived = archive_site(config, &[format!("{}/docs/", base_url)]).await;

    assert_eq!(archived.responses(), urls(&base_url, &["/docs/", "/docs/guide"]));
    assert_eq!(archived.stats.skipped(SkipReason::OutOfScope), 1);
}

#[tokio::test]
async fn test_fragment_links_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    serve(
        &mock_server,
        "/",
        "text/html",
        r##"<a href="/a#intro">1</a><a href="/a#usage">2</a><a href="/a">3</a>"##,
        1,
    )
    .await;
    serve(&mock_server, "/a", "text/html", "a", 1).await;

    let archived = archive_site(create_test_config(1), &[format!("{}/", base_url)]).await;
    assert_eq!(archived.responses(), urls(&base_url, &["/", "/a"]));
    assert_eq!(archived.stats.skipped(SkipReason::Duplicate), 2);
}

#[tokio::test]
async fn test_redirect_followed_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/final")
                .set_body_raw(r#"<a href="/final">moved</a>"#, "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    serve(&mock_server, "/final", "text/html", "<p>final</p>", 1).await;

    let archived = archive_site(create_test_config(1), &[format!("{}/", base_url)]).await;

    assert_eq!(archived.responses(), urls(&base_url, &["/", "/final"]));
    assert_eq!(archived.stats.redirects_followed, 1);
    assert_eq!(archived.stats.skipped(SkipReason::RedirectTarget), 1);
}

#[tokio::test]
async fn test_failures_do_not_abort_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    serve(
        &mock_server,
        "/",
        "text/html",
        r#"<a href="/missing">m</a><a href="/slow">s</a><a href="/ok">o</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;
    serve(&mock_server, "/ok", "text/html", "ok", 1).await;

    let mut config = create_test_config(1);
    config.fetch.timeout_ms = 300;
    let archived = archive_site(config, &[format!("{}/", base_url)]).await;

    // A 404 is still an exchange worth keeping
    assert_eq!(archived.responses(), urls(&base_url, &["/", "/missing", "/ok"]));
    assert_eq!(archived.stats.finished(TaskState::TimedOut), 1);
    assert_eq!(archived.stats.finished(TaskState::Succeeded), 3);
}

#[tokio::test]
async fn test_cache_replays_responses() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    serve(&mock_server, "/", "text/html", "<p>cached</p>", 1).await;

    let cache_dir = tempfile::tempdir().expect("Failed to create cache dir");
    let mut config = create_test_config(0);
    config.fetch.cache_dir = Some(cache_dir.path().to_string_lossy().into_owned());
    let seeds = [format!("{}/", base_url)];

    let first = archive_site(config.clone(), &seeds).await;
    let second = archive_site(config, &seeds).await;

    assert_eq!(first.responses(), second.responses());
    assert_eq!(second.stats.archived, 1);
}

#[tokio::test]
async fn test_no_seeds() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("empty.warc.gz");
    let result = crawl(
        create_test_config(1),
        &Vec::<String>::new(),
        &path,
        CancellationToken::new(),
    )
    .await;
    assert!(matches!(result, Err(WarcrawlError::NoSeeds)));
}

#[tokio::test]
async fn test_invalid_seeds_leave_existing_archive_untouched() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("previous.warc.gz");
    std::fs::write(&path, b"previous run").expect("Failed to seed archive");

    let seeds = vec!["ftp://example.com/".to_string(), "not a url".to_string()];
    let result = crawl(create_test_config(1), &seeds, &path, CancellationToken::new()).await;

    assert!(matches!(result, Err(WarcrawlError::NoSeeds)));
    assert_eq!(std::fs::read(&path).unwrap(), b"previous run");
}
