//! Integration tests for a full fetch-compare run
//!
//! Static pages come from wiremock servers; rendered pages come from stub
//! renderers so no browser is needed.

use async_trait::async_trait;
use pagediff::notify::Notifier;
use pagediff::run::run;
use pagediff::{
    Difference, DynamicFetcher, FetchError, FetchResult, Fetcher, NotifyError, Pipeline, Renderer,
    RetryPolicy, SqliteStore, StaticFetcher, SummaryStore,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Returns canned markup per URL; unknown URLs fail to render
struct StubRenderer {
    pages: HashMap<String, String>,
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        self.pages.get(url).cloned().ok_or_else(|| {
            FetchError::Render(format!("navigation timeout after {}ms", timeout.as_millis()))
        })
    }
}

/// Canned fetch results for hosts that cannot be served locally
struct CannedFetcher {
    pages: HashMap<String, String>,
    error: fn(String) -> FetchError,
}

#[async_trait]
impl Fetcher for CannedFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        match self.pages.get(url) {
            Some(html) => FetchResult::fetched(url, html.as_str()),
            None => FetchResult::failed(url, (self.error)("unreachable".to_string())),
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    received: Mutex<Vec<Vec<Difference>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, differences: &[Difference]) -> Result<(), NotifyError> {
        self.received.lock().unwrap().push(differences.to_vec());
        Ok(())
    }
}

fn pages(list: &[(&str, &str)]) -> HashMap<String, String> {
    list.iter()
        .map(|(url, html)| (url.to_string(), html.to_string()))
        .collect()
}

fn quick_static_fetcher() -> StaticFetcher {
    StaticFetcher::with_client(
        reqwest::Client::new(),
        RetryPolicy::new(Duration::from_millis(5), 0.001, Duration::from_millis(20), 3),
    )
}

fn stub_dynamic_fetcher(rendered: HashMap<String, String>) -> DynamicFetcher {
    DynamicFetcher::new(
        Arc::new(StubRenderer { pages: rendered }),
        2,
        Duration::from_secs(10),
        Duration::from_secs(30),
    )
}

#[tokio::test]
async fn test_two_url_scenario() {
    let pipeline = Pipeline::new(
        Arc::new(CannedFetcher {
            pages: pages(&[
                ("http://a.test", "<title>A</title>"),
                ("http://b.test", "<title>B</title>"),
            ]),
            error: FetchError::Network,
        }),
        Arc::new(CannedFetcher {
            pages: pages(&[("http://a.test", "<title>A2</title>")]),
            error: FetchError::Render,
        }),
    );
    let notifier = RecordingNotifier::default();
    let urls = vec!["http://a.test".to_string(), "http://b.test".to_string()];

    let report = run(&urls, &pipeline, None, &notifier).await;

    let static_titles: Vec<_> = report
        .static_data
        .iter()
        .map(|p| (p.url.as_str(), p.title.as_str()))
        .collect();
    assert_eq!(static_titles, [("http://a.test", "A"), ("http://b.test", "B")]);

    assert_eq!(report.dynamic_data.len(), 1);
    assert_eq!(report.dynamic_data[0].url, "http://a.test");
    assert_eq!(report.dynamic_data[0].title, "A2");

    assert_eq!(report.differences.len(), 1);
    let diff = &report.differences[0];
    assert_eq!(diff.url, "http://a.test");
    assert_eq!(diff.static_title, "A");
    assert_eq!(diff.dynamic_title, "A2");

    let received = notifier.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], report.differences);
}

#[tokio::test]
async fn test_full_run_against_http_server() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><title>Home</title>
               <meta name="description" content="Welcome"></head>
               <body><h1>Hello</h1></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>About</title></head><body><h1>About us</h1></body></html>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let home = format!("{}/home", base);
    let about = format!("{}/about", base);
    let broken = format!("{}/broken", base);

    let rendered = pages(&[
        (
            home.as_str(),
            r#"<html><head><title>Home | v2</title>
               <meta name="description" content="Welcome"></head>
               <body><h1>Hello</h1><h2>Injected</h2></body></html>"#,
        ),
        (
            about.as_str(),
            "<html><head><title>About</title></head><body><h1>About us</h1></body></html>",
        ),
        (broken.as_str(), "<html><head><title>Rendered anyway</title></head></html>"),
    ]);

    let pipeline = Pipeline::new(
        Arc::new(quick_static_fetcher()),
        Arc::new(stub_dynamic_fetcher(rendered)),
    );
    let dir = tempfile::tempdir().unwrap();
    let mut store = SqliteStore::open(&dir.path().join("webdata.db")).unwrap();
    let notifier = RecordingNotifier::default();
    let urls = vec![home.clone(), about.clone(), broken.clone()];

    let report = run(&urls, &pipeline, Some(&mut store), &notifier).await;

    assert_eq!(report.static_data.len(), 3);
    assert_eq!(report.static_data[0].headings, "Hello");
    assert_eq!(report.static_data[2].title, "Failed to parse");
    assert_eq!(report.dynamic_data.len(), 3);

    // "Failed to parse" differs from the rendered title as well
    let changed: Vec<_> = report.differences.iter().map(|d| d.url.as_str()).collect();
    assert_eq!(changed, [home.as_str(), broken.as_str()]);
    assert_eq!(report.differences[0].changed_fields(), vec!["title", "headings"]);

    assert_eq!(store.len().unwrap(), 3);
    assert_eq!(store.get(&home).unwrap().unwrap().title, "Home | v2");
    assert_eq!(store.get(&broken).unwrap().unwrap().title, "Rendered anyway");
    assert_eq!(notifier.received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_render_failures_are_excluded_not_defaulted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Static</title>"))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(
        Arc::new(quick_static_fetcher()),
        Arc::new(stub_dynamic_fetcher(HashMap::new())),
    );
    let notifier = RecordingNotifier::default();
    let urls = vec![format!("{}/x", server.uri()), format!("{}/y", server.uri())];

    let report = run(&urls, &pipeline, None, &notifier).await;

    assert_eq!(report.static_data.len(), 2);
    assert!(report.static_data.iter().all(|p| p.title == "Static"));
    assert!(report.dynamic_data.is_empty());
    assert!(report.differences.is_empty());
    assert!(notifier.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_static_retry_attempt_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let result = quick_static_fetcher().fetch(&server.uri()).await;

    assert!(matches!(result.error(), Some(FetchError::Network(_))));
    assert!(result.raw_content().is_none());
    server.verify().await;
}

#[tokio::test]
async fn test_report_serializes_for_stdout() {
    let pipeline = Pipeline::new(
        Arc::new(CannedFetcher {
            pages: pages(&[("http://a.test", "<title>A</title><h1>x</h1>")]),
            error: FetchError::Network,
        }),
        Arc::new(CannedFetcher {
            pages: pages(&[("http://a.test", "<title>A</title><h1>y</h1>")]),
            error: FetchError::Render,
        }),
    );

    let report = run(
        &["http://a.test".to_string()],
        &pipeline,
        None,
        &RecordingNotifier::default(),
    )
    .await;
    let json = report.render(pagediff::OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["static_data"][0]["headings"], "x");
    assert_eq!(value["dynamic_data"][0]["headings"], "y");
    assert_eq!(value["differences"][0]["static_headings"], "x");
    assert_eq!(value["differences"][0]["dynamic_headings"], "y");
}

#[tokio::test]
async fn test_empty_bodies_count_as_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/late"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let empty = format!("{}/empty", server.uri());
    let late = format!("{}/late", server.uri());
    let rendered = pages(&[
        (empty.as_str(), ""),
        (
            late.as_str(),
            r#"<title>Late</title><meta name="description" content="Filled by script">"#,
        ),
    ]);

    let pipeline = Pipeline::new(
        Arc::new(quick_static_fetcher()),
        Arc::new(stub_dynamic_fetcher(rendered)),
    );
    let urls = vec![empty.clone(), late.clone()];

    let report = run(&urls, &pipeline, None, &RecordingNotifier::default()).await;

    assert!(report
        .static_data
        .iter()
        .all(|p| p.title == "Failed to parse" && p.meta_description.is_empty()));
    assert_eq!(report.dynamic_data.len(), 1);
    assert_eq!(report.dynamic_data[0].url, late);

    // only the title differs: an empty static description is never compared
    assert_eq!(report.differences.len(), 1);
    assert_eq!(report.differences[0].changed_fields(), vec!["title"]);
}
