//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small catalog and run the full
//! bootstrap, page, detail and merge cycle end-to-end.

use appid_harvest::config::{Config, CrawlerConfig, OutputFormat};
use appid_harvest::crawler::{Crawler, Phase, ProgressEvent, TaskOutcome};
use appid_harvest::output::export_records;
use appid_harvest::HarvestError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::unbounded_channel;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches one listing page by its `page` query parameter; page 1 has none
struct ListingPage(u32);

impl Match for ListingPage {
    fn matches(&self, request: &Request) -> bool {
        let page = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "page")
            .map(|(_, value)| value.into_owned());

        match page {
            None => self.0 == 1,
            Some(value) => value == self.0.to_string(),
        }
    }
}

/// Creates a test configuration pointed at the mock server
fn create_test_config(server: &MockServer, concurrency: usize, max_retries: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            base_url: format!("{}/appcontrol", server.uri()),
            request_delay: 0.0,
            retry_delay: 0.0,
            request_timeout: 5.0,
            max_retries,
            concurrency,
            ..CrawlerConfig::default()
        },
        ..Config::default()
    }
}

fn row(id: &str, name: &str, summary: &str) -> String {
    format!(
        r#"<div class="row" onclick="location.href = '/appcontrol/{id}'">
             <div class="col-md-3"><b>{name}</b></div>
             <div class="col-md-3"><small>{summary}</small></div>
             <div class="col-md-2"><img alt="black-background-star-icon"></div>
             <div class="col-md-2"><img alt="black-background-star-icon"><img alt="black-background-star-icon"></div>
           </div>"#,
        id = id,
        name = name,
        summary = summary,
    )
}

fn listing(total: usize, rows: &[String]) -> String {
    format!(
        r#"<html><body>
             <p class="m-2">Total: <b>{}</b></p>
             {}
           </body></html>"#,
        total,
        rows.join("\n")
    )
}

fn detail(description: &str, ports: &[&str]) -> String {
    let items: String = ports
        .iter()
        .map(|port| format!("<li>{}</li>", port))
        .collect();
    format!(
        r#"<html><body><h1>App</h1>
             <div class="detail-item"><h3>Description</h3><p>{}</p></div>
             <div class="detail-item"><h3>Default Ports</h3><ul>{}</ul></div>
           </body></html>"#,
        description, items
    )
}

async fn mount_page(server: &MockServer, page: u32, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/appcontrol"))
        .and(ListingPage(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/appcontrol/{}", id)))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Two pages (size 2, total 3); the detail of A2 fails on every attempt
async fn mount_small_catalog(server: &MockServer, a2_attempts: u64) {
    mount_page(
        server,
        1,
        listing(
            3,
            &[row("A1", "Alpha", "first"), row("A2", "Beta", "second")],
        ),
        2,
    )
    .await;
    mount_page(server, 2, listing(3, &[row("A3", "Gamma", "third")]), 1).await;

    mount_detail(
        server,
        "A1",
        ResponseTemplate::new(200).set_body_string(detail("d1", &["80"])),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/appcontrol/A2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(a2_attempts)
        .named("A2 detail")
        .mount(server)
        .await;
    mount_detail(
        server,
        "A3",
        ResponseTemplate::new(200).set_body_string(detail("d3", &["443", "8080"])),
    )
    .await;
}

#[tokio::test]
async fn test_full_harvest_with_failed_detail() {
    let mock_server = MockServer::start().await;
    // max_retries 2: three attempts at A2, verified when the server drops
    mount_small_catalog(&mock_server, 3).await;

    let crawler = Crawler::new(create_test_config(&mock_server, 2, 2)).unwrap();
    let report = crawler.run().await.expect("harvest should succeed");

    let rows: Vec<(&str, &str, &str, String)> = report
        .records
        .iter()
        .map(|r| {
            (
                r.id.as_str(),
                r.name.as_str(),
                r.description.as_str(),
                r.ports_joined(),
            )
        })
        .collect();

    assert_eq!(
        rows,
        vec![
            ("A1", "Alpha", "d1", "80".to_string()),
            ("A2", "Beta", "", "".to_string()),
            ("A3", "Gamma", "d3", "443,8080".to_string()),
        ]
    );

    assert_eq!(report.stats.total_reported, 3);
    assert_eq!(report.stats.pages_planned, 2);
    assert_eq!(report.stats.pages_failed, 0);
    assert_eq!(report.stats.details_planned, 3);
    assert_eq!(report.stats.details_failed, 1);
    assert!(report.stats.is_partial());
}

#[tokio::test]
async fn test_harvest_exports_csv() {
    let mock_server = MockServer::start().await;
    mount_small_catalog(&mock_server, 2).await;

    let crawler = Crawler::new(create_test_config(&mock_server, 3, 1)).unwrap();
    let report = crawler.run().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("appid.csv");
    export_records(&report.records, &output, OutputFormat::Csv).unwrap();

    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        content,
        "App ID,App Name,Description,Default Ports\n\
         A1,Alpha,d1,80\n\
         A2,Beta,,\n\
         A3,Gamma,d3,\"443,8080\"\n"
    );
}

#[tokio::test]
async fn test_bootstrap_failure_aborts_run() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appcontrol"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/appcontrol/.+$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let crawler = Crawler::new(create_test_config(&mock_server, 2, 1)).unwrap();
    let result = crawler.run().await;

    match result {
        Err(HarvestError::Bootstrap { attempts, reason }) => {
            assert_eq!(attempts, 2);
            assert!(reason.contains("503"), "unexpected reason: {}", reason);
        }
        other => panic!("expected bootstrap failure, got {:?}", other.map(|r| r.records)),
    }
}

#[tokio::test]
async fn test_every_page_is_dispatched_once() {
    let mock_server = MockServer::start().await;

    let ids = ["B1", "B2", "B3", "B4", "B5"];
    let rows: Vec<String> = ids.iter().map(|id| row(id, id, "")).collect();

    // Page 1 is read once to bootstrap and once more in the page phase
    mount_page(&mock_server, 1, listing(5, &rows[0..2]), 2).await;
    mount_page(&mock_server, 2, listing(5, &rows[2..4]), 1).await;
    mount_page(&mock_server, 3, listing(5, &rows[4..5]), 1).await;
    mount_page(&mock_server, 4, listing(5, &[]), 0).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/appcontrol/B[0-9]$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail("x", &["53"])))
        .expect(5)
        .mount(&mock_server)
        .await;

    let crawler = Crawler::new(create_test_config(&mock_server, 3, 0)).unwrap();
    let report = crawler.run().await.unwrap();

    let got: Vec<&str> = report.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(got, ids);
    assert_eq!(report.stats.pages_planned, 3);
    assert!(!report.stats.is_partial());
}

#[tokio::test]
async fn test_failed_page_yields_partial_records() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        1,
        listing(4, &[row("C1", "One", ""), row("C2", "Two", "")]),
        2,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/appcontrol"))
        .and(ListingPage(2))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/appcontrol/C[0-9]$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail("c", &[])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let crawler = Crawler::new(create_test_config(&mock_server, 2, 1)).unwrap();
    let report = crawler.run().await.unwrap();

    let got: Vec<&str> = report.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(got, vec!["C1", "C2"]);
    assert_eq!(report.stats.pages_failed, 1);
    assert_eq!(report.stats.total_reported, 4);
    assert!(report.stats.is_partial());
}

#[tokio::test]
async fn test_empty_catalog() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1, listing(0, &[]), 1).await;

    let crawler = Crawler::new(create_test_config(&mock_server, 2, 0)).unwrap();
    let report = crawler.run().await.unwrap();

    assert!(report.records.is_empty());
    assert_eq!(report.stats.pages_planned, 0);
    assert_eq!(report.stats.details_planned, 0);
}

#[tokio::test]
async fn test_duplicate_stubs_across_pages_are_merged() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        1,
        listing(4, &[row("D1", "First", ""), row("D2", "Second", "")]),
        2,
    )
    .await;
    mount_page(
        &mock_server,
        2,
        listing(4, &[row("D2", "Second again", ""), row("D3", "Third", "")]),
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/appcontrol/D2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail("two", &[])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/appcontrol/D[13]$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail("", &[])))
        .mount(&mock_server)
        .await;

    let crawler = Crawler::new(create_test_config(&mock_server, 2, 0)).unwrap();
    let report = crawler.run().await.unwrap();

    let got: Vec<(&str, &str)> = report
        .records
        .iter()
        .map(|r| (r.id.as_str(), r.name.as_str()))
        .collect();
    assert_eq!(got, vec![("D1", "First"), ("D2", "Second"), ("D3", "Third")]);
}

#[tokio::test]
async fn test_concurrent_details_keep_listing_order() {
    let mock_server = MockServer::start().await;

    let rows: Vec<String> = (1..=4).map(|n| row(&format!("E{}", n), "app", "")).collect();
    mount_page(&mock_server, 1, listing(4, &rows), 2).await;

    // Earlier items answer slower so completion order is reversed
    for n in 1..=4u64 {
        mount_detail(
            &mock_server,
            &format!("E{}", n),
            ResponseTemplate::new(200)
                .set_body_string(detail(&format!("e{}", n), &[]))
                .set_delay(Duration::from_millis(50 * (5 - n))),
        )
        .await;
    }

    let crawler = Crawler::new(create_test_config(&mock_server, 4, 0)).unwrap();
    let report = crawler.run().await.unwrap();

    let got: Vec<&str> = report
        .records
        .iter()
        .map(|r| r.description.as_str())
        .collect();
    assert_eq!(got, vec!["e1", "e2", "e3", "e4"]);
}

#[tokio::test]
async fn test_progress_events() {
    let mock_server = MockServer::start().await;
    mount_small_catalog(&mock_server, 2).await;

    let (tx, mut rx) = unbounded_channel();
    let crawler = Crawler::new(create_test_config(&mock_server, 2, 1))
        .unwrap()
        .with_observer(Arc::new(tx));
    crawler.run().await.unwrap();
    drop(crawler);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(
        events[0],
        ProgressEvent::PhaseStarted {
            phase: Phase::Page,
            total: 2
        }
    );
    assert!(events.contains(&ProgressEvent::PhaseStarted {
        phase: Phase::Detail,
        total: 3
    }));

    let finished = |phase: Phase| {
        events
            .iter()
            .filter(|event| {
                matches!(event, ProgressEvent::TaskFinished { phase: p, .. } if *p == phase)
            })
            .count()
    };
    assert_eq!(finished(Phase::Page), 2);
    assert_eq!(finished(Phase::Detail), 3);

    let a2 = events.iter().find_map(|event| match event {
        ProgressEvent::TaskFinished { key, outcome, .. } if key == "A2" => Some(outcome.clone()),
        _ => None,
    });
    assert!(matches!(
        a2,
        Some(TaskOutcome::Failed { attempts: 2, .. })
    ));

    let detail_successes = events
        .iter()
        .filter(|event| {
            matches!(event, ProgressEvent::TaskFinished { phase: Phase::Detail, outcome, .. } if outcome.is_success())
        })
        .count();
    assert_eq!(detail_successes, 2);
}

const GARBLED: &str = "<html><body><pre>upstream maintenance</pre></body></html>";

#[tokio::test]
async fn test_unparseable_pages_are_refetched() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        1,
        listing(
            3,
            &[row("A1", "Alpha", "first"), row("A2", "Beta", "second")],
        ),
        2,
    )
    .await;

    // First answer for page 2 and for A2 has no recognisable structure
    Mock::given(method("GET"))
        .and(path("/appcontrol"))
        .and(ListingPage(2))
        .respond_with(ResponseTemplate::new(200).set_body_string(GARBLED))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, 2, listing(3, &[row("A3", "Gamma", "third")]), 1).await;

    Mock::given(method("GET"))
        .and(path("/appcontrol/A2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(GARBLED))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_detail(
        &mock_server,
        "A2",
        ResponseTemplate::new(200).set_body_string(detail("d2", &["22"])),
    )
    .await;
    for id in ["A1", "A3"] {
        mount_detail(
            &mock_server,
            id,
            ResponseTemplate::new(200).set_body_string(detail("ok", &[])),
        )
        .await;
    }

    let crawler = Crawler::new(create_test_config(&mock_server, 1, 1)).unwrap();
    let report = crawler.run().await.unwrap();

    let got: Vec<(&str, &str)> = report
        .records
        .iter()
        .map(|r| (r.id.as_str(), r.description.as_str()))
        .collect();
    assert_eq!(got, vec![("A1", "ok"), ("A2", "d2"), ("A3", "ok")]);
    assert_eq!(report.stats.pages_failed, 0);
    assert_eq!(report.stats.details_failed, 0);
}

#[tokio::test]
async fn test_timed_out_detail_is_retried() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1, listing(1, &[row("T1", "Slow", "")]), 2).await;

    Mock::given(method("GET"))
        .and(path("/appcontrol/T1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail("late", &[]))
                .set_delay(Duration::from_millis(1500)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_detail(
        &mock_server,
        "T1",
        ResponseTemplate::new(200).set_body_string(detail("on time", &["8443"])),
    )
    .await;

    let mut config = create_test_config(&mock_server, 1, 1);
    config.crawler.request_timeout = 0.3;

    let report = Crawler::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].description, "on time");
    assert_eq!(report.records[0].ports, vec!["8443"]);
    assert_eq!(report.stats.details_failed, 0);
}
