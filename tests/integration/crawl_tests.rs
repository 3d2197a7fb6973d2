//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a paginated mock catalog and run the
//! full crawl cycle against a SQLite database and checkpoint on disk.

use chrono::Utc;
use parts_validator::catalog::{CatalogClient, CatalogError, Credentials};
use parts_validator::checkpoint::{CheckpointStore, CrawlCheckpoint, PaginationMeta};
use parts_validator::crawler::{CrawlSettings, CrawlState, Crawler};
use parts_validator::storage::{SqliteStorage, Storage};
use parts_validator::validator::validate_items;
use parts_validator::{exit_codes, LoopKind, ValidatorError};
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Serves a fixed page and trips the cancellation token, as an operator
/// pressing Ctrl-C while the request is in flight would
struct CancelOnServe {
    token: CancellationToken,
    body: Value,
}

impl Respond for CancelOnServe {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.token.cancel();
        ResponseTemplate::new(200).set_body_json(self.body.clone())
    }
}

struct TestEnv {
    _dir: TempDir,
    storage: SqliteStorage,
    checkpoints: CheckpointStore,
}

impl TestEnv {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let storage =
            SqliteStorage::new(&dir.path().join("parts.db")).expect("Failed to open DB");
        let checkpoints = CheckpointStore::new(dir.path().join("validator_status.json"));
        Self {
            _dir: dir,
            storage,
            checkpoints,
        }
    }

    fn crawler(
        &mut self,
        start_url: &str,
        cancel: CancellationToken,
    ) -> Crawler<'_, SqliteStorage> {
        let settings = settings(start_url);
        self.crawler_with(settings, cancel)
    }

    fn crawler_with(
        &mut self,
        settings: CrawlSettings,
        cancel: CancellationToken,
    ) -> Crawler<'_, SqliteStorage> {
        let client = CatalogClient::new(&Credentials {
            client_id: "test-client".to_string(),
            authorization: "Bearer test-token".to_string(),
        })
        .expect("Failed to build client");

        Crawler::new(
            client,
            &mut self.storage,
            self.checkpoints.clone(),
            settings,
            cancel,
        )
    }
}

fn settings(start_url: &str) -> CrawlSettings {
    CrawlSettings {
        start_url: start_url.to_string(),
        request_delay: Duration::ZERO,
        cooldown: chrono::Duration::weeks(1),
        show_progress: false,
    }
}

fn part(id: &str, mpn: &str) -> Value {
    json!({
        "id": id,
        "type": "parts",
        "attributes": {
            "mpn": mpn,
            "manufacturer": "Microchip Technology",
            "description": format!("{} microcontroller", mpn),
            "datasheet": format!("https://datasheets.test/{}.pdf", mpn)
        }
    })
}

fn page(offset: i64, total: i64, parts: Vec<Value>, next: Option<String>) -> Value {
    json!({
        "meta": {"offset": offset, "total": total, "limit": 2},
        "data": parts,
        "links": {"next": next}
    })
}

async fn mount_page(server: &MockServer, page_path: &str, body: Value, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_completes() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/parts"))
        .and(header("client-id", "test-client"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            0,
            5,
            vec![part("1", "ATMEGA328P"), part("2", "ATMEGA644")],
            Some(format!("{}/parts/page/2", base)),
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/parts/page/2",
        page(
            2,
            5,
            vec![part("3", "ATTINY85"), part("4", "PIC16F84A")],
            Some(format!("{}/parts/page/3", base)),
        ),
        1,
    )
    .await;
    mount_page(&server, "/parts/page/3", page(4, 5, vec![part("5", "NE555P")], None), 1).await;

    let mut env = TestEnv::new();
    {
        let mut crawler = env.crawler(&format!("{}/parts", base), CancellationToken::new());
        let report = crawler.run().await.expect("Crawl failed");

        assert_eq!(report.state, CrawlState::Completed);
        assert_eq!(report.pages_fetched, 3);
        assert_eq!(report.records_written, 5);
        assert!(!report.was_skipped());
        assert_eq!(crawler.state(), CrawlState::Completed);
    }

    assert_eq!(env.storage.count_parts().unwrap(), 5);

    let checkpoint = env.checkpoints.load().expect("Checkpoint missing");
    assert!(checkpoint.is_finished());
    assert!(checkpoint.pending_urls().is_empty());
}

#[tokio::test]
async fn test_offset_not_advancing_fails() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/parts",
        page(50, 200, vec![part("1", "LM358N")], Some(format!("{}/parts/page/2", base))),
        1,
    )
    .await;
    mount_page(
        &server,
        "/parts/page/2",
        page(50, 200, vec![part("2", "LM393N")], Some(format!("{}/parts/page/3", base))),
        1,
    )
    .await;
    mount_page(&server, "/parts/page/3", page(100, 200, vec![], None), 0).await;

    let mut env = TestEnv::new();
    {
        let mut crawler = env.crawler(&format!("{}/parts", base), CancellationToken::new());
        let err = crawler.run().await.unwrap_err();

        assert!(matches!(
            err,
            ValidatorError::LoopDetected {
                kind: LoopKind::OffsetNotAdvancing {
                    previous: 50,
                    received: 50
                },
                ..
            }
        ));
        assert_eq!(err.exit_code(), exit_codes::OFFSET_LOOP);
        assert_eq!(crawler.state(), CrawlState::Failed);
    }

    // The checkpoint still reflects the last fully processed page
    let checkpoint = env.checkpoints.load().expect("Checkpoint missing");
    assert!(!checkpoint.is_finished());
    assert_eq!(
        checkpoint.pending_urls(),
        &[format!("{}/parts/page/2", base)]
    );
    assert_eq!(checkpoint.meta.map(|m| m.offset), Some(50));
    assert_eq!(env.storage.count_parts().unwrap(), 1);
}

#[tokio::test]
async fn test_self_referential_next_fails() {
    let server = MockServer::start().await;
    let base = server.uri();
    let start_url = format!("{}/parts", base);

    mount_page(
        &server,
        "/parts",
        json!({"data": [part("1", "BC547")], "links": {"next": start_url.clone()}}),
        1,
    )
    .await;

    let mut env = TestEnv::new();
    let mut crawler = env.crawler(&start_url, CancellationToken::new());
    let err = crawler.run().await.unwrap_err();

    assert!(matches!(
        err,
        ValidatorError::LoopDetected {
            kind: LoopKind::SelfReferentialNext,
            ..
        }
    ));
    assert_eq!(err.exit_code(), exit_codes::NEXT_URL_LOOP);
    assert_eq!(crawler.state(), CrawlState::Failed);
}

#[tokio::test]
async fn test_recent_finish_skips_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/parts", page(0, 1, vec![part("1", "NE555P")], None), 0).await;

    let mut env = TestEnv::new();
    env.checkpoints
        .save(Vec::new(), PaginationMeta::unknown(), true)
        .unwrap();
    assert!(env.checkpoints.load().unwrap().is_finished());

    let mut crawler = env.crawler(&format!("{}/parts", base), CancellationToken::new());
    let report = crawler.run().await.expect("Crawl failed");

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(report.pages_fetched, 0);
    assert!(report.was_skipped());
}

#[tokio::test]
async fn test_oversized_cooldown_never_recrawls() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/parts", page(0, 1, vec![part("1", "NE555P")], None), 0).await;

    let mut env = TestEnv::new();
    env.checkpoints
        .save(Vec::new(), PaginationMeta::unknown(), true)
        .unwrap();

    let mut settings = settings(&format!("{}/parts", base));
    settings.cooldown = chrono::Duration::days(4_000_000_000);

    let mut crawler = env.crawler_with(settings, CancellationToken::new());
    let report = crawler.run().await.expect("Crawl failed");

    assert_eq!(report.state, CrawlState::Completed);
    assert!(report.was_skipped());
    assert_eq!(report.pages_fetched, 0);
}

#[tokio::test]
async fn test_elapsed_cooldown_starts_new_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/parts", page(0, 1, vec![part("1", "NE555P")], None), 1).await;

    let mut env = TestEnv::new();
    let finished = Utc::now() - chrono::Duration::days(8);
    env.checkpoints
        .write(&CrawlCheckpoint::finished_at(finished))
        .unwrap();

    {
        let mut crawler = env.crawler(&format!("{}/parts", base), CancellationToken::new());
        let report = crawler.run().await.expect("Crawl failed");
        assert_eq!(report.state, CrawlState::Completed);
        assert_eq!(report.pages_fetched, 1);
    }

    let checkpoint = env.checkpoints.load().unwrap();
    assert!(checkpoint.finished.unwrap() > finished);
}

#[tokio::test]
async fn test_cancellation_then_resume() {
    let server = MockServer::start().await;
    let base = server.uri();
    let cancel = CancellationToken::new();

    Mock::given(method("GET"))
        .and(path("/parts"))
        .respond_with(CancelOnServe {
            token: cancel.clone(),
            body: page(
                0,
                3,
                vec![part("1", "ATMEGA328P"), part("2", "ATMEGA644")],
                Some(format!("{}/parts/page/2", base)),
            ),
        })
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/parts/page/2", page(2, 3, vec![part("3", "ATTINY85")], None), 1).await;

    let mut env = TestEnv::new();
    let start_url = format!("{}/parts", base);

    {
        let mut crawler = env.crawler(&start_url, cancel);
        let report = crawler.run().await.expect("Interrupted crawl is not an error");

        assert_eq!(report.state, CrawlState::Interrupted);
        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.pending_urls, vec![format!("{}/parts/page/2", base)]);
    }

    let checkpoint = env.checkpoints.load().expect("Checkpoint missing");
    assert!(!checkpoint.is_finished());
    assert_eq!(
        checkpoint.pending_urls(),
        &[format!("{}/parts/page/2", base)]
    );
    assert_eq!(env.storage.count_parts().unwrap(), 2);

    // A fresh run picks up exactly where the last one stopped
    {
        let mut crawler = env.crawler(&start_url, CancellationToken::new());
        let report = crawler.run().await.expect("Resumed crawl failed");

        assert_eq!(report.state, CrawlState::Completed);
        assert_eq!(report.pages_fetched, 1);
    }

    assert_eq!(env.storage.count_parts().unwrap(), 3);
    assert!(env.checkpoints.load().unwrap().is_finished());
}

#[tokio::test]
async fn test_cancellation_cuts_pacing_short() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/parts",
        page(0, 2, vec![part("1", "LM317T")], Some(format!("{}/parts/page/2", base))),
        1,
    )
    .await;
    mount_page(&server, "/parts/page/2", page(1, 2, vec![part("2", "LM337T")], None), 0).await;

    let mut settings = settings(&format!("{}/parts", base));
    settings.request_delay = Duration::from_secs(600);

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        canceller.cancel();
    });

    let mut env = TestEnv::new();
    {
        let mut crawler = env.crawler_with(settings, cancel);
        let report = tokio::time::timeout(Duration::from_secs(10), crawler.run())
            .await
            .expect("Pacing sleep ignored cancellation")
            .expect("Interrupted crawl is not an error");

        assert_eq!(report.state, CrawlState::Interrupted);
        assert_eq!(report.pages_fetched, 1);
    }

    let checkpoint = env.checkpoints.load().unwrap();
    assert!(!checkpoint.is_finished());
    assert_eq!(
        checkpoint.pending_urls(),
        &[format!("{}/parts/page/2", base)]
    );
}

#[tokio::test]
async fn test_cancelled_before_start_fetches_nothing() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/parts", page(0, 1, vec![], None), 0).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut env = TestEnv::new();
    let start_url = format!("{}/parts", base);
    {
        let mut crawler = env.crawler(&start_url, cancel);
        let report = crawler.run().await.unwrap();
        assert_eq!(report.state, CrawlState::Interrupted);
        assert_eq!(report.pages_fetched, 0);
    }

    assert_eq!(env.checkpoints.load().unwrap().pending_urls(), &[start_url]);
}

#[tokio::test]
async fn test_server_error_is_transport_failure() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/parts",
        page(0, 4, vec![part("1", "LM7805")], Some(format!("{}/parts/page/2", base))),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/parts/page/2"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let mut env = TestEnv::new();
    {
        let mut crawler = env.crawler(&format!("{}/parts", base), CancellationToken::new());
        let err = crawler.run().await.unwrap_err();

        match &err {
            ValidatorError::Catalog(CatalogError::Status { status, body, .. }) => {
                assert_eq!(*status, 503);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("Expected status error, got {:?}", other),
        }
        assert_eq!(err.exit_code(), exit_codes::TRANSPORT);
    }

    // The failed page stays queued for the next run
    let checkpoint = env.checkpoints.load().unwrap();
    assert_eq!(
        checkpoint.pending_urls(),
        &[format!("{}/parts/page/2", base)]
    );
}

#[tokio::test]
async fn test_same_external_id_is_updated_not_duplicated() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/parts",
        page(0, 2, vec![part("42", "ATMEGA328P")], Some(format!("{}/parts/page/2", base))),
        1,
    )
    .await;
    mount_page(
        &server,
        "/parts/page/2",
        page(1, 2, vec![part("42", "ATMEGA328P-PU")], None),
        1,
    )
    .await;

    let mut env = TestEnv::new();
    {
        let mut crawler = env.crawler(&format!("{}/parts", base), CancellationToken::new());
        crawler.run().await.expect("Crawl failed");
    }

    assert_eq!(env.storage.count_parts().unwrap(), 1);
    let stored = env.storage.get_part_by_external_id("42").unwrap().unwrap();
    assert_eq!(stored.mpn, "ATMEGA328P-PU");
    assert_eq!(stored.datasheet, "https://datasheets.test/ATMEGA328P-PU.pdf");
}

#[tokio::test]
async fn test_crawl_then_validate() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/parts",
        page(
            0,
            3,
            vec![
                part("1", "ATMEGA328P"),
                part("2", "ATMEGA644"),
                part("3", "ATMEGA328P-AU"),
            ],
            None,
        ),
        1,
    )
    .await;

    let mut env = TestEnv::new();
    let item = env.storage.insert_item("ATMEGA328", Some("main.kicad_sch")).unwrap();
    env.storage.insert_item("10uF", Some("main.kicad_sch")).unwrap();

    {
        let mut crawler = env.crawler(&format!("{}/parts", base), CancellationToken::new());
        crawler.run().await.expect("Crawl failed");
    }

    let summary = validate_items(&mut env.storage, false).unwrap();
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.without_candidates, 1);

    let expected = env.storage.get_part_by_external_id("1").unwrap().unwrap();
    let items = env.storage.get_items().unwrap();
    let linked = items.iter().find(|i| i.id == item).unwrap();
    assert_eq!(linked.part_id, Some(expected.id));
}
