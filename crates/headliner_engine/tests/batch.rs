use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use headliner_engine::{
    BatchError, ExtractionRules, FailureKind, FetchFailure, FetchedPage, Fetcher,
    SnippetExtractor, SnippetHarvester,
};

fn page_with_snippet(snippet: &str) -> FetchedPage {
    FetchedPage {
        bytes: format!(
            r#"<html><body><div class="et_pb_header_content_wrapper"><p>{snippet}</p></div></body></html>"#
        )
        .into_bytes(),
        content_type: Some("text/html; charset=utf-8".to_string()),
    }
}

/// Serves canned outcomes per URL and records the peak number of fetches
/// that were in flight at the same time.
struct ScriptedFetcher {
    pages: HashMap<String, Result<FetchedPage, FetchFailure>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    fn new(pages: HashMap<String, Result<FetchedPage, FetchFailure>>, delay: Duration) -> Self {
        Self {
            pages,
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn max_seen(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchFailure> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.pages.get(url).cloned().unwrap_or_else(|| {
            Err(FetchFailure {
                url: url.to_string(),
                kind: FailureKind::Network,
                message: "unscripted url".to_string(),
            })
        })
    }
}

fn network_failure(url: &str) -> Result<FetchedPage, FetchFailure> {
    Err(FetchFailure {
        url: url.to_string(),
        kind: FailureKind::Network,
        message: "connection refused".to_string(),
    })
}

fn harvester(urls: Vec<&str>, fetcher: Arc<ScriptedFetcher>) -> SnippetHarvester {
    let rules = ExtractionRules::default_rules().unwrap();
    let extractor = Arc::new(SnippetExtractor::new(fetcher, rules));
    SnippetHarvester::new(urls.into_iter().map(str::to_string).collect(), extractor)
}

#[tokio::test]
async fn every_url_yields_exactly_one_outcome() {
    headliner_logging::initialize_for_tests();

    let mut pages = HashMap::new();
    pages.insert("u1".to_string(), Ok(page_with_snippet("one")));
    pages.insert("u2".to_string(), network_failure("u2"));
    pages.insert("u3".to_string(), Ok(page_with_snippet("three")));
    pages.insert("u4".to_string(), network_failure("u4"));
    pages.insert("u5".to_string(), Ok(page_with_snippet("five")));

    let fetcher = Arc::new(ScriptedFetcher::new(pages, Duration::ZERO));
    let harvester = harvester(vec!["u1", "u2", "u3", "u4", "u5"], fetcher);

    for wave_size in 1..=5 {
        let report = harvester
            .fetch_all(wave_size, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.success_count + report.error_count, 5);
        assert_eq!(report.success_count, 3);
        assert_eq!(report.error_count, 2);
        assert_eq!(report.success_items.len(), report.success_count);
        assert_eq!(report.error_items.len(), report.error_count);
    }
}

#[tokio::test]
async fn four_urls_in_two_waves_collect_all_snippets() {
    let expected = ["alpha", "beta", "gamma", "delta"];
    let mut pages = HashMap::new();
    for (i, snippet) in expected.iter().enumerate() {
        pages.insert(format!("u{i}"), Ok(page_with_snippet(snippet)));
    }

    let fetcher = Arc::new(ScriptedFetcher::new(pages, Duration::from_millis(10)));
    let harvester = harvester(vec!["u0", "u1", "u2", "u3"], fetcher);

    let report = harvester
        .fetch_all(2, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.success_count, 4);
    assert_eq!(report.error_count, 0);
    // Completion order is nondeterministic, so compare as sets.
    let mut got = report.success_items.clone();
    got.sort();
    let mut want: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    want.sort();
    assert_eq!(got, want);
}

#[tokio::test]
async fn single_connection_failure_is_reported_as_network() {
    let mut pages = HashMap::new();
    pages.insert("down".to_string(), network_failure("down"));

    let fetcher = Arc::new(ScriptedFetcher::new(pages, Duration::ZERO));
    let harvester = harvester(vec!["down"], fetcher);

    let report = harvester
        .fetch_all(1, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.success_count, 0);
    assert_eq!(report.error_count, 1);
    assert_eq!(report.error_items[0].kind, FailureKind::Network);
    assert!(report.error_messages()[0].contains("network error"));
}

#[tokio::test]
async fn zero_workers_is_rejected() {
    let fetcher = Arc::new(ScriptedFetcher::new(HashMap::new(), Duration::ZERO));
    let harvester = harvester(vec!["u1"], fetcher);

    let err = harvester
        .fetch_all(0, CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, BatchError::InvalidWorkerCount(0));
}

#[tokio::test]
async fn in_flight_fetches_never_exceed_wave_size() {
    let mut pages = HashMap::new();
    for i in 0..6 {
        pages.insert(format!("u{i}"), Ok(page_with_snippet("x")));
    }

    // The delay forces units within a wave to overlap, so a bound
    // violation would register on the counter.
    let fetcher = Arc::new(ScriptedFetcher::new(pages, Duration::from_millis(50)));
    let urls = vec!["u0", "u1", "u2", "u3", "u4", "u5"];
    let harvester = harvester(urls, fetcher.clone());

    let report = harvester
        .fetch_all(2, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.success_count, 6);
    assert!(
        fetcher.max_seen() <= 2,
        "saw {} concurrent fetches with wave size 2",
        fetcher.max_seen()
    );
}

#[tokio::test]
async fn repeated_runs_are_content_equal() {
    let mut pages = HashMap::new();
    pages.insert("a".to_string(), Ok(page_with_snippet("stable")));
    pages.insert("b".to_string(), network_failure("b"));
    pages.insert("c".to_string(), Ok(page_with_snippet("other")));

    let fetcher = Arc::new(ScriptedFetcher::new(pages, Duration::from_millis(5)));
    let harvester = harvester(vec!["a", "b", "c"], fetcher);

    let first = harvester
        .fetch_all(3, CancellationToken::new())
        .await
        .unwrap();
    let second = harvester
        .fetch_all(3, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.success_count, second.success_count);
    assert_eq!(first.error_count, second.error_count);

    let mut first_items = first.success_items;
    let mut second_items = second.success_items;
    first_items.sort();
    second_items.sort();
    assert_eq!(first_items, second_items);
}

/// A transport that never completes until cancelled.
struct StalledFetcher {
    started: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl Fetcher for StalledFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchFailure> {
        self.started.lock().unwrap().push(url.to_string());
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(page_with_snippet("never"))
    }
}

#[tokio::test]
async fn cancellation_aborts_in_flight_fetches() {
    let started = Arc::new(Mutex::new(Vec::new()));
    let fetcher = Arc::new(StalledFetcher {
        started: started.clone(),
    });
    let rules = ExtractionRules::default_rules().unwrap();
    let extractor = Arc::new(SnippetExtractor::new(fetcher, rules));
    let harvester = SnippetHarvester::new(
        vec!["u0".to_string(), "u1".to_string(), "u2".to_string()],
        extractor,
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let begun = Instant::now();
    let report = harvester.fetch_all(3, cancel).await.unwrap();

    // All three fetches started, none finished; cancellation must not
    // wait out the transport.
    assert!(begun.elapsed() < Duration::from_secs(10));
    assert_eq!(started.lock().unwrap().len(), 3);
    assert_eq!(report.success_count, 0);
    assert_eq!(report.error_count, 0);
}

#[tokio::test]
async fn pre_cancelled_batch_launches_nothing() {
    let started = Arc::new(Mutex::new(Vec::new()));
    let fetcher = Arc::new(StalledFetcher {
        started: started.clone(),
    });
    let rules = ExtractionRules::default_rules().unwrap();
    let extractor = Arc::new(SnippetExtractor::new(fetcher, rules));
    let harvester = SnippetHarvester::new(vec!["u0".to_string()], extractor);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = harvester.fetch_all(1, cancel).await.unwrap();
    assert_eq!(report.success_count + report.error_count, 0);
    assert!(started.lock().unwrap().is_empty());
}
