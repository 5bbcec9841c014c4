use super::*;
use async_trait::async_trait;
use review_stream_sources::TransportError;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

type PageKey = (SortDirection, Option<String>);

enum Scripted {
    Page(Vec<u8>),
    Garbage,
    HttpError(u16),
    /// Fails with a timeout this many times, then serves the page.
    FlakyThenPage(u32, Vec<u8>),
}

/// Scripted transport: every (direction, token) pair maps to one response.
/// Unknown pairs answer 404 so a test that walks off its script fails loudly.
struct MockTransport {
    script: StdMutex<HashMap<PageKey, Scripted>>,
    fetch_log: StdMutex<Vec<PageKey>>,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            script: StdMutex::new(HashMap::new()),
            fetch_log: StdMutex::new(Vec::new()),
        }
    }

    fn insert(&self, direction: SortDirection, token: Option<&str>, response: Scripted) {
        self.script
            .lock()
            .unwrap()
            .insert((direction, token.map(String::from)), response);
    }

    fn fetches_for(&self, direction: SortDirection) -> usize {
        self.fetch_log
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _)| *d == direction)
            .count()
    }
}

#[async_trait]
impl PageTransport for MockTransport {
    async fn fetch_page(
        &self,
        direction: SortDirection,
        token: Option<&str>,
    ) -> Result<Vec<u8>, TransportError> {
        let key = (direction, token.map(String::from));
        self.fetch_log.lock().unwrap().push(key.clone());

        let mut script = self.script.lock().unwrap();
        match script.get_mut(&key) {
            Some(Scripted::Page(bytes)) => Ok(bytes.clone()),
            Some(Scripted::Garbage) => Ok(b")]}'\nnot json at all".to_vec()),
            Some(Scripted::HttpError(status)) => Err(TransportError::Status {
                status: *status,
                url: "mock://listugcposts".to_string(),
            }),
            Some(Scripted::FlakyThenPage(failures_left, bytes)) => {
                if *failures_left == 0 {
                    Ok(bytes.clone())
                } else {
                    *failures_left -= 1;
                    Err(TransportError::Timeout {
                        url: "mock://listugcposts".to_string(),
                    })
                }
            }
            None => Err(TransportError::Status {
                status: 404,
                url: "mock://listugcposts".to_string(),
            }),
        }
    }
}

fn rid(prefix: &str, n: u32) -> String {
    format!("{prefix}review{n:04}padpadpadpad")
}

fn review_record(id: &str) -> Value {
    json!([
        [id, [null, null, 1700000000000000i64]],
        [
            [[4]],
            ["en"],
            [format!("Plenty of thoughtful detail about {id}."), null, [0, 30]]
        ]
    ])
}

/// Record with a valid identity but neither text nor rating.
fn contentless_record(id: &str) -> Value {
    json!([[id]])
}

fn page_bytes(next_token: Option<&str>, records: &[Value]) -> Vec<u8> {
    let root = json!([null, next_token, records]);
    let mut bytes = b")]}'\n".to_vec();
    bytes.extend_from_slice(root.to_string().as_bytes());
    bytes
}

fn record_page(next_token: Option<&str>, ids: &[String]) -> Vec<u8> {
    let records: Vec<Value> = ids.iter().map(|id| review_record(id)).collect();
    page_bytes(next_token, &records)
}

fn quick_config() -> PipelineConfig {
    PipelineConfig {
        page_delay_ms: 0,
        initial_backoff_ms: 1,
        max_backoff_ms: 4,
        ..PipelineConfig::default()
    }
}

fn unique_ids(reviews: &[Review]) -> HashSet<String> {
    reviews.iter().map(|r| r.review_id.clone()).collect()
}

#[tokio::test]
async fn test_two_directions_merge_and_dedup() {
    let shared_ids: Vec<String> = (0..3).map(|n| rid("s", n)).collect();
    let transport = MockTransport::new();

    let mut highest_tail: Vec<String> = (5..7).map(|n| rid("h", n)).collect();
    highest_tail.extend(shared_ids.clone());
    transport.insert(
        SortDirection::HighestRated,
        None,
        Scripted::Page(record_page(
            Some("h-2"),
            &(0..5).map(|n| rid("h", n)).collect::<Vec<_>>(),
        )),
    );
    transport.insert(
        SortDirection::HighestRated,
        Some("h-2"),
        Scripted::Page(record_page(None, &highest_tail)),
    );

    let mut lowest_tail: Vec<String> = (5..7).map(|n| rid("l", n)).collect();
    lowest_tail.extend(shared_ids);
    transport.insert(
        SortDirection::LowestRated,
        None,
        Scripted::Page(record_page(
            Some("l-2"),
            &(0..5).map(|n| rid("l", n)).collect::<Vec<_>>(),
        )),
    );
    transport.insert(
        SortDirection::LowestRated,
        Some("l-2"),
        Scripted::Page(record_page(None, &lowest_tail)),
    );

    let pipeline = ScrapePipeline::new(quick_config()).unwrap();
    let outcome = pipeline.run(Arc::new(transport)).await;

    // 10 per direction, 3 shared between them.
    assert_eq!(outcome.reviews.len(), 17);
    assert_eq!(unique_ids(&outcome.reviews).len(), 17);
    assert_eq!(outcome.duplicates_discarded, 3);

    assert_eq!(outcome.directions.len(), 2);
    for summary in &outcome.directions {
        assert_eq!(summary.pages_fetched, 2);
        assert_eq!(summary.records_pushed, 10);
        assert!(summary.resume_token.is_none());
    }
    // Which direction loses the race varies, the total does not.
    let dup_sum: usize = outcome.directions.iter().map(|s| s.duplicates).sum();
    assert_eq!(dup_sum, 3);
}

#[tokio::test]
async fn test_undecodable_page_ends_direction_only() {
    let transport = MockTransport::new();
    transport.insert(
        SortDirection::HighestRated,
        None,
        Scripted::Page(record_page(
            Some("h-2"),
            &(0..5).map(|n| rid("h", n)).collect::<Vec<_>>(),
        )),
    );
    transport.insert(SortDirection::HighestRated, Some("h-2"), Scripted::Garbage);

    transport.insert(
        SortDirection::LowestRated,
        None,
        Scripted::Page(record_page(
            Some("l-2"),
            &(0..5).map(|n| rid("l", n)).collect::<Vec<_>>(),
        )),
    );
    transport.insert(
        SortDirection::LowestRated,
        Some("l-2"),
        Scripted::Page(record_page(
            None,
            &(5..10).map(|n| rid("l", n)).collect::<Vec<_>>(),
        )),
    );

    let pipeline = ScrapePipeline::new(quick_config()).unwrap();
    let outcome = pipeline.run(Arc::new(transport)).await;

    assert_eq!(outcome.reviews.len(), 15);

    let highest = outcome
        .directions
        .iter()
        .find(|s| s.direction == SortDirection::HighestRated)
        .unwrap();
    assert_eq!(highest.pages_fetched, 1);
    // The direction was cut short, so it keeps the token it stalled on.
    assert_eq!(highest.resume_token.as_deref(), Some("h-2"));

    let lowest = outcome
        .directions
        .iter()
        .find(|s| s.direction == SortDirection::LowestRated)
        .unwrap();
    assert_eq!(lowest.pages_fetched, 2);
    assert!(lowest.resume_token.is_none());
}

#[tokio::test]
async fn test_pagination_stops_after_final_page() {
    let transport = MockTransport::new();
    transport.insert(
        SortDirection::HighestRated,
        None,
        Scripted::Page(record_page(Some("h-2"), &[rid("h", 0), rid("h", 1)])),
    );
    transport.insert(
        SortDirection::HighestRated,
        Some("h-2"),
        Scripted::Page(record_page(Some("h-3"), &[rid("h", 2), rid("h", 3)])),
    );
    transport.insert(
        SortDirection::HighestRated,
        Some("h-3"),
        Scripted::Page(record_page(None, &[rid("h", 4), rid("h", 5)])),
    );
    transport.insert(
        SortDirection::LowestRated,
        None,
        Scripted::Page(record_page(None, &[])),
    );

    let pipeline = ScrapePipeline::new(quick_config()).unwrap();
    let transport = Arc::new(transport);
    let outcome = pipeline.run(Arc::clone(&transport) as Arc<dyn PageTransport>).await;

    // Three scripted pages, exactly three requests.
    assert_eq!(transport.fetches_for(SortDirection::HighestRated), 3);
    let highest = outcome
        .directions
        .iter()
        .find(|s| s.direction == SortDirection::HighestRated)
        .unwrap();
    assert_eq!(highest.pages_fetched, 3);
    assert_eq!(outcome.reviews.len(), 6);
}

#[tokio::test]
async fn test_bounded_queue_loses_nothing() {
    let mut config = quick_config();
    config.max_queue_size = 1;
    config.num_consumers = 1;

    let transport = MockTransport::new();
    for direction in SortDirection::ALL {
        let prefix = match direction {
            SortDirection::HighestRated => "h",
            SortDirection::LowestRated => "l",
        };
        let ids = |page: u32| -> Vec<String> {
            (page * 5..page * 5 + 5).map(|n| rid(prefix, n)).collect()
        };
        transport.insert(
            direction,
            None,
            Scripted::Page(record_page(Some("t-2"), &ids(0))),
        );
        transport.insert(
            direction,
            Some("t-2"),
            Scripted::Page(record_page(Some("t-3"), &ids(1))),
        );
        transport.insert(
            direction,
            Some("t-3"),
            Scripted::Page(record_page(None, &ids(2))),
        );
    }

    let pipeline = ScrapePipeline::new(config).unwrap();
    let outcome = pipeline.run(Arc::new(transport)).await;

    // A single-slot queue throttles the producers but drops nothing.
    assert_eq!(outcome.reviews.len(), 30);
    assert_eq!(unique_ids(&outcome.reviews).len(), 30);
    assert_eq!(outcome.duplicates_discarded, 0);
}

#[tokio::test]
async fn test_full_queue_blocks_producer_until_a_pop() {
    let transport = MockTransport::new();
    transport.insert(
        SortDirection::HighestRated,
        None,
        Scripted::Page(record_page(None, &[rid("h", 0), rid("h", 1)])),
    );

    let (tx, mut rx) = mpsc::channel::<RawRecord>(1);
    let shared = Arc::new(Shared {
        seen: Mutex::new(HashSet::new()),
        tracker: OverlapTracker::new(0.8, 3, 20),
        duplicates: [AtomicUsize::new(0), AtomicUsize::new(0)],
        stop: StopSignal::default(),
        max_records: None,
        require_content: false,
    });

    let producer = tokio::spawn(run_producer(
        SortDirection::HighestRated,
        None,
        Arc::new(transport),
        tx,
        quick_config(),
        shared,
    ));

    // One slot, two records, nobody popping: the second send must block.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!producer.is_finished());

    // A single pop frees the slot and the producer runs to completion.
    assert!(rx.recv().await.is_some());
    let summary = producer.await.unwrap();
    assert_eq!(summary.records_pushed, 2);
    assert!(rx.recv().await.is_some());
}

#[tokio::test]
async fn test_max_records_cap_stops_the_run() {
    let mut config = quick_config();
    config.max_records = Some(7);

    let transport = MockTransport::new();
    transport.insert(
        SortDirection::HighestRated,
        None,
        Scripted::Page(record_page(
            Some("h-2"),
            &(0..10).map(|n| rid("h", n)).collect::<Vec<_>>(),
        )),
    );
    transport.insert(
        SortDirection::HighestRated,
        Some("h-2"),
        Scripted::Page(record_page(
            None,
            &(10..20).map(|n| rid("h", n)).collect::<Vec<_>>(),
        )),
    );
    transport.insert(
        SortDirection::LowestRated,
        None,
        Scripted::Page(record_page(
            None,
            &(0..10).map(|n| rid("l", n)).collect::<Vec<_>>(),
        )),
    );

    let pipeline = ScrapePipeline::new(config).unwrap();
    let stop = pipeline.stop_signal();
    let outcome = pipeline.run(Arc::new(transport)).await;

    assert_eq!(outcome.reviews.len(), 7);
    assert_eq!(unique_ids(&outcome.reviews).len(), 7);
    assert!(stop.is_triggered());
}

#[tokio::test]
async fn test_http_failure_is_isolated_to_its_direction() {
    let transport = MockTransport::new();
    transport.insert(SortDirection::HighestRated, None, Scripted::HttpError(404));
    transport.insert(
        SortDirection::LowestRated,
        None,
        Scripted::Page(record_page(
            None,
            &(0..4).map(|n| rid("l", n)).collect::<Vec<_>>(),
        )),
    );

    let pipeline = ScrapePipeline::new(quick_config()).unwrap();
    let transport = Arc::new(transport);
    let outcome = pipeline.run(Arc::clone(&transport) as Arc<dyn PageTransport>).await;

    assert_eq!(outcome.reviews.len(), 4);

    let highest = outcome
        .directions
        .iter()
        .find(|s| s.direction == SortDirection::HighestRated)
        .unwrap();
    assert_eq!(highest.pages_fetched, 0);
    assert_eq!(highest.records_pushed, 0);
    // 404 is not retryable, one request and done.
    assert_eq!(transport.fetches_for(SortDirection::HighestRated), 1);
}

#[tokio::test]
async fn test_retry_recovers_after_timeouts() {
    let transport = MockTransport::new();
    transport.insert(
        SortDirection::HighestRated,
        None,
        Scripted::FlakyThenPage(
            2,
            record_page(None, &(0..3).map(|n| rid("h", n)).collect::<Vec<_>>()),
        ),
    );
    transport.insert(
        SortDirection::LowestRated,
        None,
        Scripted::Page(record_page(None, &[])),
    );

    let pipeline = ScrapePipeline::new(quick_config()).unwrap();
    let transport = Arc::new(transport);
    let outcome = pipeline.run(Arc::clone(&transport) as Arc<dyn PageTransport>).await;

    assert_eq!(outcome.reviews.len(), 3);
    // Two timeouts, then the page.
    assert_eq!(transport.fetches_for(SortDirection::HighestRated), 3);
}

#[tokio::test]
async fn test_require_content_filter() {
    let mut config = quick_config();
    config.require_content = true;

    let records = vec![
        review_record(&rid("h", 0)),
        contentless_record(&rid("h", 1)),
        review_record(&rid("h", 2)),
    ];
    let transport = MockTransport::new();
    transport.insert(
        SortDirection::HighestRated,
        None,
        Scripted::Page(page_bytes(None, &records)),
    );
    transport.insert(
        SortDirection::LowestRated,
        None,
        Scripted::Page(record_page(None, &[])),
    );

    let pipeline = ScrapePipeline::new(config).unwrap();
    let outcome = pipeline.run(Arc::new(transport)).await;

    assert_eq!(outcome.reviews.len(), 2);
    assert!(!unique_ids(&outcome.reviews).contains(&rid("h", 1)));
    // Filtered records are not duplicates.
    assert_eq!(outcome.duplicates_discarded, 0);
}

#[tokio::test]
async fn test_stop_signal_preempts_run() {
    let transport = MockTransport::new();
    transport.insert(
        SortDirection::HighestRated,
        None,
        Scripted::Page(record_page(
            None,
            &(0..5).map(|n| rid("h", n)).collect::<Vec<_>>(),
        )),
    );
    transport.insert(
        SortDirection::LowestRated,
        None,
        Scripted::Page(record_page(
            None,
            &(0..5).map(|n| rid("l", n)).collect::<Vec<_>>(),
        )),
    );

    let pipeline = ScrapePipeline::new(quick_config()).unwrap();
    pipeline.stop_signal().trigger();
    let outcome = pipeline.run(Arc::new(transport)).await;

    assert!(outcome.reviews.is_empty());
    for summary in &outcome.directions {
        assert_eq!(summary.pages_fetched, 0);
    }
}

#[tokio::test]
async fn test_overlap_heuristic_cuts_exhausted_direction() {
    let mut config = quick_config();
    config.overlap_window_pages = 2;
    config.overlap_min_records = 5;
    // Give the consumers time to catch up between pages so the duplicate
    // window reflects what was actually fetched.
    config.page_delay_ms = 20;

    let ids: Vec<String> = (0..5).map(|n| rid("h", n)).collect();
    let transport = MockTransport::new();
    transport.insert(
        SortDirection::HighestRated,
        None,
        Scripted::Page(record_page(None, &ids)),
    );
    // The other direction keeps serving the same records page after page.
    transport.insert(
        SortDirection::LowestRated,
        None,
        Scripted::Page(record_page(Some("l-2"), &ids)),
    );
    for page in 2..9 {
        let token = format!("l-{page}");
        let next = format!("l-{}", page + 1);
        transport.insert(
            SortDirection::LowestRated,
            Some(token.as_str()),
            Scripted::Page(record_page(Some(next.as_str()), &ids)),
        );
    }
    transport.insert(
        SortDirection::LowestRated,
        Some("l-9"),
        Scripted::Page(record_page(None, &ids)),
    );

    let pipeline = ScrapePipeline::new(config).unwrap();
    let outcome = pipeline.run(Arc::new(transport)).await;

    assert_eq!(outcome.reviews.len(), 5);

    let lowest = outcome
        .directions
        .iter()
        .find(|s| s.direction == SortDirection::LowestRated)
        .unwrap();
    // Stopped well before walking the whole ten-page script.
    assert!(lowest.pages_fetched < 9);
    assert!(lowest.resume_token.is_some());
}

#[tokio::test]
async fn test_records_without_identity_are_skipped() {
    let records = vec![
        json!([null, [[[3]], ["fine place to visit", null, [0, 19]]]]),
        review_record(&rid("h", 0)),
    ];
    let transport = MockTransport::new();
    transport.insert(
        SortDirection::HighestRated,
        None,
        Scripted::Page(page_bytes(None, &records)),
    );
    transport.insert(
        SortDirection::LowestRated,
        None,
        Scripted::Page(record_page(None, &[])),
    );

    let pipeline = ScrapePipeline::new(quick_config()).unwrap();
    let outcome = pipeline.run(Arc::new(transport)).await;

    assert_eq!(outcome.reviews.len(), 1);
    assert_eq!(outcome.reviews[0].review_id, rid("h", 0));
}

#[tokio::test]
async fn test_resumed_run_starts_from_saved_tokens() {
    let transport = MockTransport::new();
    transport.insert(
        SortDirection::HighestRated,
        Some("h-resume"),
        Scripted::Page(record_page(
            None,
            &(0..3).map(|n| rid("h", n)).collect::<Vec<_>>(),
        )),
    );
    transport.insert(
        SortDirection::LowestRated,
        None,
        Scripted::Page(record_page(None, &[])),
    );

    let pipeline = ScrapePipeline::new(quick_config()).unwrap();
    let transport = Arc::new(transport);
    let outcome = pipeline
        .run_resumed(
            Arc::clone(&transport) as Arc<dyn PageTransport>,
            Some("h-resume".to_string()),
            None,
        )
        .await;

    assert_eq!(outcome.reviews.len(), 3);
    // No request for the first page, straight to the saved token.
    assert_eq!(transport.fetches_for(SortDirection::HighestRated), 1);
}
