//! Concurrent fetch/decode pipeline.
//!
//! One producer task per traversal direction walks its token chain and pushes
//! raw records into a bounded queue; a pool of consumer tasks assembles,
//! filters and deduplicates them. The queue bound is the only backpressure
//! mechanism: when consumers fall behind, producers block on `send`.

use crate::assembler;
use crate::cursor::TokenCursor;
use crate::error::PipelineError;
use crate::overlap::OverlapTracker;
use crate::payload;
use futures::future::join_all;
use review_stream_config::PipelineConfig;
use review_stream_models::{Review, SortDirection};
use review_stream_sources::PageTransport;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One raw record in flight between a producer and the consumer pool.
struct RawRecord {
    direction: SortDirection,
    page: u32,
    value: Value,
}

/// What one direction accomplished before it ended.
#[derive(Debug, Clone, Serialize)]
pub struct DirectionSummary {
    pub direction: SortDirection,
    pub pages_fetched: u32,
    pub records_pushed: usize,
    /// How many of this direction's records turned out to be already seen.
    pub duplicates: usize,
    /// Present only when the direction was cut short; feeding it back as the
    /// initial token continues where this run stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_token: Option<String>,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub reviews: Vec<Review>,
    pub directions: Vec<DirectionSummary>,
    pub duplicates_discarded: usize,
}

/// Cooperative shutdown flag shared by every task of one run. Once
/// triggered it never resets.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum Admission {
    New,
    Duplicate,
    CapReached,
}

/// State shared between the producer tasks and the consumer pool.
struct Shared {
    seen: Mutex<HashSet<String>>,
    tracker: OverlapTracker,
    // One duplicate counter per direction, indexed by position in ALL.
    duplicates: [AtomicUsize; 2],
    stop: StopSignal,
    max_records: Option<usize>,
    require_content: bool,
}

fn direction_index(direction: SortDirection) -> usize {
    match direction {
        SortDirection::HighestRated => 0,
        SortDirection::LowestRated => 1,
    }
}

impl Shared {
    /// Check-and-insert under one lock so no two consumers can admit the
    /// same identity.
    async fn admit(&self, review_id: &str) -> Admission {
        let mut seen = self.seen.lock().await;
        if seen.contains(review_id) {
            return Admission::Duplicate;
        }
        if let Some(max) = self.max_records {
            if seen.len() >= max {
                self.stop.trigger();
                return Admission::CapReached;
            }
        }
        seen.insert(review_id.to_string());
        if self.max_records == Some(seen.len()) {
            self.stop.trigger();
        }
        Admission::New
    }
}

pub struct ScrapePipeline {
    config: PipelineConfig,
    stop: StopSignal,
}

impl ScrapePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            stop: StopSignal::default(),
        })
    }

    /// Handle for external shutdown (ctrl-c and the like).
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Runs both directions to completion and returns everything the
    /// consumer pool admitted. Per-task failures degrade the result, they
    /// never abort the run.
    pub async fn run(&self, transport: Arc<dyn PageTransport>) -> PipelineOutcome {
        self.run_resumed(transport, None, None).await
    }

    /// Like [`ScrapePipeline::run`], starting each direction from a saved
    /// resume token instead of its first page.
    pub async fn run_resumed(
        &self,
        transport: Arc<dyn PageTransport>,
        highest_token: Option<String>,
        lowest_token: Option<String>,
    ) -> PipelineOutcome {
        let (tx, rx) = mpsc::channel::<RawRecord>(self.config.max_queue_size);
        let rx = Arc::new(Mutex::new(rx));

        let shared = Arc::new(Shared {
            seen: Mutex::new(HashSet::new()),
            tracker: OverlapTracker::new(
                self.config.overlap_threshold,
                self.config.overlap_window_pages,
                self.config.overlap_min_records,
            ),
            duplicates: [AtomicUsize::new(0), AtomicUsize::new(0)],
            stop: self.stop.clone(),
            max_records: self.config.max_records,
            require_content: self.config.require_content,
        });

        let mut producers = Vec::with_capacity(SortDirection::ALL.len());
        for direction in SortDirection::ALL {
            let resume = match direction {
                SortDirection::HighestRated => highest_token.clone(),
                SortDirection::LowestRated => lowest_token.clone(),
            };
            let tx = tx.clone();
            let transport = Arc::clone(&transport);
            let config = self.config.clone();
            let shared = Arc::clone(&shared);
            producers.push(tokio::spawn(async move {
                run_producer(direction, resume, transport, tx, config, shared).await
            }));
        }
        // Consumers observe end-of-stream once every producer has dropped
        // its sender.
        drop(tx);

        let mut consumers = Vec::with_capacity(self.config.num_consumers);
        for _ in 0..self.config.num_consumers {
            let rx = Arc::clone(&rx);
            let shared = Arc::clone(&shared);
            consumers.push(tokio::spawn(run_consumer(rx, shared)));
        }

        let mut directions = Vec::new();
        for joined in join_all(producers).await {
            match joined {
                Ok(summary) => directions.push(summary),
                Err(e) => warn!(error = %e, "Producer task aborted"),
            }
        }

        let mut reviews = Vec::new();
        for joined in join_all(consumers).await {
            match joined {
                Ok(local) => reviews.extend(local),
                Err(e) => warn!(error = %e, "Consumer task aborted"),
            }
        }

        // Duplicate counts are only final once every consumer has drained.
        for summary in &mut directions {
            summary.duplicates =
                shared.duplicates[direction_index(summary.direction)].load(Ordering::Relaxed);
        }
        let duplicates_discarded = directions.iter().map(|s| s.duplicates).sum();
        info!(
            reviews = reviews.len(),
            duplicates = duplicates_discarded,
            "Pipeline finished"
        );

        PipelineOutcome {
            reviews,
            directions,
            duplicates_discarded,
        }
    }
}

async fn run_producer(
    direction: SortDirection,
    resume: Option<String>,
    transport: Arc<dyn PageTransport>,
    tx: Sender<RawRecord>,
    config: PipelineConfig,
    shared: Arc<Shared>,
) -> DirectionSummary {
    let mut cursor = TokenCursor::new(direction, resume);
    let mut records_pushed = 0usize;

    while !cursor.is_exhausted() {
        if shared.stop.is_triggered() {
            cursor.finish();
            break;
        }
        if shared.tracker.should_stop(direction) {
            info!(%direction, "Recent pages are mostly duplicates, stopping direction");
            cursor.finish();
            break;
        }

        let fetched = fetch_with_retry(
            transport.as_ref(),
            direction,
            cursor.token(),
            &config,
            &shared.stop,
        )
        .await;
        let bytes = match fetched {
            Some(bytes) => bytes,
            None => {
                cursor.finish();
                break;
            }
        };

        let page = match payload::decode_page(&bytes) {
            Ok(page) => page,
            Err(e) => {
                // The continuation token lives inside the page, so an
                // undecodable page ends the direction.
                warn!(%direction, error = %e, "Dropping undecodable page");
                cursor.finish();
                break;
            }
        };

        cursor.advance(page.next_token);
        let page_index = cursor.pages_fetched();
        debug!(
            %direction,
            page = page_index,
            records = page.records.len(),
            "Decoded page"
        );

        let mut aborted = false;
        for value in page.records {
            if shared.stop.is_triggered() {
                aborted = true;
                break;
            }
            let record = RawRecord {
                direction,
                page: page_index,
                value,
            };
            if tx.send(record).await.is_err() {
                aborted = true;
                break;
            }
            records_pushed += 1;
        }
        if aborted {
            cursor.finish();
            break;
        }

        if !cursor.is_exhausted() && !config.page_delay().is_zero() {
            tokio::time::sleep(config.page_delay()).await;
        }
    }

    let direction = cursor.direction();
    let pages_fetched = cursor.pages_fetched();
    let resume_token = cursor.into_resume_token();
    info!(
        %direction,
        pages = pages_fetched,
        records = records_pushed,
        "Direction finished"
    );
    DirectionSummary {
        direction,
        pages_fetched,
        records_pushed,
        duplicates: 0,
        resume_token,
    }
}

async fn fetch_with_retry(
    transport: &dyn PageTransport,
    direction: SortDirection,
    token: Option<&str>,
    config: &PipelineConfig,
    stop: &StopSignal,
) -> Option<Vec<u8>> {
    let mut backoff = config.initial_backoff();
    let mut attempts = 0u32;
    loop {
        match transport.fetch_page(direction, token).await {
            Ok(bytes) => return Some(bytes),
            Err(e) => {
                attempts += 1;
                if !e.is_retryable() || attempts > config.retry_limit || stop.is_triggered() {
                    warn!(%direction, error = %e, attempts, "Giving up on page fetch");
                    return None;
                }
                debug!(
                    %direction,
                    error = %e,
                    attempt = attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    "Retrying page fetch"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(config.max_backoff());
            }
        }
    }
}

async fn run_consumer(rx: Arc<Mutex<Receiver<RawRecord>>>, shared: Arc<Shared>) -> Vec<Review> {
    let mut local = Vec::new();
    loop {
        // The lock is scoped to the recv so a consumer busy assembling never
        // blocks its siblings from pulling the next record.
        let raw = { rx.lock().await.recv().await };
        let Some(raw) = raw else { break };

        let Some(review) = assembler::assemble(&raw.value) else {
            debug!(
                direction = %raw.direction,
                page = raw.page,
                "Skipping record without a usable identity"
            );
            continue;
        };
        if shared.require_content && !review.has_content() {
            debug!(review_id = %review.review_id, "Skipping record without content");
            continue;
        }

        match shared.admit(&review.review_id).await {
            Admission::New => {
                shared.tracker.record(raw.direction, raw.page, false);
                local.push(review);
            }
            Admission::Duplicate => {
                shared.duplicates[direction_index(raw.direction)].fetch_add(1, Ordering::Relaxed);
                shared.tracker.record(raw.direction, raw.page, true);
            }
            Admission::CapReached => {}
        }
    }
    local
}

#[cfg(test)]
mod tests;
