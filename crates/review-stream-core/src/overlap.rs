use review_stream_models::SortDirection;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Per-page duplicate counters for one direction.
#[derive(Debug)]
struct PageCounter {
    page: u32,
    duplicates: usize,
    total: usize,
}

#[derive(Debug, Default)]
struct DirectionWindow {
    pages: VecDeque<PageCounter>,
}

/// Detects the point where the two traversal directions have met.
///
/// Consumers report every admitted or discarded record here; once a
/// direction's recent pages are almost entirely duplicates, continuing to
/// fetch it only re-downloads what the opposite direction already produced.
/// The signal is advisory, deduplication stays authoritative either way.
pub struct OverlapTracker {
    threshold: f64,
    window_pages: usize,
    min_records: usize,
    directions: Mutex<HashMap<SortDirection, DirectionWindow>>,
}

impl OverlapTracker {
    pub fn new(threshold: f64, window_pages: usize, min_records: usize) -> Self {
        Self {
            threshold,
            window_pages,
            min_records,
            directions: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one record of `page` toward the direction's window.
    pub fn record(&self, direction: SortDirection, page: u32, duplicate: bool) {
        let mut directions = match self.directions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let window = directions.entry(direction).or_default();

        match window.pages.iter_mut().find(|c| c.page == page) {
            Some(counter) => {
                counter.total += 1;
                counter.duplicates += duplicate as usize;
            }
            None => {
                window.pages.push_back(PageCounter {
                    page,
                    duplicates: duplicate as usize,
                    total: 1,
                });
                while window.pages.len() > self.window_pages {
                    window.pages.pop_front();
                }
            }
        }
    }

    /// Whether the direction's window is saturated with duplicates. Requires
    /// a minimum sample so a thin first page cannot trip the heuristic.
    pub fn should_stop(&self, direction: SortDirection) -> bool {
        let directions = match self.directions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(window) = directions.get(&direction) else {
            return false;
        };

        let total: usize = window.pages.iter().map(|c| c.total).sum();
        if total < self.min_records {
            return false;
        }
        let duplicates: usize = window.pages.iter().map(|c| c.duplicates).sum();
        duplicates as f64 / total as f64 >= self.threshold
    }
}
