//! Search statistics

use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Default)]
struct Counters {
    total_searches: u64,
    total_time: Duration,
}

/// Running search counters
#[derive(Debug, Default)]
pub struct SearchStats {
    inner: Mutex<Counters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchStatsSnapshot {
    pub total_searches: u64,
    /// Seconds
    pub average_search_time: f64,
}

impl SearchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, elapsed: Duration) {
        let mut counters = self.inner.lock();
        counters.total_searches += 1;
        counters.total_time += elapsed;
    }

    pub fn snapshot(&self) -> SearchStatsSnapshot {
        let counters = self.inner.lock();
        let average_search_time = if counters.total_searches == 0 {
            0.0
        } else {
            counters.total_time.as_secs_f64() / counters.total_searches as f64
        };
        SearchStatsSnapshot {
            total_searches: counters.total_searches,
            average_search_time,
        }
    }
}
