//! Latency and shape metrics for a spatial index, plus a small benchmark runner.
//!
//! Recording is feature-gated and runtime-toggled so it costs nothing when
//! disabled.
//!
//! # Usage
//!
//! ```ignore
//! use octree_index::metrics::{IndexMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! let mut metrics = IndexMetrics::new();
//! let outcome = metrics.timed_insert(&mut index, position, payload)?;
//! println!("avg insert: {:.1}us", metrics.avg_insert_timing_us());
//! ```

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use glam::DVec3;
use rayon::prelude::*;
use web_time::Instant;

use crate::octree::{InsertOutcome, SpatialIndex};
use crate::producer::CancellationToken;
use crate::IndexError;

/// Runtime toggle for metrics collection.
/// Set to false to disable metrics gathering at runtime.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Run `f` and return its result with the elapsed time in microseconds.
#[inline]
pub fn measure_us<R>(f: impl FnOnce() -> R) -> (R, u64) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed().as_micros() as u64)
}

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// Create a new rolling window with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
    /// Compute the sum of all values.
    pub fn sum(&self) -> T {
        self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
    }
}

impl RollingWindow<u64> {
    /// Compute the average of all values.
    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    /// Get min and max values.
    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = self.buffer.iter().min()?;
        let max = self.buffer.iter().max()?;
        Some((*min, *max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Index call statistics.
#[derive(Debug, Clone, Default)]
pub struct IndexMetrics {
    /// Rolling window of insert latencies in microseconds.
    pub insert_timings: RollingWindow<u64>,
    /// Rolling window of retrieve latencies in microseconds.
    pub retrieve_timings: RollingWindow<u64>,

    /// Inserts recorded.
    pub total_inserts: u64,
    /// Splits caused by recorded inserts.
    pub total_subdivisions: u64,
    /// Inserts that hit the depth guard.
    pub depth_limited_inserts: u64,
    /// Retrieves recorded.
    pub total_retrieves: u64,

    /// Last insert time in microseconds.
    pub last_insert_us: u64,
    /// Last retrieve time in microseconds.
    pub last_retrieve_us: u64,
}

impl IndexMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset windows and counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record one insert and its latency.
    pub fn record_insert(&mut self, outcome: &InsertOutcome, timing_us: u64) {
        if !is_enabled() {
            return;
        }
        self.insert_timings.push(timing_us);
        self.last_insert_us = timing_us;
        self.total_inserts += 1;
        self.total_subdivisions += outcome.subdivisions as u64;
        if outcome.depth_limited {
            self.depth_limited_inserts += 1;
        }
    }

    /// Record one retrieve latency.
    pub fn record_retrieve(&mut self, timing_us: u64) {
        if !is_enabled() {
            return;
        }
        self.retrieve_timings.push(timing_us);
        self.last_retrieve_us = timing_us;
        self.total_retrieves += 1;
    }

    /// Insert through `index` and record the call.
    pub fn timed_insert<T>(
        &mut self,
        index: &mut SpatialIndex<T>,
        position: DVec3,
        payload: T,
    ) -> Result<InsertOutcome, IndexError> {
        let (result, timing_us) = measure_us(|| index.insert(position, payload));
        if let Ok(outcome) = &result {
            self.record_insert(outcome, timing_us);
        }
        result
    }

    /// Retrieve through `index` and record the call.
    pub fn timed_retrieve<'a, T>(&mut self, index: &'a SpatialIndex<T>, position: DVec3) -> Vec<&'a T> {
        let (payloads, timing_us) = measure_us(|| index.retrieve(position));
        self.record_retrieve(timing_us);
        payloads
    }

    pub fn avg_insert_timing_us(&self) -> f64 {
        self.insert_timings.average()
    }

    pub fn avg_retrieve_timing_us(&self) -> f64 {
        self.retrieve_timings.average()
    }
}

/// One timed benchmark iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub name: String,
    pub iteration: usize,
    pub duration: Duration,
}

/// Summary over a benchmark's iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSummary {
    pub name: String,
    pub iterations: usize,
    pub cancelled: bool,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl BenchmarkSummary {
    fn from_results(name: &str, results: &[BenchmarkResult], cancelled: bool) -> Self {
        let durations = results.iter().map(|r| r.duration);
        let total: Duration = durations.clone().sum();
        Self {
            name: name.to_string(),
            iterations: results.len(),
            cancelled,
            mean: total.checked_div(results.len() as u32).unwrap_or_default(),
            min: durations.clone().min().unwrap_or_default(),
            max: durations.max().unwrap_or_default(),
        }
    }
}

/// Run `action` `iterations` times, at most `max_concurrency` at once.
///
/// Iterations not yet started when the token is cancelled are skipped; the
/// action also receives the token so long iterations can stop early.
pub fn run_benchmark<F>(
    name: &str,
    iterations: usize,
    max_concurrency: usize,
    token: &CancellationToken,
    action: F,
) -> Result<(Vec<BenchmarkResult>, BenchmarkSummary), IndexError>
where
    F: Fn(&CancellationToken) + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_concurrency.max(1))
        .build()
        .map_err(|err| IndexError::InvalidConfig(format!("benchmark pool: {err}")))?;

    let mut results: Vec<BenchmarkResult> = pool.install(|| {
        (0..iterations)
            .into_par_iter()
            .filter_map(|iteration| {
                if token.is_cancelled() {
                    return None;
                }
                let ((), timing_us) = measure_us(|| action(token));
                Some(BenchmarkResult {
                    name: name.to_string(),
                    iteration,
                    duration: Duration::from_micros(timing_us),
                })
            })
            .collect()
    });
    results.sort_by_key(|r| r.iteration);

    let cancelled = token.is_cancelled() && results.len() < iterations;
    let summary = BenchmarkSummary::from_results(name, &results, cancelled);

    #[cfg(feature = "tracing")]
    tracing::info!(
        name,
        iterations = summary.iterations,
        mean_us = summary.mean.as_micros() as u64,
        cancelled,
        "benchmark finished"
    );

    Ok((results, summary))
}
