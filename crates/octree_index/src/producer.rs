//! Point producers feeding a spatial index.
//!
//! [`PointGenerator`] yields random positions inside a region; [`feed`] hands
//! `(position, payload)` pairs to a sink one at a time and checks a
//! [`CancellationToken`] between pairs. Each insert is atomic on its own, so
//! stopping between two of them always leaves the tree consistent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Region;

/// Cooperative cancellation flag shared between a driver and its controller.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }
}

/// Uniformly random positions inside a region.
///
/// Seeded generators are reproducible: the same seed and region yield the same
/// sequence.
#[derive(Clone, Debug)]
pub struct PointGenerator {
  region: Region,
  rng: StdRng,
}

impl PointGenerator {
  pub fn new(region: Region, seed: u64) -> Self {
    Self {
      region,
      rng: StdRng::seed_from_u64(seed),
    }
  }

  /// Generator seeded from the operating system.
  pub fn from_os_rng(region: Region) -> Self {
    Self {
      region,
      rng: StdRng::from_os_rng(),
    }
  }

  pub fn region(&self) -> &Region {
    &self.region
  }

  /// Next position, in `[origin, origin + extent)` on every axis.
  pub fn next_position(&mut self) -> DVec3 {
    let unit = DVec3::new(
      self.rng.random::<f64>(),
      self.rng.random::<f64>(),
      self.rng.random::<f64>(),
    );
    self.region.origin + unit * self.region.extent
  }
}

impl Iterator for PointGenerator {
  type Item = DVec3;

  fn next(&mut self) -> Option<DVec3> {
    Some(self.next_position())
  }
}

/// Result of a [`feed`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedReport {
  /// Pairs handed to the sink.
  pub produced: usize,
  /// The run stopped because the token was cancelled.
  pub cancelled: bool,
}

/// Hand up to `limit` pairs from `source` to `sink`, stopping early when the
/// token is cancelled or the source runs dry. A sink error aborts the run.
pub fn feed<I, T, F, E>(
  source: I,
  limit: usize,
  token: &CancellationToken,
  mut sink: F,
) -> Result<FeedReport, E>
where
  I: IntoIterator<Item = (DVec3, T)>,
  F: FnMut(DVec3, T) -> Result<(), E>,
{
  let mut report = FeedReport::default();

  for (position, payload) in source.into_iter().take(limit) {
    if token.is_cancelled() {
      report.cancelled = true;
      break;
    }
    sink(position, payload)?;
    report.produced += 1;
  }

  #[cfg(feature = "tracing")]
  tracing::debug!(produced = report.produced, cancelled = report.cancelled, "feed finished");

  Ok(report)
}
