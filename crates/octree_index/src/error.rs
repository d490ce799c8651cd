//! Error taxonomy for the spatial index.

use glam::DVec3;
use thiserror::Error;

/// Errors reported by the index and its wrappers.
///
/// Reaching the depth guard is not an error (see
/// [`InsertOutcome::depth_limited`](crate::octree::InsertOutcome)), and
/// querying an empty tree simply yields no payloads.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
  /// Region with a non-finite origin or a non-positive / non-finite extent.
  #[error("invalid region: origin {origin}, extent {extent} (extent must be finite and > 0)")]
  InvalidRegion { origin: DVec3, extent: DVec3 },

  #[error("invalid index configuration: {0}")]
  InvalidConfig(String),

  /// NaN or infinite coordinates cannot be routed to an octant.
  #[error("position {0} has non-finite coordinates")]
  NonFinitePosition(DVec3),

  /// Internal consistency failure. Indicates a bug in the tree itself.
  #[error("octree invariant violated: {0}")]
  InvariantViolation(String),

  #[error("index lock poisoned by a panicking writer")]
  LockPoisoned,

  #[error("index writer has shut down")]
  WriterClosed,

  #[error("failed to start index writer thread: {0}")]
  WriterSpawn(String),
}
