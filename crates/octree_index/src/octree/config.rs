//! IndexConfig - capacity, world region and depth guard for a spatial index.

use glam::DVec3;

use super::NodeKey;
use crate::{IndexError, Region};

/// Default leaf capacity before a split is attempted.
pub const DEFAULT_CAPACITY: usize = 512;

/// Default depth guard.
pub const DEFAULT_MAX_DEPTH: u32 = 16;

/// Default world edge length.
pub const DEFAULT_WORLD_SIZE: f64 = 1000.0;

/// Configuration for one spatial index. Fixed once the index is built.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct IndexConfig {
  /// Entries a leaf holds before it is subdivided.
  pub capacity: usize,

  /// Region covered by the root node.
  pub world: Region,

  /// Deepest level a split may create. Root is depth 0.
  pub max_depth: u32,

  /// Smallest child extent (any axis) a split may create. 0 disables it.
  pub min_extent: f64,
}

impl IndexConfig {
  /// Config with the given world and capacity, default guard.
  pub fn new(world: Region, capacity: usize) -> Self {
    Self {
      capacity,
      world,
      ..Self::default()
    }
  }

  pub fn with_max_depth(mut self, max_depth: u32) -> Self {
    self.max_depth = max_depth;
    self
  }

  pub fn with_min_extent(mut self, min_extent: f64) -> Self {
    self.min_extent = min_extent;
    self
  }

  /// Check the config can build a tree.
  pub fn validate(&self) -> Result<(), IndexError> {
    if self.capacity == 0 {
      return Err(IndexError::InvalidConfig("capacity must be at least 1".into()));
    }
    if self.max_depth > NodeKey::MAX_DEPTH {
      return Err(IndexError::InvalidConfig(format!(
        "max_depth {} exceeds the addressable depth {}",
        self.max_depth,
        NodeKey::MAX_DEPTH
      )));
    }
    if !self.min_extent.is_finite() || self.min_extent < 0.0 {
      return Err(IndexError::InvalidConfig(format!(
        "min_extent must be finite and >= 0, got {}",
        self.min_extent
      )));
    }
    Region::new(self.world.origin, self.world.extent)?;
    Ok(())
  }

  /// Whether a leaf at `depth` covering `region` may be split.
  ///
  /// Children must stay within `max_depth`, keep a strictly positive extent
  /// and be no smaller than `min_extent` on any axis.
  #[inline]
  pub fn allows_split(&self, depth: u32, region: &Region) -> bool {
    if depth >= self.max_depth {
      return false;
    }
    let child_extent = region.extent.min_element() * 0.5;
    child_extent > 0.0 && child_extent >= self.min_extent
  }
}

impl Default for IndexConfig {
  fn default() -> Self {
    Self {
      capacity: DEFAULT_CAPACITY,
      world: Region {
        origin: DVec3::ZERO,
        extent: DVec3::splat(DEFAULT_WORLD_SIZE),
      },
      max_depth: DEFAULT_MAX_DEPTH,
      min_extent: 0.0,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
