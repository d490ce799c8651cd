//! Point-cloud export of leaf contents.
//!
//! Each entry of a non-empty leaf becomes one point placed at the leaf's
//! anchor, colored by looking a scalar classification value up in a
//! [`ColorTable`] of possibly overlapping bands.

use glam::{DVec3, Vec3, Vec4};
use rayon::prelude::*;

use crate::octree::{Entry, OctreeNode, SpatialIndex};
use crate::Region;

/// Inclusive value range mapped to one RGBA color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorBand {
  pub min: f64,
  pub max: f64,
  pub color: Vec4,
}

impl ColorBand {
  pub const fn new(min: f64, max: f64, color: Vec4) -> Self {
    Self { min, max, color }
  }

  #[inline]
  pub fn contains(&self, value: f64) -> bool {
    value >= self.min && value <= self.max
  }
}

/// How a value inside several bands picks its color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
  /// First matching band in table order.
  #[default]
  First,
  /// Last matching band in table order.
  Last,
  /// Mean of every matching band's color.
  Blend,
}

/// Color returned for values no band covers.
pub const DEFAULT_FALLBACK: Vec4 = Vec4::ONE;

/// Terrain layers over `[0, 1]`. Neighbouring layers overlap so transitions
/// can be blended.
pub const TERRAIN_BANDS: [ColorBand; 9] = [
  // Obsidian, near-black blue-grey
  ColorBand::new(0.00, 0.05, Vec4::new(0.19, 0.24, 0.27, 1.0)),
  // Water, deep blue
  ColorBand::new(0.00, 0.15, Vec4::new(0.09, 0.34, 0.76, 1.0)),
  // Sand, pale yellow
  ColorBand::new(0.10, 0.25, Vec4::new(0.96, 0.91, 0.70, 1.0)),
  // Dirt, brown
  ColorBand::new(0.20, 0.40, Vec4::new(0.42, 0.22, 0.07, 1.0)),
  // Grass, green
  ColorBand::new(0.35, 0.45, Vec4::new(0.29, 0.56, 0.26, 1.0)),
  // Stone, grey
  ColorBand::new(0.40, 0.65, Vec4::new(0.47, 0.47, 0.47, 1.0)),
  // Coal, dark grey
  ColorBand::new(0.50, 0.75, Vec4::new(0.22, 0.22, 0.22, 1.0)),
  // Iron, light grey
  ColorBand::new(0.65, 0.90, Vec4::new(0.68, 0.68, 0.68, 1.0)),
  // Gold
  ColorBand::new(0.85, 1.00, Vec4::new(0.89, 0.72, 0.29, 1.0)),
];

/// Ordered band table with an overlap policy.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorTable {
  bands: Vec<ColorBand>,
  policy: OverlapPolicy,
  fallback: Vec4,
}

impl ColorTable {
  pub fn new(bands: Vec<ColorBand>) -> Self {
    Self {
      bands,
      policy: OverlapPolicy::default(),
      fallback: DEFAULT_FALLBACK,
    }
  }

  /// The terrain table ([`TERRAIN_BANDS`]) with first-match resolution.
  pub fn terrain() -> Self {
    Self::new(TERRAIN_BANDS.to_vec())
  }

  pub fn with_policy(mut self, policy: OverlapPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_fallback(mut self, fallback: Vec4) -> Self {
    self.fallback = fallback;
    self
  }

  pub fn bands(&self) -> &[ColorBand] {
    &self.bands
  }

  pub fn policy(&self) -> OverlapPolicy {
    self.policy
  }

  /// Bands containing `value`, in table order.
  pub fn matches(&self, value: f64) -> impl Iterator<Item = &ColorBand> + '_ {
    self.bands.iter().filter(move |band| band.contains(value))
  }

  /// Resolve the color for a classification value.
  pub fn classify(&self, value: f64) -> Vec4 {
    let color = match self.policy {
      OverlapPolicy::First => self.matches(value).next().map(|band| band.color),
      OverlapPolicy::Last => self.matches(value).last().map(|band| band.color),
      OverlapPolicy::Blend => {
        let (sum, count) = self
          .matches(value)
          .fold((Vec4::ZERO, 0u32), |(sum, count), band| (sum + band.color, count + 1));
        (count > 0).then(|| sum / count as f32)
      }
    };
    color.unwrap_or(self.fallback)
  }
}

impl Default for ColorTable {
  fn default() -> Self {
    Self::terrain()
  }
}

/// Where a leaf's points are placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Anchor {
  /// Minimum corner of the leaf region.
  #[default]
  Origin,
  /// Center of the leaf region.
  Center,
}

impl Anchor {
  #[inline]
  pub fn position(&self, region: &Region) -> DVec3 {
    match self {
      Anchor::Origin => region.origin,
      Anchor::Center => region.center(),
    }
  }
}

/// Renderable points with one color per point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
  pub positions: Vec<Vec3>,
  pub colors: Vec<Vec4>,
}

impl PointCloud {
  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  pub fn push(&mut self, position: Vec3, color: Vec4) {
    self.positions.push(position);
    self.colors.push(color);
  }

  fn append(&mut self, mut other: PointCloud) {
    self.positions.append(&mut other.positions);
    self.colors.append(&mut other.colors);
  }
}

/// Turns leaf contents into a [`PointCloud`].
#[derive(Clone, Debug, Default)]
pub struct PointCloudExporter {
  pub table: ColorTable,
  pub anchor: Anchor,
}

impl PointCloudExporter {
  pub fn new(table: ColorTable) -> Self {
    Self {
      table,
      anchor: Anchor::default(),
    }
  }

  pub fn with_anchor(mut self, anchor: Anchor) -> Self {
    self.anchor = anchor;
    self
  }

  /// One point per entry, colored by `classify(entry)`.
  ///
  /// Leaves are processed in parallel; output order follows leaf order
  /// ([`SpatialIndex::leaves`]) and entry order within each leaf.
  pub fn export<T, F>(&self, index: &SpatialIndex<T>, classify: F) -> PointCloud
  where
    T: Sync,
    F: Fn(&Entry<T>) -> f64 + Sync,
  {
    self.export_with(index, |_, entry| classify(entry))
  }

  /// Classify by the anchor's height within the world, normalized to `[0, 1]`.
  pub fn export_by_height<T: Sync>(&self, index: &SpatialIndex<T>) -> PointCloud {
    let world = *index.world();
    self.export_with(index, move |anchor, _| normalized_height(&world, anchor))
  }

  /// `classify` gets the leaf anchor along with each entry.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "export::point_cloud"))]
  fn export_with<T, F>(&self, index: &SpatialIndex<T>, classify: F) -> PointCloud
  where
    T: Sync,
    F: Fn(DVec3, &Entry<T>) -> f64 + Sync,
  {
    let leaves: Vec<&OctreeNode<T>> = index
      .leaves()
      .filter(|leaf| leaf.entries().is_some_and(|entries| !entries.is_empty()))
      .collect();

    let parts: Vec<PointCloud> = leaves
      .par_iter()
      .map(|leaf| self.export_leaf(leaf, &classify))
      .collect();

    let mut cloud = PointCloud::default();
    for part in parts {
      cloud.append(part);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(leaves = leaves.len(), points = cloud.len(), "exported point cloud");

    cloud
  }

  fn export_leaf<T, F>(&self, leaf: &OctreeNode<T>, classify: &F) -> PointCloud
  where
    F: Fn(DVec3, &Entry<T>) -> f64,
  {
    let mut cloud = PointCloud::default();
    let anchor = self.anchor.position(leaf.region());
    for entry in leaf.entries().unwrap_or_default() {
      cloud.push(anchor.as_vec3(), self.table.classify(classify(anchor, entry)));
    }
    cloud
  }
}

/// Height of `position` inside `world`, clamped to `[0, 1]`.
pub fn normalized_height(world: &Region, position: DVec3) -> f64 {
  ((position.y - world.origin.y) / world.extent.y).clamp(0.0, 1.0)
}

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;
