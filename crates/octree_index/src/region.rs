//! Axis-aligned region with double precision, the box managed by one octree node.

use glam::DVec3;

use crate::error::IndexError;

/// Double-precision axis-aligned box described by its minimum corner and size.
///
/// Every component of `extent` is strictly positive and finite. Construct with
/// [`Region::new`] to get that checked; the octant helpers preserve it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RegionDef"))]
pub struct Region {
	/// Minimum corner.
	pub origin: DVec3,
	/// Size along each axis.
	pub extent: DVec3,
}

impl Region {
	/// Create a region from its minimum corner and size.
	pub fn new(origin: DVec3, extent: DVec3) -> Result<Self, IndexError> {
		let extent_ok = extent.is_finite() && extent.cmpgt(DVec3::ZERO).all();
		if !origin.is_finite() || !extent_ok {
			return Err(IndexError::InvalidRegion { origin, extent });
		}
		Ok(Self { origin, extent })
	}

	/// Create a region from its minimum and maximum corners.
	pub fn from_min_max(min: DVec3, max: DVec3) -> Result<Self, IndexError> {
		Self::new(min, max - min)
	}

	/// Cube of side `size` with its minimum corner at `origin`.
	pub fn cube(origin: DVec3, size: f64) -> Result<Self, IndexError> {
		Self::new(origin, DVec3::splat(size))
	}

	/// Maximum corner (`origin + extent`).
	#[inline]
	pub fn max(&self) -> DVec3 {
		self.origin + self.extent
	}

	/// Center of the region.
	#[inline]
	pub fn center(&self) -> DVec3 {
		self.origin + self.extent * 0.5
	}

	/// Product of the extents.
	#[inline]
	pub fn volume(&self) -> f64 {
		self.extent.x * self.extent.y * self.extent.z
	}

	/// Closed-box containment test.
	#[inline]
	pub fn contains_point(&self, point: DVec3) -> bool {
		point.cmpge(self.origin).all() && point.cmple(self.max()).all()
	}

	/// Sub-box for one octant.
	///
	/// Octant bits select the upper half per axis:
	/// - bit 0: X
	/// - bit 1: Y
	/// - bit 2: Z
	#[inline]
	pub fn child_region(&self, octant: u8) -> Self {
		debug_assert!(octant < 8, "octant out of range: {octant}");
		let half = self.extent * 0.5;
		let offset = DVec3::new(
			if octant & 1 != 0 { half.x } else { 0.0 },
			if octant & 2 != 0 { half.y } else { 0.0 },
			if octant & 4 != 0 { half.z } else { 0.0 },
		);
		Self {
			origin: self.origin + offset,
			extent: half,
		}
	}

	/// All eight octant sub-boxes, indexed by octant.
	pub fn child_regions(&self) -> [Self; 8] {
		std::array::from_fn(|i| self.child_region(i as u8))
	}

	/// Octant of this region that a position routes to.
	///
	/// A bit is set only when the position is strictly greater than the center
	/// on that axis, so points on a center plane go to the lower side. Positions
	/// outside the region still get an octant (the nearest boundary one).
	#[inline]
	pub fn octant_for(&self, position: DVec3) -> u8 {
		let center = self.center();
		(position.x > center.x) as u8
			| ((position.y > center.y) as u8) << 1
			| ((position.z > center.z) as u8) << 2
	}
}

/// Unchecked mirror used to validate deserialized regions.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RegionDef {
	origin: DVec3,
	extent: DVec3,
}

#[cfg(feature = "serde")]
impl TryFrom<RegionDef> for Region {
	type Error = IndexError;

	fn try_from(def: RegionDef) -> Result<Self, Self::Error> {
		Region::new(def.origin, def.extent)
	}
}
