//! Per-insert outcomes and whole-tree statistics.

use super::NodeKey;

/// What a single insert did to the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InsertOutcome {
	/// Leaf the entry was stored in.
	pub leaf: NodeKey,
	/// Number of leaves split while placing the entry.
	pub subdivisions: u32,
	/// The depth guard refused a split and the leaf went over capacity.
	pub depth_limited: bool,
}

impl Default for InsertOutcome {
	fn default() -> Self {
		Self {
			leaf: NodeKey::ROOT,
			subdivisions: 0,
			depth_limited: false,
		}
	}
}

/// Snapshot of the tree shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexStats {
	/// Stored entries.
	pub entries: usize,
	/// Leaf nodes (including empty ones).
	pub leaves: usize,
	/// Branch nodes.
	pub branches: usize,
	/// Deepest node depth.
	pub max_depth: u32,
	/// Leaves holding more than the configured capacity.
	pub oversized_leaves: usize,
	/// Splits performed since construction or the last reset.
	pub subdivisions: u64,
}

impl IndexStats {
	/// Total node count.
	#[inline]
	pub fn nodes(&self) -> usize {
		self.leaves + self.branches
	}

	/// Mean entries per non-branch node.
	#[inline]
	pub fn mean_leaf_occupancy(&self) -> f64 {
		if self.leaves == 0 {
			0.0
		} else {
			self.entries as f64 / self.leaves as f64
		}
	}
}
