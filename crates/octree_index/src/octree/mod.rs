//! Adaptive octree for point-tagged payloads.
//!
//! The tree starts as a single leaf covering the world region. A leaf that is
//! full when another entry arrives is split into eight children, one per
//! octant, and its entries move down into them.
//!
//! # Octant Convention
//!
//! ```text
//! octant = (p.x > c.x) | (p.y > c.y) << 1 | (p.z > c.z) << 2
//! ```
//!
//! where `c` is the node's region center. Positions on a center plane go to
//! the lower side.
//!
//! # Module Structure
//!
//! - [`node`]: `NodeKey` addressing and the owned `OctreeNode` leaf/branch
//! - [`config`]: `IndexConfig` - capacity, world region, depth guard
//! - [`index`]: `SpatialIndex` - insert, retrieve, clear, reset
//! - [`stats`]: `InsertOutcome` and `IndexStats`

pub mod config;
pub mod index;
pub mod node;
pub mod stats;

// Re-exports
pub use config::IndexConfig;
pub use index::SpatialIndex;
pub use node::{Entry, Leaves, NodeKey, NodeState, OctreeNode};
pub use stats::{IndexStats, InsertOutcome};
