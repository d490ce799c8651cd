//! octree_index - Adaptive octree spatial index
//!
//! This crate stores payloads at 3D positions in an octree whose leaves split
//! into eight equal octants once they hold more entries than the configured
//! capacity. Lookups descend from the root to the single leaf covering a
//! position and return everything stored there.
//!
//! # Features
//!
//! - **Adaptive subdivision**: Leaves split on demand, guarded by a maximum
//!   depth and a minimum leaf extent so duplicate points cannot recurse forever
//! - **Single writer**: [`SharedIndex`] serializes mutations behind a lock and
//!   [`IndexWriter`] drains a mutation queue on a dedicated thread
//! - **Producers**: [`PointGenerator`] and [`feed`] drive inserts with
//!   cooperative cancellation
//! - **Export**: [`PointCloudExporter`] turns leaf contents into colored points
//!   through a [`ColorTable`] of overlapping bands
//!
//! # Example
//!
//! ```ignore
//! use glam::DVec3;
//! use octree_index::{Region, SpatialIndex};
//!
//! let world = Region::cube(DVec3::ZERO, 1000.0)?;
//! let mut index = SpatialIndex::with_capacity(world, 512)?;
//!
//! index.insert(DVec3::new(10.0, 20.0, 30.0), "beacon")?;
//! let nearby = index.retrieve(DVec3::new(11.0, 21.0, 31.0));
//!
//! println!("{} payloads share the leaf", nearby.len());
//! ```

pub mod error;
pub mod region;

pub use error::IndexError;
pub use region::Region;

// Octree node, configuration and the index itself
pub mod octree;
pub use octree::{
  Entry, IndexConfig, IndexStats, InsertOutcome, NodeKey, OctreeNode, SpatialIndex,
};

// Lock-guarded sharing and the single-writer queue
pub mod shared;
pub use shared::{IndexWriter, Mutation, MutationSender, SharedIndex, WriterReport};

// Point producers with cancellation
pub mod producer;
pub use producer::{feed, CancellationToken, FeedReport, PointGenerator};

// Point-cloud export
pub mod export;
pub use export::{Anchor, ColorBand, ColorTable, OverlapPolicy, PointCloud, PointCloudExporter};

// Engine-agnostic metrics collection
pub mod metrics;
