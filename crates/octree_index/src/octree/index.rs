//! SpatialIndex - owner of the root node and entry point for all operations.

use glam::DVec3;

use super::{Entry, IndexConfig, IndexStats, InsertOutcome, Leaves, NodeKey, NodeState, OctreeNode};
use crate::{IndexError, Region};

/// Octree of position-tagged payloads.
///
/// Leaves split into eight children once they hold `capacity` entries and
/// another one arrives, as long as the depth guard allows it. Mutation goes
/// through `&mut self`; see [`SharedIndex`](crate::SharedIndex) for sharing
/// one index between a writer and readers.
#[derive(Clone, Debug)]
pub struct SpatialIndex<T> {
  config: IndexConfig,
  root: OctreeNode<T>,
  len: usize,
  subdivisions: u64,
}

impl<T> SpatialIndex<T> {
  /// Build an index with a single empty root leaf over `config.world`.
  pub fn new(config: IndexConfig) -> Result<Self, IndexError> {
    config.validate()?;
    let root = OctreeNode::new_leaf(NodeKey::ROOT, config.world);
    Ok(Self {
      config,
      root,
      len: 0,
      subdivisions: 0,
    })
  }

  /// Index over `world` with the given capacity and default depth guard.
  pub fn with_capacity(world: Region, capacity: usize) -> Result<Self, IndexError> {
    Self::new(IndexConfig::new(world, capacity))
  }

  #[inline]
  pub fn config(&self) -> &IndexConfig {
    &self.config
  }

  #[inline]
  pub fn world(&self) -> &Region {
    &self.config.world
  }

  #[inline]
  pub fn root(&self) -> &OctreeNode<T> {
    &self.root
  }

  /// Number of stored entries.
  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Store a payload at `position`.
  ///
  /// Positions outside the world region are accepted and routed to the
  /// boundary octant on each level, like any other position.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "octree::insert"))]
  pub fn insert(&mut self, position: DVec3, payload: T) -> Result<InsertOutcome, IndexError> {
    if !position.is_finite() {
      return Err(IndexError::NonFinitePosition(position));
    }

    let mut outcome = InsertOutcome::default();
    self
      .root
      .insert(Entry::new(position, payload), &self.config, &mut outcome);
    self.len += 1;
    self.subdivisions += outcome.subdivisions as u64;

    #[cfg(feature = "tracing")]
    tracing::trace!(
      %position,
      leaf = ?outcome.leaf,
      subdivisions = outcome.subdivisions,
      depth_limited = outcome.depth_limited,
      "inserted entry"
    );

    Ok(outcome)
  }

  /// Payloads of the leaf whose region the position routes to.
  ///
  /// Every entry of that leaf is returned, not only entries stored at exactly
  /// `position`. Order is insertion order within the leaf.
  pub fn retrieve(&self, position: DVec3) -> Vec<&T> {
    self
      .entries_at(position)
      .iter()
      .map(|entry| &entry.payload)
      .collect()
  }

  /// Entry bucket of the leaf the position routes to.
  pub fn entries_at(&self, position: DVec3) -> &[Entry<T>] {
    self.leaf_at(position).entries().unwrap_or_default()
  }

  /// Leaf the position routes to.
  pub fn leaf_at(&self, position: DVec3) -> &OctreeNode<T> {
    self.root.descend(position)
  }

  /// Drop every stored entry, keeping the current branch structure.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "octree::clear"))]
  pub fn clear(&mut self) {
    self.root.clear();

    #[cfg(feature = "tracing")]
    tracing::debug!(dropped = self.len, "cleared index");

    self.len = 0;
  }

  /// Collapse to a single empty root leaf over the world region.
  pub fn reset(&mut self) {
    #[cfg(feature = "tracing")]
    tracing::debug!(dropped = self.len, subdivisions = self.subdivisions, "reset index");

    self.root = OctreeNode::new_leaf(NodeKey::ROOT, self.config.world);
    self.len = 0;
    self.subdivisions = 0;
  }

  /// Node with the given key, if the tree currently has it.
  pub fn node(&self, key: NodeKey) -> Option<&OctreeNode<T>> {
    self.root.find(key)
  }

  /// Parent of the node with the given key. None for the root or a missing key.
  pub fn parent_of(&self, key: NodeKey) -> Option<&OctreeNode<T>> {
    self.node(key)?;
    self.node(key.parent()?)
  }

  /// All leaves, depth first in octant order.
  pub fn leaves(&self) -> Leaves<'_, T> {
    self.root.leaves()
  }

  /// Count nodes, entries and depth.
  pub fn stats(&self) -> IndexStats {
    let mut stats = IndexStats {
      subdivisions: self.subdivisions,
      ..Default::default()
    };
    let mut stack = vec![&self.root];
    while let Some(node) = stack.pop() {
      stats.max_depth = stats.max_depth.max(node.depth());
      match node.state() {
        NodeState::Leaf(entries) => {
          stats.leaves += 1;
          stats.entries += entries.len();
          if entries.len() > self.config.capacity {
            stats.oversized_leaves += 1;
          }
        }
        NodeState::Branch(children) => {
          stats.branches += 1;
          stack.extend(children.iter());
        }
      }
    }
    stats
  }

  /// Walk the whole tree and verify its structural invariants.
  ///
  /// Checks that every region has a positive extent, keys, depths and regions
  /// agree, every branch partitions its region into eight octants, every entry
  /// routes to the leaf holding it, only guard-limited leaves exceed capacity
  /// and the entry count matches.
  pub fn check_invariants(&self) -> Result<(), IndexError> {
    let world = self.config.world;
    let tolerance = world.extent.max_element() * 1e-9;
    let mut entries = 0usize;
    let mut stack = vec![&self.root];

    if self.root.key() != NodeKey::ROOT || *self.root.region() != world {
      return Err(IndexError::InvariantViolation(
        "root does not cover the world region".into(),
      ));
    }

    while let Some(node) = stack.pop() {
      let key = node.key();
      let region = node.region();
      if !region.extent.cmpgt(DVec3::ZERO).all() {
        return Err(IndexError::InvariantViolation(format!(
          "node {key:?} has non-positive extent {}",
          region.extent
        )));
      }
      let expected = key.region_in(&world);
      let drift = (region.origin - expected.origin)
        .abs()
        .max((region.extent - expected.extent).abs())
        .max_element();
      if drift > tolerance {
        return Err(IndexError::InvariantViolation(format!(
          "node {key:?} covers {region:?}, its key implies {expected:?}"
        )));
      }

      match node.state() {
        NodeState::Branch(children) => {
          for (octant, child) in children.iter().enumerate() {
            let octant = octant as u8;
            if Some(child.key()) != key.child(octant) {
              return Err(IndexError::InvariantViolation(format!(
                "child {octant} of {key:?} has key {:?}",
                child.key()
              )));
            }
            if *child.region() != region.child_region(octant) {
              return Err(IndexError::InvariantViolation(format!(
                "child {octant} of {key:?} is not its octant region"
              )));
            }
            stack.push(child);
          }
        }
        NodeState::Leaf(bucket) => {
          if bucket.len() > self.config.capacity && self.config.allows_split(key.depth, region) {
            return Err(IndexError::InvariantViolation(format!(
              "leaf {key:?} holds {} entries over capacity {} without hitting the depth guard",
              bucket.len(),
              self.config.capacity
            )));
          }
          if let Some(stray) = bucket
            .iter()
            .find(|entry| self.root.descend(entry.position).key() != key)
          {
            return Err(IndexError::InvariantViolation(format!(
              "entry at {} is stored in {key:?} but routes elsewhere",
              stray.position
            )));
          }
          entries += bucket.len();
        }
      }
    }

    if entries != self.len {
      return Err(IndexError::InvariantViolation(format!(
        "tree holds {entries} entries, index counted {}",
        self.len
      )));
    }
    Ok(())
  }
}

impl<T: Clone> SpatialIndex<T> {
  /// Owned copies of the payloads [`retrieve`](Self::retrieve) would return.
  pub fn retrieve_cloned(&self, position: DVec3) -> Vec<T> {
    self
      .entries_at(position)
      .iter()
      .map(|entry| entry.payload.clone())
      .collect()
  }
}

impl<T> Extend<(DVec3, T)> for SpatialIndex<T> {
  /// Insert every pair, skipping non-finite positions.
  fn extend<I: IntoIterator<Item = (DVec3, T)>>(&mut self, iter: I) {
    for (position, payload) in iter {
      if let Err(_err) = self.insert(position, payload) {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %_err, "skipped entry while extending index");
      }
    }
  }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
