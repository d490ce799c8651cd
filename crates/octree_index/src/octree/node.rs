//! Octree nodes.
//!
//! - [`NodeKey`]: immutable grid address of a node, also used as the
//!   non-owning parent handle.
//! - [`OctreeNode`]: the owned tree node, either a leaf bucket or a branch
//!   with exactly eight children.

use glam::DVec3;

use super::IndexConfig;
use super::InsertOutcome;
use crate::Region;

/// Grid address of a node.
///
/// Coordinates are at the node's own depth: the root is `(0, 0, 0, 0)` and a
/// node at depth `d` has `x, y, z < 2^d`. Parent/child keys are derived by
/// coordinate math, so a key can point "up" the tree without owning anything.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeKey {
  /// Grid X position at this node's depth
  pub x: u32,
  /// Grid Y position at this node's depth
  pub y: u32,
  /// Grid Z position at this node's depth
  pub z: u32,
  /// Depth below the root (root = 0)
  pub depth: u32,
}

impl NodeKey {
  /// Deepest depth a key can address.
  pub const MAX_DEPTH: u32 = 31;

  /// Key of the root node.
  pub const ROOT: Self = Self {
    x: 0,
    y: 0,
    z: 0,
    depth: 0,
  };

  pub fn new(x: u32, y: u32, z: u32, depth: u32) -> Self {
    Self { x, y, z, depth }
  }

  /// Get child key (one level deeper).
  ///
  /// Octant: 0-7 where bits represent +X, +Y, +Z offsets:
  /// - bit 0: X offset (0 or 1)
  /// - bit 1: Y offset (0 or 1)
  /// - bit 2: Z offset (0 or 1)
  ///
  /// Returns None at [`NodeKey::MAX_DEPTH`].
  pub fn child(&self, octant: u8) -> Option<Self> {
    if self.depth >= Self::MAX_DEPTH || octant > 7 {
      return None;
    }
    let cx = (octant & 1) as u32;
    let cy = ((octant >> 1) & 1) as u32;
    let cz = ((octant >> 2) & 1) as u32;
    Some(Self {
      x: self.x * 2 + cx,
      y: self.y * 2 + cy,
      z: self.z * 2 + cz,
      depth: self.depth + 1,
    })
  }

  /// Get parent key. Returns None for the root.
  pub fn parent(&self) -> Option<Self> {
    if self.depth == 0 {
      return None;
    }
    Some(Self {
      x: self.x / 2,
      y: self.y / 2,
      z: self.z / 2,
      depth: self.depth - 1,
    })
  }

  /// Which octant of its parent this node occupies.
  pub fn octant_in_parent(&self) -> Option<u8> {
    if self.depth == 0 {
      return None;
    }
    Some(((self.x & 1) | (self.y & 1) << 1 | (self.z & 1) << 2) as u8)
  }

  /// Octants to follow from the root to reach this key, shallowest first.
  pub fn path(&self) -> impl Iterator<Item = u8> + '_ {
    (1..=self.depth).map(move |level| {
      let shift = self.depth - level;
      let bx = (self.x >> shift) & 1;
      let by = (self.y >> shift) & 1;
      let bz = (self.z >> shift) & 1;
      (bx | by << 1 | bz << 2) as u8
    })
  }

  /// Region this key covers inside `world`.
  pub fn region_in(&self, world: &Region) -> Region {
    let scale = 2f64.powi(self.depth as i32);
    let extent = world.extent / scale;
    Region {
      origin: world.origin + DVec3::new(self.x as f64, self.y as f64, self.z as f64) * extent,
      extent,
    }
  }
}

/// A payload tagged with the position it was inserted at.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry<T> {
  pub position: DVec3,
  pub payload: T,
}

impl<T> Entry<T> {
  pub fn new(position: DVec3, payload: T) -> Self {
    Self { position, payload }
  }
}

/// Leaf bucket or branch children. A node is always exactly one of the two.
#[derive(Clone, Debug)]
pub enum NodeState<T> {
  /// Entries in insertion order. An empty bucket is an empty `Vec`.
  Leaf(Vec<Entry<T>>),
  /// Children indexed by octant.
  Branch(Box<[OctreeNode<T>; 8]>),
}

/// Owned octree node.
///
/// Children are exclusively owned by their parent. The way back up is
/// [`OctreeNode::parent`], a [`NodeKey`] resolved from the root.
#[derive(Clone, Debug)]
pub struct OctreeNode<T> {
  key: NodeKey,
  region: Region,
  state: NodeState<T>,
}

impl<T> OctreeNode<T> {
  /// Create an empty leaf.
  pub fn new_leaf(key: NodeKey, region: Region) -> Self {
    Self {
      key,
      region,
      state: NodeState::Leaf(Vec::new()),
    }
  }

  #[inline]
  pub fn key(&self) -> NodeKey {
    self.key
  }

  #[inline]
  pub fn region(&self) -> &Region {
    &self.region
  }

  #[inline]
  pub fn depth(&self) -> u32 {
    self.key.depth
  }

  /// Handle of the parent node, None for the root.
  #[inline]
  pub fn parent(&self) -> Option<NodeKey> {
    self.key.parent()
  }

  #[inline]
  pub fn state(&self) -> &NodeState<T> {
    &self.state
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    matches!(self.state, NodeState::Leaf(_))
  }

  #[inline]
  pub fn is_branch(&self) -> bool {
    matches!(self.state, NodeState::Branch(_))
  }

  /// Leaf bucket, None for a branch.
  pub fn entries(&self) -> Option<&[Entry<T>]> {
    match &self.state {
      NodeState::Leaf(entries) => Some(entries),
      NodeState::Branch(_) => None,
    }
  }

  /// Children, None for a leaf.
  pub fn children(&self) -> Option<&[OctreeNode<T>; 8]> {
    match &self.state {
      NodeState::Leaf(_) => None,
      NodeState::Branch(children) => Some(children),
    }
  }

  pub fn child(&self, octant: u8) -> Option<&OctreeNode<T>> {
    self.children().and_then(|c| c.get(octant as usize))
  }

  /// Walk down to the leaf a position routes to.
  pub fn descend(&self, position: DVec3) -> &OctreeNode<T> {
    let mut node = self;
    while let NodeState::Branch(children) = &node.state {
      node = &children[node.region.octant_for(position) as usize];
    }
    node
  }

  /// Resolve a key in this node's subtree.
  pub fn find(&self, key: NodeKey) -> Option<&OctreeNode<T>> {
    if key.depth < self.key.depth {
      return None;
    }
    let mut node = self;
    for octant in key.path().skip(self.key.depth as usize) {
      node = node.child(octant)?;
    }
    (node.key == key).then_some(node)
  }

  /// Leaves of this subtree, depth first, children in octant order.
  pub fn leaves(&self) -> Leaves<'_, T> {
    Leaves { stack: vec![self] }
  }

  /// Insert into this subtree, splitting full leaves the config allows to split.
  pub(crate) fn insert(&mut self, entry: Entry<T>, config: &IndexConfig, outcome: &mut InsertOutcome) {
    match &mut self.state {
      NodeState::Branch(children) => {
        let octant = self.region.octant_for(entry.position);
        children[octant as usize].insert(entry, config, outcome);
      }
      NodeState::Leaf(entries) => {
        if entries.len() < config.capacity {
          entries.push(entry);
          outcome.leaf = self.key;
          return;
        }
        if !config.allows_split(self.key.depth, &self.region) {
          #[cfg(feature = "tracing")]
          tracing::debug!(
            key = ?self.key,
            entries = entries.len() + 1,
            "depth guard reached, leaf exceeds capacity"
          );
          entries.push(entry);
          outcome.leaf = self.key;
          outcome.depth_limited = true;
          return;
        }
        self.subdivide();
        outcome.subdivisions += 1;
        self.insert(entry, config, outcome);
      }
    }
  }

  /// Turn this leaf into a branch with eight leaf children.
  ///
  /// Children are fully built and filled before the node's state is replaced,
  /// so the node is never seen half-split. No-op on a branch.
  pub(crate) fn subdivide(&mut self) {
    let NodeState::Leaf(entries) = &mut self.state else {
      return;
    };
    let entries = std::mem::take(entries);
    let key = self.key;
    let region = self.region;

    let mut children: [OctreeNode<T>; 8] = std::array::from_fn(|i| {
      let octant = i as u8;
      let child_key = key.child(octant).unwrap_or(key);
      OctreeNode::new_leaf(child_key, region.child_region(octant))
    });

    #[cfg(feature = "tracing")]
    tracing::trace!(key = ?key, entries = entries.len(), "subdividing leaf");

    for entry in entries {
      let octant = region.octant_for(entry.position) as usize;
      if let NodeState::Leaf(bucket) = &mut children[octant].state {
        bucket.push(entry);
      }
    }

    self.state = NodeState::Branch(Box::new(children));
  }

  /// Empty every leaf bucket in this subtree, keeping the branch structure.
  pub(crate) fn clear(&mut self) {
    match &mut self.state {
      NodeState::Leaf(entries) => entries.clear(),
      NodeState::Branch(children) => children.iter_mut().for_each(OctreeNode::clear),
    }
  }
}

/// Depth-first leaf iterator. See [`OctreeNode::leaves`].
pub struct Leaves<'a, T> {
  stack: Vec<&'a OctreeNode<T>>,
}

impl<'a, T> Iterator for Leaves<'a, T> {
  type Item = &'a OctreeNode<T>;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(node) = self.stack.pop() {
      match &node.state {
        NodeState::Leaf(_) => return Some(node),
        NodeState::Branch(children) => self.stack.extend(children.iter().rev()),
      }
    }
    None
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
