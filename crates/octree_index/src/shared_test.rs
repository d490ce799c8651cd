use std::thread;

use super::*;
use crate::octree::IndexConfig;
use crate::producer::{feed, CancellationToken, PointGenerator};
use crate::Region;

fn shared(capacity: usize) -> SharedIndex<u64> {
  let world = Region::cube(DVec3::ZERO, 100.0).unwrap();
  SharedIndex::new(SpatialIndex::new(IndexConfig::new(world, capacity)).unwrap())
}

// =========================================================================
// SharedIndex
// =========================================================================

#[test]
fn test_shared_insert_and_retrieve() {
  let index = shared(4);
  index.insert(DVec3::splat(10.0), 1).unwrap();
  index.insert(DVec3::splat(90.0), 2).unwrap();

  assert_eq!(index.len().unwrap(), 2);
  assert!(index.retrieve(DVec3::splat(10.0)).unwrap().contains(&1));

  index.clear().unwrap();
  assert!(index.is_empty().unwrap());
}

/// Readers running beside inserts only ever see a consistent tree.
#[test]
fn test_concurrent_readers_see_consistent_tree() {
  let index = shared(2);
  let writer_index = index.clone();

  let writer = thread::spawn(move || {
    for (id, position) in PointGenerator::new(Region::cube(DVec3::ZERO, 100.0).unwrap(), 3)
      .take(2_000)
      .enumerate()
    {
      writer_index.insert(position, id as u64).unwrap();
    }
  });

  let readers: Vec<_> = (0..3)
    .map(|_| {
      let index = index.clone();
      thread::spawn(move || {
        for _ in 0..50 {
          index.read(|tree| tree.check_invariants()).unwrap().unwrap();
        }
      })
    })
    .collect();

  writer.join().unwrap();
  for reader in readers {
    reader.join().unwrap();
  }
  assert_eq!(index.len().unwrap(), 2_000);
}

// =========================================================================
// IndexWriter
// =========================================================================

#[test]
fn test_writer_applies_in_order() {
  let index = shared(4);
  let writer = IndexWriter::spawn(index.clone()).unwrap();

  writer.insert(DVec3::splat(5.0), 1).unwrap();
  writer.insert(DVec3::splat(6.0), 2).unwrap();
  writer.clear().unwrap();
  writer.insert(DVec3::splat(7.0), 3).unwrap();
  writer.flush().unwrap();

  assert_eq!(index.retrieve(DVec3::splat(7.0)).unwrap(), vec![3]);

  let report = writer.shutdown().unwrap();
  assert_eq!(report, WriterReport { applied: 4, rejected: 0 });
}

#[test]
fn test_writer_counts_rejected_mutations() {
  let index = shared(4);
  let writer = IndexWriter::spawn(index.clone()).unwrap();

  writer.insert(DVec3::splat(f64::NAN), 1).unwrap();
  writer.insert(DVec3::splat(1.0), 2).unwrap();

  let report = writer.shutdown().unwrap();
  assert_eq!(report, WriterReport { applied: 1, rejected: 1 });
  assert_eq!(index.len().unwrap(), 1);
}

/// Several producers share one writer; every point ends up in the tree.
#[test]
fn test_writer_with_multiple_producers() {
  let index = shared(8);
  let writer = IndexWriter::spawn_bounded(index.clone(), 64).unwrap();
  let world = Region::cube(DVec3::ZERO, 100.0).unwrap();

  let producers: Vec<_> = (0..4u64)
    .map(|seed| {
      let sender = writer.sender().unwrap();
      let token = CancellationToken::new();
      thread::spawn(move || {
        let source = PointGenerator::new(world, seed).map(move |p| (p, seed));
        feed(source, 500, &token, |position, payload| sender.insert(position, payload)).unwrap()
      })
    })
    .collect();

  for producer in producers {
    let report = producer.join().unwrap();
    assert_eq!(report.produced, 500);
  }

  let report = writer.shutdown().unwrap();
  assert_eq!(report.applied, 2_000);
  assert_eq!(index.len().unwrap(), 2_000);
  assert!(index.read(|tree| tree.check_invariants()).unwrap().is_ok());
}

/// A cancelled feed leaves exactly the points it produced, nothing partial.
#[test]
fn test_cancelled_feed_leaves_consistent_tree() {
  let index = shared(4);
  let writer = IndexWriter::spawn(index.clone()).unwrap();
  let sender = writer.sender().unwrap();
  let token = CancellationToken::new();
  let world = Region::cube(DVec3::ZERO, 100.0).unwrap();

  let controller = token.clone();
  let report = feed(PointGenerator::new(world, 9).zip(0u64..), 10_000, &token, |position, id| {
    if id == 299 {
      controller.cancel();
    }
    sender.insert(position, id)
  })
  .unwrap();
  drop(sender);

  assert!(report.cancelled);
  writer.shutdown().unwrap();
  assert_eq!(index.len().unwrap(), report.produced);
  assert!(index.read(|tree| tree.check_invariants()).unwrap().is_ok());
}

#[test]
fn test_shutdown_waits_for_outstanding_senders() {
  let index = shared(4);
  let writer = IndexWriter::spawn(index).unwrap();
  let sender = writer.sender().unwrap();

  let handle = thread::spawn(move || writer.shutdown());
  // The writer only exits once this last sender is gone.
  sender.insert(DVec3::ONE, 1).unwrap();
  drop(sender);

  let report = handle.join().unwrap().unwrap();
  assert_eq!(report.applied, 1);
}
