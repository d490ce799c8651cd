//! Single-writer access to a spatial index shared between threads.
//!
//! Two layers:
//! - [`SharedIndex`]: the index behind an `RwLock`. Every mutation holds the
//!   write lock for the whole call, so readers never observe a leaf halfway
//!   through becoming a branch.
//! - [`IndexWriter`]: a mutation queue drained by one dedicated thread. Any
//!   number of producers can enqueue; only the writer thread mutates.
//!
//! # Usage
//!
//! ```ignore
//! let shared = SharedIndex::new(SpatialIndex::new(IndexConfig::default())?);
//! let writer = IndexWriter::spawn(shared.clone())?;
//!
//! // Producer threads enqueue (non-blocking)
//! writer.insert(DVec3::new(1.0, 2.0, 3.0), payload)?;
//!
//! // Wait until everything queued so far is in the tree
//! writer.flush()?;
//! let hits = shared.retrieve(DVec3::new(1.0, 2.0, 3.0))?;
//! ```

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use glam::DVec3;

use crate::octree::{IndexStats, InsertOutcome, SpatialIndex};
use crate::IndexError;

/// Spatial index behind a reader/writer lock.
pub struct SharedIndex<T> {
  inner: Arc<RwLock<SpatialIndex<T>>>,
}

impl<T> Clone for SharedIndex<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T> SharedIndex<T> {
  pub fn new(index: SpatialIndex<T>) -> Self {
    Self {
      inner: Arc::new(RwLock::new(index)),
    }
  }

  fn read_guard(&self) -> Result<RwLockReadGuard<'_, SpatialIndex<T>>, IndexError> {
    self.inner.read().map_err(|_| IndexError::LockPoisoned)
  }

  fn write_guard(&self) -> Result<RwLockWriteGuard<'_, SpatialIndex<T>>, IndexError> {
    self.inner.write().map_err(|_| IndexError::LockPoisoned)
  }

  /// Run `f` with shared access.
  pub fn read<R>(&self, f: impl FnOnce(&SpatialIndex<T>) -> R) -> Result<R, IndexError> {
    Ok(f(&*self.read_guard()?))
  }

  /// Run `f` with exclusive access.
  pub fn write<R>(&self, f: impl FnOnce(&mut SpatialIndex<T>) -> R) -> Result<R, IndexError> {
    Ok(f(&mut *self.write_guard()?))
  }

  pub fn insert(&self, position: DVec3, payload: T) -> Result<InsertOutcome, IndexError> {
    self.write_guard()?.insert(position, payload)
  }

  pub fn clear(&self) -> Result<(), IndexError> {
    self.write_guard()?.clear();
    Ok(())
  }

  pub fn reset(&self) -> Result<(), IndexError> {
    self.write_guard()?.reset();
    Ok(())
  }

  pub fn len(&self) -> Result<usize, IndexError> {
    self.read(SpatialIndex::len)
  }

  pub fn is_empty(&self) -> Result<bool, IndexError> {
    self.read(SpatialIndex::is_empty)
  }

  pub fn stats(&self) -> Result<IndexStats, IndexError> {
    self.read(SpatialIndex::stats)
  }
}

impl<T: Clone> SharedIndex<T> {
  /// Owned payloads of the leaf the position routes to.
  pub fn retrieve(&self, position: DVec3) -> Result<Vec<T>, IndexError> {
    self.read(|index| index.retrieve_cloned(position))
  }
}

/// A queued change to the index.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation<T> {
  Insert { position: DVec3, payload: T },
  Clear,
  Reset,
}

enum Command<T> {
  Apply(Mutation<T>),
  /// Acknowledged once every command queued before it has been applied.
  Flush(Sender<()>),
}

/// Counts from a finished writer thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriterReport {
  /// Mutations applied to the index.
  pub applied: u64,
  /// Mutations the index refused (e.g. non-finite positions).
  pub rejected: u64,
}

/// Cloneable handle producers use to enqueue mutations.
pub struct MutationSender<T> {
  sender: Sender<Command<T>>,
}

impl<T> Clone for MutationSender<T> {
  fn clone(&self) -> Self {
    Self {
      sender: self.sender.clone(),
    }
  }
}

impl<T> MutationSender<T> {
  pub fn submit(&self, mutation: Mutation<T>) -> Result<(), IndexError> {
    self
      .sender
      .send(Command::Apply(mutation))
      .map_err(|_| IndexError::WriterClosed)
  }

  pub fn insert(&self, position: DVec3, payload: T) -> Result<(), IndexError> {
    self.submit(Mutation::Insert { position, payload })
  }

  /// Block until every mutation this handle queued earlier has been applied.
  pub fn flush(&self) -> Result<(), IndexError> {
    let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
    self
      .sender
      .send(Command::Flush(ack_tx))
      .map_err(|_| IndexError::WriterClosed)?;
    ack_rx.recv().map_err(|_| IndexError::WriterClosed)
  }
}

/// Dedicated writer thread draining a mutation queue into a [`SharedIndex`].
///
/// The thread exits once every [`MutationSender`] (including the writer's own)
/// is dropped. Dropping the writer without [`shutdown`](Self::shutdown) also
/// waits for the queue to drain.
pub struct IndexWriter<T: Send + Sync + 'static> {
  sender: Option<MutationSender<T>>,
  handle: Option<JoinHandle<WriterReport>>,
  index: SharedIndex<T>,
}

impl<T: Send + Sync + 'static> IndexWriter<T> {
  /// Start a writer with an unbounded queue.
  pub fn spawn(index: SharedIndex<T>) -> Result<Self, IndexError> {
    let (sender, receiver) = crossbeam_channel::unbounded();
    Self::start(index, sender, receiver)
  }

  /// Start a writer whose queue holds at most `capacity` commands; producers
  /// block when it is full.
  pub fn spawn_bounded(index: SharedIndex<T>, capacity: usize) -> Result<Self, IndexError> {
    let (sender, receiver) = crossbeam_channel::bounded(capacity);
    Self::start(index, sender, receiver)
  }

  fn start(
    index: SharedIndex<T>,
    sender: Sender<Command<T>>,
    receiver: Receiver<Command<T>>,
  ) -> Result<Self, IndexError> {
    let target = index.clone();
    let handle = std::thread::Builder::new()
      .name("octree-writer".into())
      .spawn(move || drain(&target, &receiver))
      .map_err(|err| IndexError::WriterSpawn(err.to_string()))?;

    Ok(Self {
      sender: Some(MutationSender { sender }),
      handle: Some(handle),
      index,
    })
  }

  /// New producer handle.
  pub fn sender(&self) -> Result<MutationSender<T>, IndexError> {
    self.sender.clone().ok_or(IndexError::WriterClosed)
  }

  pub fn submit(&self, mutation: Mutation<T>) -> Result<(), IndexError> {
    self.sender.as_ref().ok_or(IndexError::WriterClosed)?.submit(mutation)
  }

  pub fn insert(&self, position: DVec3, payload: T) -> Result<(), IndexError> {
    self.submit(Mutation::Insert { position, payload })
  }

  pub fn clear(&self) -> Result<(), IndexError> {
    self.submit(Mutation::Clear)
  }

  /// Block until every mutation queued through the writer's handle so far
  /// has been applied.
  pub fn flush(&self) -> Result<(), IndexError> {
    self.sender.as_ref().ok_or(IndexError::WriterClosed)?.flush()
  }

  /// The index this writer mutates, for readers.
  pub fn index(&self) -> &SharedIndex<T> {
    &self.index
  }

  /// Close the writer's handle, drain the queue and join the thread.
  ///
  /// Blocks until all outstanding [`MutationSender`] clones are dropped.
  pub fn shutdown(mut self) -> Result<WriterReport, IndexError> {
    self.finish()
  }

  fn finish(&mut self) -> Result<WriterReport, IndexError> {
    self.sender = None;
    match self.handle.take() {
      Some(handle) => handle.join().map_err(|_| IndexError::WriterClosed),
      None => Ok(WriterReport::default()),
    }
  }
}

impl<T: Send + Sync + 'static> Drop for IndexWriter<T> {
  fn drop(&mut self) {
    let _ = self.finish();
  }
}

fn drain<T>(index: &SharedIndex<T>, receiver: &Receiver<Command<T>>) -> WriterReport {
  let mut report = WriterReport::default();

  for command in receiver.iter() {
    match command {
      Command::Apply(mutation) => match apply(index, mutation) {
        Ok(()) => report.applied += 1,
        Err(IndexError::LockPoisoned) => {
          #[cfg(feature = "tracing")]
          tracing::error!("index lock poisoned, writer stopping");
          break;
        }
        Err(_err) => {
          #[cfg(feature = "tracing")]
          tracing::warn!(error = %_err, "mutation rejected");
          report.rejected += 1;
        }
      },
      Command::Flush(ack) => {
        let _ = ack.send(());
      }
    }
  }

  #[cfg(feature = "tracing")]
  tracing::debug!(applied = report.applied, rejected = report.rejected, "writer drained");

  report
}

fn apply<T>(index: &SharedIndex<T>, mutation: Mutation<T>) -> Result<(), IndexError> {
  match mutation {
    Mutation::Insert { position, payload } => index.insert(position, payload).map(|_| ()),
    Mutation::Clear => index.clear(),
    Mutation::Reset => index.reset(),
  }
}

#[cfg(test)]
#[path = "shared_test.rs"]
mod shared_test;
