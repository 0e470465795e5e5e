//! The data source capability: snapshot subscriptions.
//!
//! A data source hands the controller the receiving end of a snapshot
//! channel on `connect()`. The controller drains it from `poll()`, running
//! one complete reconciliation pass per snapshot; the channel serializes
//! deliveries, so passes never overlap. `disconnect()` is called when the
//! controller switches sources, detaches, or is torn down.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

/// A producer of dataset snapshots.
pub trait DataSource<T> {
    /// Begin producing snapshots. The returned receiver yields each new
    /// dataset in emission order; it may yield any number of snapshots,
    /// including none.
    fn connect(&mut self) -> Receiver<Vec<T>>;

    /// Stop producing. Emissions after this are dropped.
    fn disconnect(&mut self);
}

/// A channel-backed [`DataSource`] for callers that push snapshots by hand.
///
/// # Example
///
/// ```
/// use trellis::SnapshotSource;
///
/// let source = SnapshotSource::new();
/// let handle = source.handle();
/// handle.emit(vec![1u32, 2, 3]);
/// ```
#[derive(Debug)]
pub struct SnapshotSource<T> {
    tx: Arc<Mutex<Option<Sender<Vec<T>>>>>,
}

impl<T> Default for SnapshotSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotSource<T> {
    /// Create a disconnected source.
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    /// A handle for emitting snapshots into this source.
    pub fn handle(&self) -> SnapshotHandle<T> {
        SnapshotHandle {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> DataSource<T> for SnapshotSource<T> {
    fn connect(&mut self) -> Receiver<Vec<T>> {
        let (tx, rx) = channel();
        if let Ok(mut guard) = self.tx.lock() {
            *guard = Some(tx);
        }
        log::debug!("snapshot source connected");
        rx
    }

    fn disconnect(&mut self) {
        if let Ok(mut guard) = self.tx.lock() {
            *guard = None;
        }
        log::debug!("snapshot source disconnected");
    }
}

/// Emitting half of a [`SnapshotSource`].
///
/// Cloneable; emissions while the source is disconnected are dropped.
#[derive(Debug)]
pub struct SnapshotHandle<T> {
    tx: Arc<Mutex<Option<Sender<Vec<T>>>>>,
}

impl<T> Clone for SnapshotHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> SnapshotHandle<T> {
    /// Emit a dataset snapshot.
    ///
    /// Non-blocking. Dropped silently when the source is not connected.
    pub fn emit(&self, dataset: Vec<T>) {
        if let Ok(guard) = self.tx.lock() {
            if let Some(tx) = guard.as_ref() {
                let _ = tx.send(dataset);
            }
        }
    }
}
