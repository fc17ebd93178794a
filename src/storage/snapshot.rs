// src/storage/snapshot.rs
use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::Arc;
use log::debug;
use parking_lot::RwLock;

/// Holds the latest snapshot of one statistic.
///
/// Writers take a ticket with [`SnapshotCell::begin`] before resolving and
/// hand it back to [`SnapshotCell::publish`]. Only the most recently issued
/// ticket may install its snapshot, so a slow resolution that finishes after
/// a newer one started is dropped instead of overwriting fresher data.
pub struct SnapshotCell<T> {
    issued: AtomicU64,
    current: RwLock<Option<Installed<T>>>,
}

struct Installed<T> {
    sequence: u64,
    snapshot: Arc<T>,
}

impl<T> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotCell<T> {
    pub fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            current: RwLock::new(None),
        }
    }

    pub fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn publish(&self, ticket: u64, snapshot: T) -> bool {
        let mut current = self.current.write();
        let latest = self.issued.load(Ordering::SeqCst);
        let installed = current.as_ref().map_or(0, |c| c.sequence);

        if ticket != latest || ticket <= installed {
            debug!("Discarding stale snapshot #{} (latest issued #{}, installed #{})", ticket, latest, installed);
            return false;
        }

        *current = Some(Installed {
            sequence: ticket,
            snapshot: Arc::new(snapshot),
        });
        true
    }

    pub fn current(&self) -> Option<Arc<T>> {
        self.current.read().as_ref().map(|c| Arc::clone(&c.snapshot))
    }

    /// Ticket of the installed snapshot, 0 when empty.
    pub fn sequence(&self) -> u64 {
        self.current.read().as_ref().map_or(0, |c| c.sequence)
    }
}
