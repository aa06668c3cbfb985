//! Per-operation status tracking.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tablebook_core::{OperationKind, OperationStatus};

#[derive(Debug, Default, Clone, Copy)]
struct Entry {
    in_flight: usize,
    last: OperationStatus,
}

/// Tracks `idle -> in-flight -> {succeeded, failed}` for each operation kind.
///
/// A kind is `InFlight` while any invocation of it is pending; otherwise it
/// reports the terminal status of the most recently completed invocation.
#[derive(Debug, Default)]
pub struct OperationTracker {
    entries: Mutex<HashMap<OperationKind, Entry>>,
}

impl OperationTracker {
    /// Create a tracker with every kind idle.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<OperationKind, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current status of an operation kind.
    pub fn status(&self, kind: OperationKind) -> OperationStatus {
        let entries = self.entries();
        match entries.get(&kind) {
            Some(entry) if entry.in_flight > 0 => OperationStatus::InFlight,
            Some(entry) => entry.last,
            None => OperationStatus::Idle,
        }
    }

    /// Number of pending invocations of a kind.
    pub fn in_flight(&self, kind: OperationKind) -> usize {
        self.entries().get(&kind).map_or(0, |e| e.in_flight)
    }

    /// Mark an invocation as started.
    pub fn begin(&self, kind: OperationKind) -> InFlight<'_> {
        self.entries().entry(kind).or_default().in_flight += 1;
        InFlight {
            tracker: self,
            kind,
            finished: false,
        }
    }

    fn end(&self, kind: OperationKind, status: Option<OperationStatus>) {
        let mut entries = self.entries();
        let entry = entries.entry(kind).or_default();
        entry.in_flight = entry.in_flight.saturating_sub(1);
        if let Some(status) = status {
            entry.last = status;
        }
    }
}

/// A pending invocation.
///
/// Dropping it without [`InFlight::finish`] (the caller abandoned the
/// future) clears the pending mark and leaves the last status as it was.
#[must_use]
pub struct InFlight<'a> {
    tracker: &'a OperationTracker,
    kind: OperationKind,
    finished: bool,
}

impl InFlight<'_> {
    /// Record the invocation's terminal status.
    pub fn finish(mut self, status: OperationStatus) {
        self.finished = true;
        self.tracker.end(self.kind, Some(status));
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.tracker.end(self.kind, None);
        }
    }
}
