//! Audit trail of raw request/response exchanges
//!
//! Every outbound request body and every inbound response line passes through
//! a [`TraceBuffer`] owned by the client instance. The buffer is shared by all
//! in-flight calls on that instance, so entries from concurrent calls
//! interleave in wall-clock arrival order; a single lock serializes appends,
//! snapshots and clears.
//!
//! The buffer itself enforces no size bound. Callers that keep a client alive
//! for a long time bound growth with [`TraceBuffer::clear_before`] or
//! [`TraceBuffer::clear_older_than`].

use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// Which way an exchange went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// A request body we sent
    Outbound,
    /// A response line we received
    Inbound,
}

/// One recorded exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    /// Wall-clock time the request was sent or the response line arrived
    pub at: SystemTime,

    /// Request or response
    pub direction: Direction,

    /// Endpoint path, e.g. `/api/chat`
    pub endpoint: String,

    /// The raw JSON text
    pub json: String,
}

/// Thread-safe append-only log of raw exchanges.
#[derive(Debug, Default)]
pub struct TraceBuffer {
    entries: Mutex<Vec<TraceEntry>>,
}

impl TraceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one exchange, stamped with the current wall clock.
    pub fn record(&self, direction: Direction, endpoint: &str, json: &str) {
        let entry = TraceEntry {
            at: SystemTime::now(),
            direction,
            endpoint: endpoint.to_string(),
            json: json.to_string(),
        };
        self.lock().push(entry);
    }

    /// Copy of the current trail.
    ///
    /// With `and_clear` the trail is emptied inside the same critical
    /// section: no entry is both returned and retained, and no concurrent
    /// append can land between the copy and the clear.
    pub fn snapshot(&self, and_clear: bool) -> Vec<TraceEntry> {
        let mut entries = self.lock();
        if and_clear {
            std::mem::take(&mut *entries)
        } else {
            entries.clone()
        }
    }

    /// Empty the trail.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Drop every entry strictly older than `before`, keeping the relative
    /// order of the rest.
    pub fn clear_before(&self, before: SystemTime) {
        self.lock().retain(|entry| entry.at >= before);
    }

    /// Drop every entry older than the given age.
    pub fn clear_older_than(&self, age: Duration) {
        let before = SystemTime::now()
            .checked_sub(age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self.clear_before(before);
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TraceEntry>> {
        // A panic while holding the lock leaves the trail intact; keep
        // serving it rather than propagating the poison.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
