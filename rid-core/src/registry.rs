//! Concurrently-accessed registry of observed devices.
//!
//! Three independent activities serialize through one mutex: the radio
//! callback (producer), the eviction sweep, and the snapshot consumer.
//! The acquisition policies differ per caller and are part of the API:
//!
//! - `ingest` uses a non-blocking `try_lock`. A radio callback that
//!   blocks risks dropping subsequent events or stalling the receiver,
//!   so on contention the advertisement is dropped instead.
//! - `snapshot` and `evict_stale` use a bounded `try_lock_for` and skip
//!   the cycle on timeout.
//!
//! Nothing holds the lock across I/O; per-advertisement work is bounded
//! by the payload length.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::record::DroneRecord;
use crate::scan::{extract_messages, Advertisement, DeviceKey};

/// Result of feeding one advertisement to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Upserted; `messages` blocks were decoded and merged (may be 0 for
    /// an anchored advertisement with no decodable blocks).
    Applied { messages: usize },
    /// Too short or no anchor marker: not a Remote ID advertisement.
    NotRemoteId,
    /// Lock held by the sweep or a consumer; advertisement dropped.
    Contended,
}

/// Registry of observed devices, keyed by (MAC, PHY).
///
/// Backed by an insertion-ordered Vec with linear key lookup: live
/// device counts are tens, not thousands, and insertion order is what
/// consumers render.
pub struct Registry {
    records: Mutex<Vec<DroneRecord>>,
    ingested: AtomicU64,
    dropped: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            records: Mutex::new(Vec::new()),
            ingested: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Producer path: segment, then upsert-and-merge under a
    /// non-blocking lock attempt.
    ///
    /// Segmentation runs before the lock is taken so contention is only
    /// possible around the registry mutation itself. Lookup, create, and
    /// merge happen under one guard, so two concurrent advertisements
    /// for a new device can never create a duplicate record.
    pub fn ingest(&self, adv: &Advertisement) -> IngestOutcome {
        let messages = match extract_messages(&adv.payload) {
            Some(m) => m,
            None => return IngestOutcome::NotRemoteId,
        };

        let mut records = match self.records.try_lock() {
            Some(guard) => guard,
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return IngestOutcome::Contended;
            }
        };

        let record = upsert(&mut records, adv.key(), adv.timestamp);
        record.rssi = adv.rssi;
        record.last_seen = adv.timestamp;
        for msg in &messages {
            record.apply(msg);
        }

        self.ingested.fetch_add(1, Ordering::Relaxed);
        IngestOutcome::Applied {
            messages: messages.len(),
        }
    }

    /// Consumer path: copy the current records out under a bounded lock
    /// wait, in insertion order. `None` means the wait timed out and the
    /// caller should skip this cycle.
    pub fn snapshot(&self, wait: Duration) -> Option<Vec<DroneRecord>> {
        let records = self.records.try_lock_for(wait)?;
        Some(records.clone())
    }

    /// Sweep path: remove every record unseen for longer than `timeout`
    /// seconds. Returns the number evicted, or `None` on lock timeout.
    pub fn evict_stale(&self, now: f64, timeout: f64, wait: Duration) -> Option<usize> {
        let mut records = self.records.try_lock_for(wait)?;
        let before = records.len();
        records.retain(|r| now - r.last_seen <= timeout);
        Some(before - records.len())
    }

    /// Advertisements applied so far.
    pub fn ingested(&self) -> u64 {
        self.ingested.load(Ordering::Relaxed)
    }

    /// Advertisements dropped on lock contention.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

fn upsert(records: &mut Vec<DroneRecord>, key: DeviceKey, timestamp: f64) -> &mut DroneRecord {
    let idx = match records.iter().position(|r| r.key == key) {
        Some(i) => i,
        None => {
            records.push(DroneRecord::new(key, timestamp));
            records.len() - 1
        }
    };
    &mut records[idx]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
