//! Log-backed view-consistency adaptor.
//!
//! This is the core subsystem described in full in `SPEC_FULL.md` §4.1: it
//! reconciles an in-memory view against an append-only log store and a
//! snapshot store, under optimistic concurrency and partial storage failure.
pub mod adaptor;
pub mod config;
pub mod log_store;
pub mod notification;
pub mod policy;
pub mod snapshot_store;
pub mod state;

pub use adaptor::LogViewAdaptor;
pub use config::{LogViewConfig, RedactedString, SerializerKind};
pub use log_store::{AppendOutcome, LogStore};
pub use notification::{NotificationQueue, UpdateNotification};
pub use policy::SnapshotPolicy;
pub use snapshot_store::{SnapshotHolder, SnapshotStore};

use std::collections::HashMap;
use std::error::Error as StdError;

use crate::ids::ClusterId;

/// Bit-per-cluster write-witness embedded in every snapshot (§3, §9).
///
/// Only parity matters: the adaptor flips its own cluster's bit before an
/// append attempt and, on an uncertain outcome, compares the bit it intended
/// against whatever is now on storage to tell whether the append actually
/// took effect.
pub type WriteBits = HashMap<ClusterId, bool>;

/// `{ snapshot, snapshotVersion, writeBits }` from §3 — the payload half of
/// a snapshot; the opaque etag is carried alongside it in [`SnapshotHolder`].
#[derive(Clone, Debug)]
pub struct SnapshotRecord<V> {
    pub snapshot: V,
    pub snapshot_version: u64,
    pub write_bits: WriteBits,
}

impl<V> SnapshotRecord<V> {
    pub fn fresh(initial: V) -> Self {
        Self {
            snapshot: initial,
            snapshot_version: 0,
            write_bits: WriteBits::new(),
        }
    }
}

/// Error returned by a host fold callback ([`HostFold`]); caught and logged
/// as `CaughtUserCodeException` (§4.1, §7) rather than propagated.
pub type HostFoldError = Box<dyn StdError + Send + Sync + 'static>;

/// "Apply one log entry to a view" (§9: "host callback as capability, not
/// inheritance"). Passed as a value rather than expressed via a base class.
pub trait HostFold<E, V>: Send + Sync + 'static {
    fn apply(&self, view: &mut V, entry: &E) -> Result<(), HostFoldError>;
}

impl<E, V, F> HostFold<E, V> for F
where
    F: Fn(&mut V, &E) -> Result<(), HostFoldError> + Send + Sync + 'static,
{
    fn apply(&self, view: &mut V, entry: &E) -> Result<(), HostFoldError> {
        (self)(view, entry)
    }
}

/// Returns the first log position covered by `updates` ending at `version`
/// (§3: "`version - len(updates)`").
pub fn first_position(version: u64, updates_len: usize) -> u64 {
    version.saturating_sub(updates_len as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_position_matches_spec_formula() {
        assert_eq!(first_position(10, 2), 8);
        assert_eq!(first_position(1, 1), 0);
    }

    #[test]
    fn fresh_snapshot_starts_at_version_zero() {
        let record = SnapshotRecord::fresh(42i32);
        assert_eq!(record.snapshot_version, 0);
        assert!(record.write_bits.is_empty());
    }
}
