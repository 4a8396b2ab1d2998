//! Snapshot storage contract (§4.4).
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::ids::GrainKey;
use crate::retry::RetryAdvice;

use super::SnapshotRecord;

fn transient_retry_advice() -> RetryAdvice {
    RetryAdvice::after(Duration::from_millis(50))
}

/// A [`SnapshotRecord`] paired with the opaque etag storage handed back on
/// read, required on write for optimistic concurrency (§4.4).
#[derive(Clone, Debug)]
pub struct SnapshotHolder<V> {
    pub record: SnapshotRecord<V>,
    pub etag: Option<String>,
}

impl<V> SnapshotHolder<V> {
    pub fn absent() -> Self
    where
        V: Default,
    {
        Self {
            record: SnapshotRecord::fresh(V::default()),
            etag: None,
        }
    }
}

/// Result of a conditional [`SnapshotStore::write_state`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotWriteOutcome {
    /// Write succeeded; the new etag to carry forward.
    Written,
    /// The etag passed in no longer matched storage; nothing was written.
    EtagConflict,
}

/// Durable store for the periodic `{ snapshot, snapshotVersion, writeBits }`
/// checkpoint (§4.4). Distinct from [`super::LogStore`]: it holds at most one
/// record per grain rather than an append-only sequence.
#[async_trait]
pub trait SnapshotStore<V>: Send + Sync + 'static
where
    V: Clone + Send + Sync + 'static,
{
    async fn read_state(&self, key: &GrainKey) -> Result<SnapshotHolder<V>, CoreError>;

    async fn write_state(
        &self,
        key: &GrainKey,
        record: SnapshotRecord<V>,
        expected_etag: Option<&str>,
    ) -> Result<SnapshotWriteOutcome, CoreError>;
}

/// Fault-injection modes for [`InMemorySnapshotStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotFault {
    None,
    ReadAlwaysFails,
    WriteAlwaysFails,
}

struct Inner<V> {
    holder: SnapshotHolder<V>,
    next_etag: u64,
    fault: SnapshotFault,
}

/// In-memory [`SnapshotStore`] test double, single-grain like
/// [`super::log_store::InMemoryLogStore`].
pub struct InMemorySnapshotStore<V> {
    inner: Mutex<Inner<V>>,
}

impl<V> InMemorySnapshotStore<V>
where
    V: Clone + Default + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                holder: SnapshotHolder::absent(),
                next_etag: 1,
                fault: SnapshotFault::None,
            }),
        }
    }

    pub fn set_fault(&self, fault: SnapshotFault) {
        self.inner.lock().unwrap().fault = fault;
    }

    pub fn current_version(&self) -> u64 {
        self.inner.lock().unwrap().holder.record.snapshot_version
    }
}

impl<V> Default for InMemorySnapshotStore<V>
where
    V: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> SnapshotStore<V> for InMemorySnapshotStore<V>
where
    V: Clone + Default + Send + Sync + 'static,
{
    async fn read_state(&self, _key: &GrainKey) -> Result<SnapshotHolder<V>, CoreError> {
        let guard = self.inner.lock().unwrap();
        if guard.fault == SnapshotFault::ReadAlwaysFails {
            return Err(CoreError::read_from_snapshot_storage_failed(
                std::io::Error::other("simulated snapshot read failure"),
                transient_retry_advice(),
            ));
        }
        Ok(guard.holder.clone())
    }

    async fn write_state(
        &self,
        _key: &GrainKey,
        record: SnapshotRecord<V>,
        expected_etag: Option<&str>,
    ) -> Result<SnapshotWriteOutcome, CoreError> {
        let mut guard = self.inner.lock().unwrap();
        if guard.fault == SnapshotFault::WriteAlwaysFails {
            return Err(CoreError::update_snapshot_storage_failed(
                std::io::Error::other("simulated snapshot write failure"),
                transient_retry_advice(),
            ));
        }

        if guard.holder.etag.as_deref() != expected_etag {
            return Ok(SnapshotWriteOutcome::EtagConflict);
        }

        let etag = guard.next_etag.to_string();
        guard.next_etag += 1;
        guard.holder = SnapshotHolder {
            record,
            etag: Some(etag),
        };
        Ok(SnapshotWriteOutcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> GrainKey {
        GrainKey::new("test.Grain", "g1")
    }

    #[tokio::test]
    async fn write_with_matching_etag_commits_and_advances_etag() {
        let store = InMemorySnapshotStore::<i32>::new();
        let holder = store.read_state(&key()).await.unwrap();
        assert!(holder.etag.is_none());

        let outcome = store
            .write_state(&key(), SnapshotRecord::fresh(7), holder.etag.as_deref())
            .await
            .unwrap();
        assert_eq!(outcome, SnapshotWriteOutcome::Written);

        let holder = store.read_state(&key()).await.unwrap();
        assert_eq!(holder.record.snapshot, 7);
        assert!(holder.etag.is_some());
    }

    #[tokio::test]
    async fn write_with_stale_etag_reports_conflict() {
        let store = InMemorySnapshotStore::<i32>::new();
        store
            .write_state(&key(), SnapshotRecord::fresh(1), None)
            .await
            .unwrap();

        let outcome = store
            .write_state(&key(), SnapshotRecord::fresh(2), None)
            .await
            .unwrap();
        assert_eq!(outcome, SnapshotWriteOutcome::EtagConflict);
        assert_eq!(store.current_version(), 0);
    }
}
