//! Append-only log storage contract (§4.3).
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::ids::GrainKey;
use crate::retry::RetryAdvice;

fn transient_retry_advice() -> RetryAdvice {
    RetryAdvice::after(Duration::from_millis(50))
}

/// Outcome of a conditional [`LogStore::append`].
///
/// `VersionConflict` is a sharp, definitive signal: the contract guarantees
/// that when it is returned, nothing was appended. This is what lets the
/// write protocol (§4.1 step 3) skip its uncertain-outcome recovery loop on
/// a version mismatch and only enter it on `Err(CoreError)`, where the
/// outcome is genuinely unknown (timeout, connection loss mid-call, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The batch was appended; the log's new tail version.
    Appended(u64),
    /// `expected_version` did not match the store's current version; no
    /// data was written.
    VersionConflict,
}

/// Append-only per-grain event log (§4.3).
///
/// Implementations must make `append` atomic and conditional on
/// `expected_version`: either the whole batch lands contiguously at
/// `expected_version` and the call returns `Appended`, or nothing lands and
/// the call returns `VersionConflict`.
#[async_trait]
pub trait LogStore<E>: Send + Sync + 'static
where
    E: Send + Sync + 'static,
{
    /// Current tail version for `key`, or `0` for a grain with no entries.
    async fn get_last_version(&self, key: &GrainKey) -> Result<u64, CoreError>;

    /// Reads entries in `[from_version, to_version)`.
    async fn read(
        &self,
        key: &GrainKey,
        from_version: u64,
        to_version: u64,
    ) -> Result<Vec<E>, CoreError>;

    /// Conditionally appends `entries` starting at `expected_version`.
    async fn append(
        &self,
        key: &GrainKey,
        expected_version: u64,
        entries: Vec<E>,
    ) -> Result<AppendOutcome, CoreError>;
}

/// Fault-injection modes for [`InMemoryLogStore`], used to exercise the
/// adaptor's uncertain-outcome recovery loop (§4.1 step 3, §8 scenario:
/// "ambiguous append that actually committed").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFault {
    /// No fault; behave normally.
    None,
    /// `append` commits the batch but then returns `Err(CoreError)` as if
    /// the response had been lost in transit.
    AppendSucceedsButReportsTransportError,
    /// `append` always reports a transport failure without committing
    /// anything.
    AppendAlwaysTransportFails,
}

struct Inner<E> {
    entries: Vec<E>,
    fault: LogFault,
}

/// In-memory [`LogStore`] test double. Single-grain: callers in tests that
/// need several grains should construct one instance per [`GrainKey`].
pub struct InMemoryLogStore<E> {
    inner: Mutex<Inner<E>>,
    append_attempts: AtomicU64,
    poisoned: AtomicBool,
}

impl<E> InMemoryLogStore<E>
where
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                fault: LogFault::None,
            }),
            append_attempts: AtomicU64::new(0),
            poisoned: AtomicBool::new(false),
        }
    }

    pub fn with_fault(fault: LogFault) -> Self {
        let store = Self::new();
        store.inner.lock().unwrap().fault = fault;
        store
    }

    pub fn set_fault(&self, fault: LogFault) {
        self.inner.lock().unwrap().fault = fault;
    }

    /// Number of `append` calls observed so far, for asserting a test
    /// exercised the retry loop the expected number of times.
    pub fn append_attempts(&self) -> u64 {
        self.append_attempts.load(Ordering::Acquire)
    }

    pub fn committed_len(&self) -> u64 {
        self.inner.lock().unwrap().entries.len() as u64
    }

    /// Makes every subsequent call fail, simulating a store that has gone
    /// entirely unreachable (distinct from [`LogFault`], which only governs
    /// `append`).
    pub fn poison(&self) {
        self.poisoned.store(true, Ordering::Release);
    }
}

impl<E> Default for InMemoryLogStore<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E> LogStore<E> for InMemoryLogStore<E>
where
    E: Clone + Send + Sync + 'static,
{
    async fn get_last_version(&self, _key: &GrainKey) -> Result<u64, CoreError> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(CoreError::read_from_log_storage_failed(
                std::io::Error::other("store poisoned"),
                transient_retry_advice(),
            ));
        }
        Ok(self.inner.lock().unwrap().entries.len() as u64)
    }

    async fn read(
        &self,
        _key: &GrainKey,
        from_version: u64,
        to_version: u64,
    ) -> Result<Vec<E>, CoreError> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(CoreError::read_from_log_storage_failed(
                std::io::Error::other("store poisoned"),
                transient_retry_advice(),
            ));
        }
        let guard = self.inner.lock().unwrap();
        let from = from_version as usize;
        let to = (to_version as usize).min(guard.entries.len());
        if from >= to {
            return Ok(Vec::new());
        }
        Ok(guard.entries[from..to].to_vec())
    }

    async fn append(
        &self,
        key: &GrainKey,
        expected_version: u64,
        entries: Vec<E>,
    ) -> Result<AppendOutcome, CoreError> {
        self.append_attempts.fetch_add(1, Ordering::AcqRel);
        let mut guard = self.inner.lock().unwrap();
        let fault = guard.fault;

        if fault == LogFault::AppendAlwaysTransportFails {
            return Err(CoreError::update_log_storage_failed(
                std::io::Error::other(format!("simulated transport failure appending to {key}")),
                transient_retry_advice(),
            ));
        }

        if guard.entries.len() as u64 != expected_version {
            return Ok(AppendOutcome::VersionConflict);
        }

        guard.entries.extend(entries);
        let new_version = guard.entries.len() as u64;

        if fault == LogFault::AppendSucceedsButReportsTransportError {
            return Err(CoreError::update_log_storage_failed(
                std::io::Error::other(format!("simulated lost response for {key}")),
                transient_retry_advice(),
            ));
        }

        Ok(AppendOutcome::Appended(new_version))
    }
}
