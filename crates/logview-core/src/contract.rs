//! Small cross-cutting primitives shared by the adaptor's public contract.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cooperative cancellation token.
///
/// The adaptor's read/write recovery loops are otherwise unbounded (§5:
/// "the adaptor is stubborn"); a `Cancellation` gives a host a way to stop
/// a stuck retry loop without introducing a hard timeout into the protocol
/// itself.
#[derive(Clone, Debug)]
pub struct Cancellation {
    inner: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Marks this token cancelled. Returns `true` on the call that actually
    /// flips the flag; later calls return `false`.
    pub fn cancel(&self) -> bool {
        self.inner
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn child(&self) -> Self {
        self.clone()
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// An absolute point in time after which an operation should be treated as
/// timed out. Not used to drive the storage retry loops directly (§5: the
/// adaptor has no global timeout) but available to hosts that want to cap
/// an individual `ReadAsync`/`WriteAsync` call from the outside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn with_timeout(now: Instant, timeout: Duration) -> Self {
        Self { at: now + timeout }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.at
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.at.saturating_duration_since(now)
    }
}

/// Result of driving a [`ContractStateMachine`] with one signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateAdvance<S>
where
    S: Copy + Eq,
{
    /// State did not change (e.g. a duplicate or already-handled signal).
    Noop { state: S },
    /// State moved from `from` to `to`.
    Transition { from: S, to: S },
}

/// Minimal state machine interface: query the current state, drive it with
/// a signal. Used by [`crate::consistency::adaptor::LogViewAdaptor`] to model
/// its `Idle -> Reading -> Idle -> Writing -> ...` lifecycle (§4.1).
pub trait ContractStateMachine {
    type State: Copy + Eq;
    type Signal;

    fn state(&self) -> Self::State;
    fn on_signal(&mut self, signal: &Self::Signal) -> StateAdvance<Self::State>;
}
