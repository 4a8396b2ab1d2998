//! Abstract time source behind [`Clock`], so retry/backoff logic can be
//! driven by a virtual clock in tests instead of real wall-clock sleeps.
//!
//! # Design background (Why)
//! - The read/write recovery loops (§4.1) retry "stubbornly" on storage
//!   failure; tests that exercise those loops must not actually wait out
//!   real backoff windows.
//!
//! # Contract (What)
//! - `now` returns a monotonic time point; `sleep` returns a future that
//!   completes no earlier than the requested duration.
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Boxed sleep future returned by [`Clock::sleep`].
pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Abstract clock: get the current time, and wait for a duration.
///
/// Inject `Arc<dyn Clock>` into anything that needs to retry or back off, so
/// production code uses [`SystemClock`] and tests use [`MockClock`].
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration) -> Sleep;
}

/// Clock backed by `tokio::time`, used in production.
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Virtual clock for tests: `now()` only advances when [`MockClock::advance`]
/// is called, and `sleep` resolves as soon as the advanced time reaches the
/// requested deadline.
#[derive(Clone)]
pub struct MockClock {
    state: Arc<Mutex<MockClockState>>,
}

struct MockClockState {
    now: Instant,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockClockState { now: Instant::now() })),
        }
    }

    /// Advances the virtual clock; any pending [`Clock::sleep`] futures whose
    /// deadline has been reached resolve on their next poll.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock().expect("mock clock mutex poisoned");
        state.now += duration;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.state.lock().expect("mock clock mutex poisoned").now
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        let state = self.state.clone();
        let deadline = self.now() + duration;
        Box::pin(async move {
            loop {
                let now = state.lock().expect("mock clock mutex poisoned").now;
                if now >= deadline {
                    return;
                }
                tokio::task::yield_now().await;
            }
        })
    }
}
