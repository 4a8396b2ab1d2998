//! Retry advice and backoff bookkeeping for the read/write recovery loops.
//!
//! # Design background (Why)
//! - §4.1's read and write protocols both retry indefinitely on storage
//!   failure ("the adaptor is stubborn"); without an accumulating backoff a
//!   tight failure loop would hammer the store at a fixed interval.
//!
//! # Layout (How)
//! - [`RetryAdvice`] is attached to a `Retryable` [`crate::error::ErrorCategory`].
//! - [`RetryRhythm`] accumulates consecutive observations so that repeated
//!   failures widen the wait window instead of resetting it.
use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::time::Clock;

/// A single "wait this long before retrying" recommendation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryAdvice {
    pub wait: Duration,
    pub reason: Option<Cow<'static, str>>,
}

impl RetryAdvice {
    pub const fn after(wait: Duration) -> Self {
        Self { wait, reason: None }
    }

    pub fn with_reason(mut self, reason: impl Into<Cow<'static, str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Accumulates successive [`RetryAdvice`] observations into a monotonically
/// advancing "earliest next attempt" time point, so a storm of storage
/// failures backs off rather than retrying at whatever fixed interval the
/// first failure suggested.
#[derive(Clone, Debug, Default)]
pub struct RetryRhythm {
    next_allowed: Option<Instant>,
    accumulated: Duration,
}

impl RetryRhythm {
    pub const fn new() -> Self {
        Self {
            next_allowed: None,
            accumulated: Duration::from_secs(0),
        }
    }

    /// Records a new advice observation and returns the updated earliest
    /// retry time point.
    pub fn observe(&mut self, now: Instant, advice: &RetryAdvice) -> Instant {
        let anchor = self.next_allowed.unwrap_or(now);
        let base = now.max(anchor);
        let next = base + advice.wait;
        self.next_allowed = Some(next);
        self.accumulated += advice.wait;
        next
    }

    pub fn accumulated_wait(&self) -> Duration {
        self.accumulated
    }

    pub fn remaining_delay(&self, now: Instant) -> Duration {
        match self.next_allowed {
            Some(deadline) if deadline > now => deadline - now,
            _ => Duration::from_secs(0),
        }
    }

    pub fn reset(&mut self) {
        self.next_allowed = None;
        self.accumulated = Duration::from_secs(0);
    }
}

/// Observes one [`RetryAdvice`] against `rhythm` and sleeps on `clock` for
/// the resulting remaining delay. Used by the read/write recovery loops
/// between a failed storage call and the next retry attempt.
pub async fn backoff_once(clock: &Arc<dyn Clock>, rhythm: &mut RetryRhythm, advice: &RetryAdvice) {
    let now = clock.now();
    rhythm.observe(now, advice);
    let remaining = rhythm.remaining_delay(now);
    if !remaining.is_zero() {
        clock.sleep(remaining).await;
    }
}
