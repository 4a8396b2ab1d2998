//! Layered error model shared by every component of this crate.
//!
//! # Design background (Why)
//! - Failures raised by the read/write protocols, by the injected storage
//!   contracts, and by host fold callbacks need to converge into one stable
//!   shape so logging, retry scheduling, and tests can all reason about a
//!   single `CoreError` type instead of three ad-hoc ones.
//!
//! # Layout (How)
//! - [`CoreError`] is the innermost, always-present layer: a stable code, a
//!   message, an optional boxed cause, and a structured [`ErrorCategory`].
//! - [`DomainError`] adds the responsible subsystem ([`DomainErrorKind`]).
//!   Most call sites only ever need `CoreError`; the outer layer exists for
//!   callers that must distinguish "the adaptor decided this" from "the
//!   injected store misbehaved".
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use crate::retry::RetryAdvice;

/// Stable, machine-readable error codes. One per failure kind named in §4.1's
/// failure taxonomy, plus the version-conflict signal from §4.3.
pub mod codes {
    pub const SNAPSHOT_READ_FAILED: &str = "logview.read_from_snapshot_storage_failed";
    pub const LOG_READ_FAILED: &str = "logview.read_from_log_storage_failed";
    pub const LOG_APPEND_FAILED: &str = "logview.update_log_storage_failed";
    pub const SNAPSHOT_WRITE_FAILED: &str = "logview.update_snapshot_storage_failed";
    pub const USER_CALLBACK_FAILED: &str = "logview.caught_user_code_exception";
    pub const VERSION_CONFLICT: &str = "logview.log_append_version_conflict";
}

/// `CoreError` carries a stable code, a human message, an optional cause, and
/// a structured [`ErrorCategory`] that drives retry/backoff decisions.
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<ErrorCause>,
    category: Option<ErrorCategory>,
}

impl CoreError {
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
            category: None,
        }
    }

    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn set_cause(&mut self, cause: impl StdError + Send + Sync + 'static) {
        self.cause = Some(Box::new(cause));
    }

    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Returns the structured category, defaulting to `NonRetryable` when
    /// none was set explicitly. Unlike the lineage's `CoreError::category`,
    /// there is no cross-cutting default-lookup matrix here: every call site
    /// in this crate sets a category explicitly at construction time.
    pub fn category(&self) -> ErrorCategory {
        self.category
            .clone()
            .unwrap_or(ErrorCategory::NonRetryable)
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|boxed| boxed as &(dyn StdError + 'static))
    }
}

/// Drives whether and how a caller should retry. Mirrors the lineage's
/// `ErrorCategory` but trimmed to the categories this crate actually emits.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Storage call failed in a way that may succeed if retried after backoff.
    Retryable(RetryAdvice),
    /// Not retryable on its own; the caller must change something first.
    NonRetryable,
    /// Operation was cancelled by the caller (not a storage failure).
    Cancelled,
}

pub type ErrorCause = Box<dyn StdError + Send + Sync + 'static>;

pub type Result<T, E = CoreError> = std::result::Result<T, E>;

/// Convenience constructors for the four storage-failure kinds plus the
/// user-callback kind named in §4.1's failure taxonomy.
impl CoreError {
    pub fn read_from_snapshot_storage_failed(
        cause: impl StdError + Send + Sync + 'static,
        advice: RetryAdvice,
    ) -> Self {
        Self::new(codes::SNAPSHOT_READ_FAILED, "reading snapshot record failed")
            .with_cause(cause)
            .with_category(ErrorCategory::Retryable(advice))
    }

    pub fn read_from_log_storage_failed(
        cause: impl StdError + Send + Sync + 'static,
        advice: RetryAdvice,
    ) -> Self {
        Self::new(codes::LOG_READ_FAILED, "reading log head/segment failed")
            .with_cause(cause)
            .with_category(ErrorCategory::Retryable(advice))
    }

    pub fn update_log_storage_failed(
        cause: impl StdError + Send + Sync + 'static,
        advice: RetryAdvice,
    ) -> Self {
        Self::new(codes::LOG_APPEND_FAILED, "conditional append failed")
            .with_cause(cause)
            .with_category(ErrorCategory::Retryable(advice))
    }

    pub fn update_snapshot_storage_failed(
        cause: impl StdError + Send + Sync + 'static,
        advice: RetryAdvice,
    ) -> Self {
        Self::new(codes::SNAPSHOT_WRITE_FAILED, "writing snapshot record failed")
            .with_cause(cause)
            .with_category(ErrorCategory::Retryable(advice))
    }

    /// Terminal form of a version conflict, for a caller that has given up
    /// retrying a write rather than requeue it (§9 open question, resolved in
    /// DESIGN.md). The everyday signal is
    /// [`crate::consistency::log_store::AppendOutcome::VersionConflict`],
    /// which is a definitive non-effect, not an error; this constructor exists
    /// for hosts that want to surface the exhaustion as a `CoreError` instead
    /// of silently leaving the batch queued.
    pub fn log_append_version_conflict() -> Self {
        Self::new(
            codes::VERSION_CONFLICT,
            "expected version did not match log head",
        )
        .with_category(ErrorCategory::NonRetryable)
    }

    pub fn caught_user_code_exception(cause: impl StdError + Send + Sync + 'static) -> Self {
        Self::new(
            codes::USER_CALLBACK_FAILED,
            "host fold callback panicked/errored",
        )
        .with_cause(cause)
        .with_category(ErrorCategory::NonRetryable)
    }
}

/// Subsystem responsible for a [`DomainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DomainErrorKind {
    LogStore,
    SnapshotStore,
    Adaptor,
}

/// Adds subsystem attribution on top of [`CoreError`]; callers that only care
/// about the stable code/category can stay on `CoreError`.
#[derive(Debug)]
pub struct DomainError {
    kind: DomainErrorKind,
    core: CoreError,
}

impl DomainError {
    pub fn new(kind: DomainErrorKind, core: CoreError) -> Self {
        Self { kind, core }
    }

    pub fn kind(&self) -> DomainErrorKind {
        self.kind
    }

    pub fn core(&self) -> &CoreError {
        &self.core
    }

    pub fn into_core(self) -> CoreError {
        self.core
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.core)
    }
}

impl StdError for DomainError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.core as &dyn StdError)
    }
}

const _: fn() = || {
    fn assert_error_traits<T: StdError + Send + Sync + 'static>() {}
    assert_error_traits::<CoreError>();
    assert_error_traits::<DomainError>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn category_defaults_to_non_retryable() {
        let err = CoreError::new("test.code", "boom");
        assert_eq!(err.category(), ErrorCategory::NonRetryable);
    }

    #[test]
    fn storage_failure_carries_retry_advice_and_cause() {
        let advice = RetryAdvice::after(Duration::from_millis(50));
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = CoreError::read_from_log_storage_failed(io, advice.clone());

        assert_eq!(err.code(), codes::LOG_READ_FAILED);
        assert_eq!(err.category(), ErrorCategory::Retryable(advice));
        assert!(err.cause().is_some());
    }

    #[test]
    fn domain_error_displays_subsystem_and_preserves_source() {
        let core = CoreError::caught_user_code_exception(std::io::Error::other("fold blew up"));
        let domain = DomainError::new(DomainErrorKind::Adaptor, core);
        let rendered = format!("{domain}");
        assert!(rendered.contains("Adaptor"));
        assert!(StdError::source(&domain).is_some());
    }
}
