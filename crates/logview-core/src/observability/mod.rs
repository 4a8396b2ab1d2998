//! Structured logging contract.
//!
//! # Design background (Why)
//! - §4.5.3's ambient logging requirement is satisfied by a trait, not a
//!   direct dependency on `tracing` macros, so the adaptor stays agnostic
//!   of whatever telemetry backend the host wires in. `logview-otel`
//!   supplies the concrete `tracing`-backed implementation.
//!
//! # Contract (What)
//! - [`Logger::log`] takes an owned [`LogRecord`]; implementations decide
//!   how (or whether) to render it.
mod resource;

pub use resource::{OwnedResourceAttrs, ResourceAttr, ResourceAttrSet};

use std::borrow::Cow;
use std::sync::Arc;

/// Severity of a [`LogRecord`], ordered from least to most urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Debug,
    Info,
    Warn,
    Error,
}

/// A single structured log field.
#[derive(Clone, Debug)]
pub struct LogField {
    pub key: &'static str,
    pub value: Cow<'static, str>,
}

impl LogField {
    pub fn new(key: &'static str, value: impl Into<Cow<'static, str>>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// A structured log event: severity, free-text message, and a small set of
/// machine-readable fields (grain identity, error code, retry wait, ...).
#[derive(Clone, Debug)]
pub struct LogRecord {
    pub severity: LogSeverity,
    pub message: Cow<'static, str>,
    pub fields: Vec<LogField>,
}

impl LogRecord {
    pub fn new(severity: LogSeverity, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            severity,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, key: &'static str, value: impl Into<Cow<'static, str>>) -> Self {
        self.fields.push(LogField::new(key, value));
        self
    }
}

/// Minimal structured-logging capability injected into the adaptor.
///
/// Implementations must be cheap to call on the hot read/write path; a
/// `tracing`-backed implementation (as `logview-otel` provides) or a no-op
/// are both valid.
pub trait Logger: Send + Sync + 'static {
    fn log(&self, record: LogRecord);
}

/// Discards every record. Used by tests and by hosts that have not wired up
/// telemetry yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _record: LogRecord) {}
}

/// Returns a shared handle to a [`NoopLogger`], convenient for constructing
/// adaptors in tests that don't care about log output.
pub fn noop_logger() -> Arc<dyn Logger> {
    Arc::new(NoopLogger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_logger_accepts_any_record_without_panicking() {
        let logger = noop_logger();
        logger.log(LogRecord::new(LogSeverity::Warn, "test").with_field("grain", "g1"));
    }
}
