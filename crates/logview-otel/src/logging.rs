//! Concrete [`Logger`] implementation backed by `tracing`.
//!
//! `logview-core` only depends on the `Logger` trait (§4.5.3); this is the
//! crate that wires a real event emitter behind it, the way the lineage
//! splits a portable contract from its telemetry-bound implementation.
use logview_core::observability::{LogField, LogRecord, LogSeverity, Logger};

/// Emits every [`LogRecord`] as a `tracing` event at the matching level,
/// with each [`LogField`] attached as a structured field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, record: LogRecord) {
        emit(&record);
    }
}

fn emit(record: &LogRecord) {
    let fields = format_fields(&record.fields);
    match record.severity {
        LogSeverity::Debug => tracing::debug!(fields = %fields, "{}", record.message),
        LogSeverity::Info => tracing::info!(fields = %fields, "{}", record.message),
        LogSeverity::Warn => tracing::warn!(fields = %fields, "{}", record.message),
        LogSeverity::Error => tracing::error!(fields = %fields, "{}", record.message),
    }
}

fn format_fields(fields: &[LogField]) -> String {
    fields
        .iter()
        .map(|field| format!("{}={}", field.key, field.value))
        .collect::<Vec<_>>()
        .join(" ")
}
