//! Configuration surface (§6, §4.5.4).
use std::fmt;
use std::sync::Arc;

use super::policy::{resolve_policy, SnapshotPolicy};

/// A string that must never be rendered in full by `Debug`/`Display` — used
/// for connection strings and credentials (§6).
#[derive(Clone)]
pub struct RedactedString(Arc<str>);

impl RedactedString {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RedactedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl fmt::Display for RedactedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Wire encoding selected for log entries and snapshots (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerializerKind {
    Json,
    Binary,
}

/// Gathers the options enumerated in §6 into one configuration object handed
/// to the adaptor constructor.
pub struct LogViewConfig<V>
where
    V: Send + Sync + 'static,
{
    /// Stage in the grain activation lifecycle at which the adaptor performs
    /// its initial catch-up read (§6).
    pub init_stage: u32,
    pub serializer: SerializerKind,
    pub client_settings: RedactedString,
    pub credentials: Option<RedactedString>,
    policy: Arc<dyn SnapshotPolicy<V>>,
}

impl<V> LogViewConfig<V>
where
    V: Send + Sync + 'static,
{
    pub fn new(
        init_stage: u32,
        serializer: SerializerKind,
        client_settings: RedactedString,
        credentials: Option<RedactedString>,
        explicit_policy: Option<Arc<dyn SnapshotPolicy<V>>>,
        every: Option<u64>,
    ) -> Self {
        Self {
            init_stage,
            serializer,
            client_settings,
            credentials,
            policy: resolve_policy(explicit_policy, every),
        }
    }

    pub fn policy(&self) -> Arc<dyn SnapshotPolicy<V>> {
        Arc::clone(&self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_string_never_leaks_value_in_debug_output() {
        let secret = RedactedString::new("super-secret-connection-string");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("super-secret"));
        assert_eq!(secret.expose(), "super-secret-connection-string");
    }

    #[test]
    fn config_resolves_policy_via_every_when_no_explicit_policy_given() {
        let config: LogViewConfig<i32> = LogViewConfig::new(
            0,
            SerializerKind::Json,
            RedactedString::new("endpoint=test"),
            None,
            None,
            Some(5),
        );
        assert!(config.policy().should_take_snapshot(&0, 1, 5));
        assert!(!config.policy().should_take_snapshot(&0, 1, 4));
    }
}
