#![deny(unsafe_code)]
#![doc = "logview-core: log-backed view-consistency provider for actor-style grains."]
#![doc = ""]
#![doc = "Reconciles an in-memory view against an append-only log store and a"]
#![doc = "periodic snapshot store under optimistic concurrency, tolerating"]
#![doc = "ambiguous storage failures without losing or duplicating writes."]

pub use async_trait::async_trait;

pub mod consistency;
pub mod contract;
pub mod error;
pub mod ids;
pub mod observability;
pub mod prelude;
pub mod retry;
pub mod time;

pub use consistency::{
    AppendOutcome, HostFold, HostFoldError, LogStore, LogViewAdaptor, LogViewConfig,
    NotificationQueue, RedactedString, SerializerKind, SnapshotHolder, SnapshotPolicy,
    SnapshotRecord, SnapshotStore, UpdateNotification,
};
pub use error::{CoreError, DomainError, DomainErrorKind, ErrorCategory};
pub use ids::{ClusterId, GrainId, GrainKey, GrainType};
pub use observability::{LogField, LogRecord, LogSeverity, Logger};
pub use retry::{RetryAdvice, RetryRhythm};
pub use time::{Clock, SystemClock};
