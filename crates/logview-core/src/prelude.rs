//! One-stop import for the types most call sites need.
//!
//! `use logview_core::prelude::*;` pulls in the adaptor, its external
//! contracts, and the error/observability types that show up in almost
//! every signature built against this crate.
pub use crate::consistency::{
    AppendOutcome, HostFold, LogStore, LogViewAdaptor, LogViewConfig, SnapshotPolicy,
    SnapshotStore, UpdateNotification,
};
pub use crate::contract::Cancellation;
pub use crate::error::{CoreError, DomainError, ErrorCategory, Result};
pub use crate::ids::{ClusterId, GrainId, GrainKey, GrainType};
pub use crate::observability::{LogRecord, LogSeverity, Logger};
pub use crate::retry::RetryAdvice;
pub use crate::time::Clock;
