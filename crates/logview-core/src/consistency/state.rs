//! Single-operation-in-flight state machine (§5, §9).
//!
//! The adaptor only ever has one logical operation running at a time: a read
//! (catching up to the log head) or a write (appending a batch). §9 calls
//! this out as a debug-only assertion rather than a hard runtime lock,
//! because the contract already promises the host won't call `ReadAsync`/
//! `WriteAsync` concurrently with itself.
use crate::contract::{ContractStateMachine, StateAdvance};

/// The three phases a [`super::adaptor::LogViewAdaptor`] cycles through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationPhase {
    Idle,
    Reading,
    Writing,
}

/// Signal driving [`OperationGuard`]; mirrors the public entry points a host
/// can call plus the completion event each one eventually reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationSignal {
    BeginRead,
    BeginWrite,
    Complete,
}

/// Tracks [`OperationPhase`] and panics (in debug builds only) on a signal
/// that would start a second operation while one is already in flight.
///
/// Release builds don't pay for the check: by the time this ships, the
/// invariant is a contract violation by the host, not a recoverable runtime
/// condition.
#[derive(Clone, Copy, Debug, Default)]
pub struct OperationGuard {
    phase: OperationPhase,
}

impl Default for OperationPhase {
    fn default() -> Self {
        OperationPhase::Idle
    }
}

impl OperationGuard {
    pub fn new() -> Self {
        Self {
            phase: OperationPhase::Idle,
        }
    }

    pub fn phase(&self) -> OperationPhase {
        self.phase
    }
}

impl ContractStateMachine for OperationGuard {
    type State = OperationPhase;
    type Signal = OperationSignal;

    fn state(&self) -> Self::State {
        self.phase
    }

    fn on_signal(&mut self, signal: &Self::Signal) -> StateAdvance<Self::State> {
        let from = self.phase;
        let to = match (from, signal) {
            (OperationPhase::Idle, OperationSignal::BeginRead) => OperationPhase::Reading,
            (OperationPhase::Idle, OperationSignal::BeginWrite) => OperationPhase::Writing,
            (OperationPhase::Reading | OperationPhase::Writing, OperationSignal::Complete) => {
                OperationPhase::Idle
            }
            _ => {
                debug_assert!(
                    false,
                    "operation already in flight: {from:?} cannot accept {signal:?}"
                );
                from
            }
        };

        if to == from {
            StateAdvance::Noop { state: from }
        } else {
            self.phase = to;
            StateAdvance::Transition { from, to }
        }
    }
}
