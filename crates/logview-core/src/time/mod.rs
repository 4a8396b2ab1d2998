//! Injectable time source.
mod clock;

pub use clock::{Clock, MockClock, Sleep, SystemClock};
