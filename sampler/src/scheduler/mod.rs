pub mod aligned;
pub mod boundary;

pub use aligned::{AlignedScheduler, TickOutcome, TickWork};
pub use boundary::{ScheduleState, next_boundary};
