mod init;
mod span;
mod trace_id;

pub use init::init_tracing;
pub use span::{side_span, tick_span, warn_if_slow};
pub use trace_id::TraceId;
