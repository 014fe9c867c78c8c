//! Destinations for finished snapshots.
//!
//! Every sink reports failure through `SinkError`; none of them panics or
//! retries. The scheduler logs a failed `accept` as "not persisted" and moves
//! on to the next boundary.

pub mod console;
pub mod fanout;
pub mod jsonl;
pub mod memory;
pub mod store;

use async_trait::async_trait;
use thiserror::Error;

use crate::snapshot::Snapshot;

pub use console::ConsoleSink;
pub use fanout::FanoutSink;
pub use jsonl::JsonlSink;
pub use memory::MemorySink;
pub use store::SqlxSnapshotStore;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("{failed} of {total} sinks failed")]
    Partial { failed: usize, total: usize },
}

#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Takes ownership of the snapshot. `Ok` means the destination has it.
    async fn accept(&self, snapshot: Snapshot) -> Result<(), SinkError>;
}
