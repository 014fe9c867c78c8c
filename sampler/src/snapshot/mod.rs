pub mod builder;
pub mod types;

pub use builder::SnapshotBuilder;
pub use types::Snapshot;
