pub mod cli;
pub mod config;
pub mod db;
pub mod market;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod shutdown;
pub mod sink;
pub mod snapshot;
pub mod stats;

pub mod error;
pub mod time;
