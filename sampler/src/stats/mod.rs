pub mod reducer;
pub mod types;

pub use reducer::{median, percent_diff, round2};
pub use types::{DiffMetrics, SideMetrics, SideStats};
