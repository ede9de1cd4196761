//! Analysis modules.
//!
//! The aggregator holds the pure group-by/merge operations; the dashboard
//! module applies the missing-data policies and assembles reports.

pub mod aggregator;
pub mod dashboard;

pub use aggregator::*;
pub use dashboard::{build_report, load_dataset, Dataset, ReportOptions};
