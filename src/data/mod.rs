//! Source table loading.
//!
//! Parses the snapshot and time-series CSV files, caches parsed tables per
//! source file, and provides the synthetic sample dataset.

pub mod cache;
pub mod error;
pub mod loader;
pub mod sample;

pub use cache::{CachePolicy, TableCache};
pub use error::DataError;
pub use loader::{load_snapshot, load_time_series, normalize_country, DataLoader};
