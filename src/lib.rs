//! # Coronadash
//!
//! Aggregation core of a COVID-19 case dashboard. Loads a daily snapshot
//! and the confirmed/deaths/recovered time-series tables, and shapes them
//! into global totals, a per-country table with derived rates and a merged
//! daily series.
//!
//! ## Example
//!
//! ```no_run
//! use coronadash::analysis::{build_time_series, summarize_countries, summarize_global};
//! use coronadash::data::{DataLoader, TableCache};
//!
//! let mut loader = DataLoader::new("data".into(), "daily_report.csv", TableCache::default());
//! let snapshot = loader.snapshot()?;
//! let totals = summarize_global(&snapshot);
//! let countries = summarize_countries(&snapshot);
//! let series = build_time_series(&loader.time_series_set()?, Some("Italy"));
//! # Ok::<(), coronadash::data::DataError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod data;
pub mod models;
pub mod report;
