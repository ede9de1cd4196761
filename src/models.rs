//! Data models for the dashboard.
//!
//! This module contains the source tables loaded from disk, the derived
//! tables produced by the aggregator, and the report handed to the
//! renderers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::data::DataError;

/// One of the three tracked case categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Confirmed,
    Deaths,
    Recovered,
}

impl Condition {
    /// All conditions, in merge order.
    pub const ALL: [Condition; 3] = [Condition::Confirmed, Condition::Deaths, Condition::Recovered];

    /// Canonical lowercase name, used as the series column name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Confirmed => "confirmed",
            Condition::Deaths => "deaths",
            Condition::Recovered => "recovered",
        }
    }

    /// File name of the time-series table for this condition.
    pub fn file_name(&self) -> String {
        format!("time_{}.csv", self.as_str())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Confirmed => write!(f, "Confirmed"),
            Condition::Deaths => write!(f, "Deaths"),
            Condition::Recovered => write!(f, "Recovered"),
        }
    }
}

/// A row of the daily snapshot report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySnapshotRow {
    /// Normalized country name.
    pub country: String,
    /// Sub-region, when the country reports per province/state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub confirmed: u64,
    pub deaths: u64,
    pub recovered: u64,
}

impl DailySnapshotRow {
    /// Creates a country-level row with no sub-region.
    pub fn new(country: impl Into<String>, confirmed: u64, deaths: u64, recovered: u64) -> Self {
        Self {
            country: country.into(),
            province: None,
            confirmed,
            deaths,
            recovered,
        }
    }
}

/// A region row of a time-series table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    /// Normalized country name.
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    /// Cumulative counts, aligned with the owning table's date axis.
    pub values: Vec<u64>,
}

/// Cumulative counts of one condition, one column per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesTable {
    pub condition: Condition,
    /// Date axis in header order.
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<TimeSeriesRow>,
}

impl TimeSeriesTable {
    /// Creates an empty table over the given date axis.
    pub fn new(condition: Condition, dates: Vec<NaiveDate>) -> Self {
        Self {
            condition,
            dates,
            rows: Vec::new(),
        }
    }

    /// Appends a country-level row. Values must match the date axis length.
    pub fn push_row(&mut self, country: impl Into<String>, values: Vec<u64>) {
        debug_assert_eq!(values.len(), self.dates.len());
        self.rows.push(TimeSeriesRow {
            country: country.into(),
            province: None,
            values,
        });
    }
}

/// The confirmed, deaths and recovered tables of one dataset.
///
/// A set can only be built with all three conditions present, so a series
/// is never merged from two real tables and a missing one.
#[derive(Debug, Clone)]
pub struct TimeSeriesSet {
    confirmed: Arc<TimeSeriesTable>,
    deaths: Arc<TimeSeriesTable>,
    recovered: Arc<TimeSeriesTable>,
}

impl TimeSeriesSet {
    /// Bundles three tables, checking each sits in its own slot.
    pub fn new(
        confirmed: Arc<TimeSeriesTable>,
        deaths: Arc<TimeSeriesTable>,
        recovered: Arc<TimeSeriesTable>,
    ) -> Result<Self, DataError> {
        for (expected, table) in Condition::ALL.iter().zip([&confirmed, &deaths, &recovered]) {
            if table.condition != *expected {
                return Err(DataError::ConditionMismatch {
                    expected: *expected,
                    found: table.condition,
                });
            }
        }

        Ok(Self {
            confirmed,
            deaths,
            recovered,
        })
    }

    /// Returns the table for one condition.
    pub fn table(&self, condition: Condition) -> &TimeSeriesTable {
        match condition {
            Condition::Confirmed => &self.confirmed,
            Condition::Deaths => &self.deaths,
            Condition::Recovered => &self.recovered,
        }
    }

    /// Date axis of the confirmed table.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.confirmed.dates
    }
}

/// Global totals across every snapshot row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalTotals {
    pub confirmed: u64,
    pub deaths: u64,
    pub recovered: u64,
}

impl GlobalTotals {
    /// Returns the total for one condition.
    pub fn get(&self, condition: Condition) -> u64 {
        match condition {
            Condition::Confirmed => self.confirmed,
            Condition::Deaths => self.deaths,
            Condition::Recovered => self.recovered,
        }
    }

    /// Totals as `(condition, count)` rows, the shape a bar chart wants.
    pub fn as_rows(&self) -> Vec<(Condition, u64)> {
        Condition::ALL.iter().map(|c| (*c, self.get(*c))).collect()
    }
}

/// Per-country totals with derived rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySummary {
    pub country: String,
    pub confirmed: u64,
    pub deaths: u64,
    pub recovered: u64,
    /// `deaths / confirmed * 100`; `None` when nothing is confirmed.
    pub death_rate: Option<f64>,
    /// `recovered / confirmed * 100`; `None` when nothing is confirmed.
    pub recovery_rate: Option<f64>,
    /// `confirmed - deaths - recovered`. Can go negative on inconsistent reports.
    pub active_cases: i64,
    /// Composite score in `[0, 100]`; `None` when nothing is confirmed.
    pub severity_index: Option<f64>,
}

/// One date of a merged daily series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySeriesPoint {
    pub date: NaiveDate,
    pub confirmed: u64,
    pub deaths: u64,
    pub recovered: u64,
}

/// Pearson correlation between per-country metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// Row-major cells; `None` where a metric has no variance.
    pub cells: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Returns the cell for a pair of labels.
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == row)?;
        let j = self.labels.iter().position(|l| l == col)?;
        self.cells[i][j]
    }
}

/// Column used to order the country table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Confirmed,
    Deaths,
    Recovered,
    DeathRate,
    Active,
    Severity,
    Name,
}

/// Where the report's data came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataSource {
    /// Real files from a data directory.
    Files { dir: String },
    /// Synthetic sample data substituted for unavailable files.
    Sample { reason: String },
}

impl DataSource {
    pub fn is_sample(&self) -> bool {
        matches!(self, DataSource::Sample { .. })
    }
}

/// The daily series section of a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSection {
    /// Country the series covers; `None` for the global series.
    pub country: Option<String>,
    /// Country the caller asked for, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_country: Option<String>,
    pub points: Vec<DailySeriesPoint>,
}

impl SeriesSection {
    /// Human-readable scope of the series.
    pub fn scope(&self) -> &str {
        self.country.as_deref().unwrap_or("Global")
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub data_source: DataSource,
    /// Number of countries in the snapshot.
    pub countries_total: usize,
    /// Number of dates on the time-series axis.
    pub dates_total: usize,
    pub duration_seconds: f64,
}

/// The complete dashboard report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub totals: GlobalTotals,
    /// Country table after search, sort and truncation.
    pub countries: Vec<CountrySummary>,
    pub series: SeriesSection,
    pub correlation: CorrelationMatrix,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(condition: Condition) -> Arc<TimeSeriesTable> {
        Arc::new(TimeSeriesTable::new(condition, Vec::new()))
    }

    #[test]
    fn test_condition_names() {
        assert_eq!(Condition::Deaths.as_str(), "deaths");
        assert_eq!(Condition::Recovered.file_name(), "time_recovered.csv");
        assert_eq!(Condition::Confirmed.to_string(), "Confirmed");
    }

    #[test]
    fn test_totals_as_rows() {
        let totals = GlobalTotals {
            confirmed: 10,
            deaths: 2,
            recovered: 5,
        };
        assert_eq!(
            totals.as_rows(),
            vec![
                (Condition::Confirmed, 10),
                (Condition::Deaths, 2),
                (Condition::Recovered, 5)
            ]
        );
    }

    #[test]
    fn test_series_set_rejects_swapped_tables() {
        let result = TimeSeriesSet::new(
            table(Condition::Confirmed),
            table(Condition::Recovered),
            table(Condition::Deaths),
        );
        assert!(matches!(
            result,
            Err(DataError::ConditionMismatch {
                expected: Condition::Deaths,
                found: Condition::Recovered
            })
        ));
    }

    #[test]
    fn test_data_source_serializes_with_kind() {
        let source = DataSource::Sample {
            reason: "missing".to_string(),
        };
        let json = serde_json::to_string(&source).unwrap();
        assert!(json.contains("\"kind\":\"sample\""));
        assert!(source.is_sample());
    }

    #[test]
    fn test_series_scope() {
        let section = SeriesSection {
            country: None,
            requested_country: Some("Atlantis".to_string()),
            points: Vec::new(),
        };
        assert_eq!(section.scope(), "Global");
    }
}
