//! Dataset loading with the missing-data policy, and report assembly.
//!
//! This is the consumer side of the aggregator: it decides what happens
//! when files are missing or a country has no series, then shapes every
//! section of the report.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::aggregator::{
    build_time_series, correlation_matrix, filter_countries, sort_countries, summarize_countries,
    summarize_global, top_countries,
};
use crate::config::{Config, FallbackPolicy};
use crate::data::{sample, DataError, DataLoader};
use crate::models::{
    CorrelationMatrix, DailySnapshotRow, DataSource, Report, ReportMetadata, SeriesSection,
    SortKey, TimeSeriesSet,
};

/// Everything a report is built from.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub snapshot: Arc<Vec<DailySnapshotRow>>,
    pub series: TimeSeriesSet,
    pub source: DataSource,
}

impl Dataset {
    /// The synthetic sample dataset, labeled with why it was used.
    pub fn sample(days: usize, reason: impl Into<String>) -> Result<Self, DataError> {
        Ok(Self {
            snapshot: Arc::new(sample::snapshot(days)),
            series: sample::time_series_set(days)?,
            source: DataSource::Sample {
                reason: reason.into(),
            },
        })
    }
}

/// Load the snapshot and all three time-series tables.
///
/// Under [`FallbackPolicy::Sample`] any load failure is replaced by the
/// whole sample dataset; real and synthetic tables are never mixed.
pub fn load_dataset(
    loader: &mut DataLoader,
    fallback: FallbackPolicy,
    sample_days: usize,
) -> Result<Dataset, DataError> {
    let loaded = loader
        .snapshot()
        .and_then(|snapshot| Ok((snapshot, loader.time_series_set()?)));

    match loaded {
        Ok((snapshot, series)) => {
            debug!(
                "Cache: {} hits, {} misses",
                loader.cache().hits(),
                loader.cache().misses()
            );
            Ok(Dataset {
                snapshot,
                series,
                source: DataSource::Files {
                    dir: loader.data_dir().display().to_string(),
                },
            })
        }
        Err(e) => match fallback {
            FallbackPolicy::Error => Err(e),
            FallbackPolicy::Sample => {
                warn!("{}; substituting sample data", e);
                Dataset::sample(sample_days, e.to_string())
            }
        },
    }
}

/// Options that shape the report sections.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub country: Option<String>,
    pub search: Option<String>,
    pub sort_by: SortKey,
    pub top: usize,
    pub days: usize,
    pub fallback_to_global: bool,
    pub include_correlation: bool,
}

impl ReportOptions {
    /// Build options from the merged config and the per-run arguments.
    pub fn from_config(config: &Config, country: Option<String>, search: Option<String>) -> Self {
        Self {
            country,
            search,
            sort_by: config.report.sort_by,
            top: config.report.top,
            days: config.report.days,
            fallback_to_global: config.report.fallback_to_global,
            include_correlation: config.report.include_correlation,
        }
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::from_config(&Config::default(), None, None)
    }
}

/// Assemble the full report from a dataset.
pub fn build_report(dataset: &Dataset, options: &ReportOptions, duration_seconds: f64) -> Report {
    let mut warnings = Vec::new();
    if let DataSource::Sample { ref reason } = dataset.source {
        warnings.push(format!("{} (input unavailable: {})", sample::SAMPLE_LABEL, reason));
    }

    let totals = summarize_global(&dataset.snapshot);
    let all_countries = summarize_countries(&dataset.snapshot);

    let correlation = if options.include_correlation {
        correlation_matrix(&all_countries)
    } else {
        CorrelationMatrix {
            labels: Vec::new(),
            cells: Vec::new(),
        }
    };

    let mut countries = match options.search {
        Some(ref query) => filter_countries(&all_countries, query),
        None => all_countries.clone(),
    };
    if countries.is_empty() && !all_countries.is_empty() {
        warnings.push("No countries match the search text".to_string());
    }
    sort_countries(&mut countries, options.sort_by);
    let countries = top_countries(&countries, options.top);

    let mut series = select_series(&dataset.series, options, &mut warnings);
    let skip = series.points.len().saturating_sub(options.days);
    series.points.drain(..skip);

    info!(
        "Report: {} countries, {} series points ({})",
        countries.len(),
        series.points.len(),
        series.scope()
    );

    Report {
        metadata: ReportMetadata {
            generated_at: chrono::Utc::now(),
            data_source: dataset.source.clone(),
            countries_total: all_countries.len(),
            dates_total: dataset.series.dates().len(),
            duration_seconds,
        },
        totals,
        countries,
        series,
        correlation,
        warnings,
    }
}

/// Build the series for the requested country, falling back to the global
/// series when the country has no rows and the options allow it.
fn select_series(
    set: &TimeSeriesSet,
    options: &ReportOptions,
    warnings: &mut Vec<String>,
) -> SeriesSection {
    let Some(ref requested) = options.country else {
        return SeriesSection {
            country: None,
            requested_country: None,
            points: build_time_series(set, None),
        };
    };

    let points = build_time_series(set, Some(requested));
    if !points.is_empty() {
        return SeriesSection {
            country: Some(requested.trim().to_string()),
            requested_country: Some(requested.clone()),
            points,
        };
    }

    if options.fallback_to_global {
        warnings.push(format!(
            "No time-series rows for '{}'; showing the global series",
            requested
        ));
        SeriesSection {
            country: None,
            requested_country: Some(requested.clone()),
            points: build_time_series(set, None),
        }
    } else {
        warnings.push(format!("No time-series rows for '{}'", requested));
        SeriesSection {
            country: Some(requested.trim().to_string()),
            requested_country: Some(requested.clone()),
            points: Vec::new(),
        }
    }
}
