//! CSV loading for the snapshot and time-series tables.
//!
//! Both readers tolerate extra columns and report shape problems as
//! [`DataError`] instead of aborting.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::cache::TableCache;
use super::DataError;
use crate::config::DataConfig;
use crate::models::{Condition, DailySnapshotRow, TimeSeriesRow, TimeSeriesSet, TimeSeriesTable};

const SNAPSHOT_COUNTRY: &[&str] = &["Country_Region", "Country/Region"];
const SNAPSHOT_PROVINCE: &[&str] = &["Province_State", "Province/State"];

const SERIES_COUNTRY: &[&str] = &["Country/Region", "Country_Region"];
const SERIES_PROVINCE: &[&str] = &["Province/State", "Province_State"];
const SERIES_LAT: &[&str] = &["Lat"];
const SERIES_LONG: &[&str] = &["Long", "Long_"];

/// Header formats seen in time-series exports. Two-digit years first so
/// `1/22/20` is not read as the year 20.
const DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

/// Normalizes a country name into the grouping and filter key.
pub fn normalize_country(name: &str) -> String {
    name.trim().to_string()
}

/// Parses a time-series column header as a date.
pub fn parse_date_header(header: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(header.trim(), fmt).ok())
}

/// Load the daily snapshot report.
pub fn load_snapshot(path: &Path) -> Result<Vec<DailySnapshotRow>, DataError> {
    let mut reader = open_csv(path)?;
    let headers = read_headers(&mut reader, path)?;

    let country_idx = require_column(&headers, SNAPSHOT_COUNTRY, path)?;
    let province_idx = find_column(&headers, SNAPSHOT_PROVINCE);
    let confirmed_idx = require_column(&headers, &["Confirmed"], path)?;
    let deaths_idx = require_column(&headers, &["Deaths"], path)?;
    let recovered_idx = require_column(&headers, &["Recovered"], path)?;

    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record_line(&record);

        let country = normalize_country(record.get(country_idx).unwrap_or(""));
        if country.is_empty() {
            debug!("{}:{}: skipping row without a country", path.display(), line);
            continue;
        }

        let count = |idx: usize, column: &str| parse_count(record.get(idx), path, line, column);

        rows.push(DailySnapshotRow {
            country,
            province: province_idx.and_then(|idx| non_empty(record.get(idx))),
            confirmed: count(confirmed_idx, "Confirmed")?,
            deaths: count(deaths_idx, "Deaths")?,
            recovered: count(recovered_idx, "Recovered")?,
        });
    }

    info!("Loaded {} snapshot rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Load one condition's time-series table.
pub fn load_time_series(path: &Path, condition: Condition) -> Result<TimeSeriesTable, DataError> {
    let mut reader = open_csv(path)?;
    let headers = read_headers(&mut reader, path)?;

    let country_idx = require_column(&headers, SERIES_COUNTRY, path)?;
    let province_idx = find_column(&headers, SERIES_PROVINCE);
    let lat_idx = find_column(&headers, SERIES_LAT);
    let long_idx = find_column(&headers, SERIES_LONG);
    let identifying = [Some(country_idx), province_idx, lat_idx, long_idx];

    let mut date_columns: Vec<(usize, NaiveDate)> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if identifying.contains(&Some(idx)) {
            continue;
        }
        match parse_date_header(header) {
            Some(date) if date_columns.iter().any(|(_, seen)| *seen == date) => {
                return Err(DataError::DuplicateDate {
                    path: path.to_path_buf(),
                    column: header.to_string(),
                    date,
                });
            }
            Some(date) => date_columns.push((idx, date)),
            None => warn!(
                "{}: ignoring non-date column '{}'",
                path.display(),
                header
            ),
        }
    }

    if date_columns.is_empty() {
        return Err(DataError::NoDateColumns {
            path: path.to_path_buf(),
        });
    }

    let dates = date_columns.iter().map(|(_, date)| *date).collect();
    let mut table = TimeSeriesTable::new(condition, dates);

    for result in reader.records() {
        let record = result.map_err(|source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record_line(&record);

        let country = normalize_country(record.get(country_idx).unwrap_or(""));
        if country.is_empty() {
            debug!("{}:{}: skipping row without a country", path.display(), line);
            continue;
        }

        let mut values = Vec::with_capacity(date_columns.len());
        for (idx, _) in &date_columns {
            values.push(parse_count(record.get(*idx), path, line, &headers[*idx])?);
        }

        table.rows.push(TimeSeriesRow {
            country,
            province: province_idx.and_then(|idx| non_empty(record.get(idx))),
            values,
        });
    }

    info!(
        "Loaded {} {} rows over {} dates from {}",
        table.rows.len(),
        condition.as_str(),
        table.dates.len(),
        path.display()
    );
    Ok(table)
}

/// Loads tables from a data directory through a [`TableCache`].
pub struct DataLoader {
    data_dir: PathBuf,
    snapshot_file: String,
    cache: TableCache,
}

impl DataLoader {
    /// Create a loader over `data_dir` using the given cache.
    pub fn new(data_dir: PathBuf, snapshot_file: impl Into<String>, cache: TableCache) -> Self {
        Self {
            data_dir,
            snapshot_file: snapshot_file.into(),
            cache,
        }
    }

    /// Create a loader from the `[data]` config section.
    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(
            PathBuf::from(&config.dir),
            config.snapshot_file.clone(),
            TableCache::new(config.cache),
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    /// Path of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_file)
    }

    /// Path of one condition's time-series file.
    pub fn time_series_path(&self, condition: Condition) -> PathBuf {
        self.data_dir.join(condition.file_name())
    }

    /// Load (or reuse) the daily snapshot.
    pub fn snapshot(&mut self) -> Result<Arc<Vec<DailySnapshotRow>>, DataError> {
        let path = self.snapshot_path();
        self.cache.snapshot(&path, load_snapshot)
    }

    /// Load (or reuse) one condition's time-series table.
    pub fn time_series(&mut self, condition: Condition) -> Result<Arc<TimeSeriesTable>, DataError> {
        let path = self.time_series_path(condition);
        self.cache
            .time_series(&path, |p| load_time_series(p, condition))
    }

    /// Load all three time-series tables.
    ///
    /// Fails as a whole if any one table is unavailable or malformed, or if
    /// the date axes disagree.
    pub fn time_series_set(&mut self) -> Result<TimeSeriesSet, DataError> {
        let confirmed = self.time_series(Condition::Confirmed)?;
        let deaths = self.time_series(Condition::Deaths)?;
        let recovered = self.time_series(Condition::Recovered)?;

        for table in [&deaths, &recovered] {
            if table.dates != confirmed.dates {
                return Err(DataError::DateAxisMismatch {
                    condition: table.condition,
                });
            }
        }

        TimeSeriesSet::new(confirmed, deaths, recovered)
    }
}

fn open_csv(path: &Path) -> Result<csv::Reader<BufReader<File>>, DataError> {
    let file = File::open(path).map_err(|source| DataError::Unavailable {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file)))
}

fn read_headers(
    reader: &mut csv::Reader<BufReader<File>>,
    path: &Path,
) -> Result<StringRecord, DataError> {
    let headers = reader.headers().map_err(|source| DataError::Csv {
        path: path.to_path_buf(),
        source,
    })?;

    // Spreadsheet exports often start with a byte-order mark.
    Ok(headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}'))
        .collect())
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| names.contains(&h))
}

fn require_column(headers: &StringRecord, names: &[&str], path: &Path) -> Result<usize, DataError> {
    find_column(headers, names).ok_or_else(|| DataError::MissingColumn {
        path: path.to_path_buf(),
        column: names[0].to_string(),
    })
}

fn record_line(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(String::from)
}

/// Parse a cumulative count.
///
/// Empty cells count as zero and integral floats such as `12.0` are
/// accepted. A cell missing from a short row is malformed, as is any value
/// that does not fit in a `u64`.
fn parse_count(raw: Option<&str>, path: &Path, line: u64, column: &str) -> Result<u64, DataError> {
    let malformed = |value: &str| DataError::Malformed {
        path: path.to_path_buf(),
        line,
        column: column.to_string(),
        value: value.to_string(),
    };

    let Some(raw) = raw else {
        return Err(malformed("<missing>"));
    };
    if raw.is_empty() {
        return Ok(0);
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(n);
    }

    // u64::MAX as f64 rounds up to 2^64, the first value that does not fit
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f < u64::MAX as f64 && f.fract() == 0.0 => {
            Ok(f as u64)
        }
        _ => Err(malformed(raw)),
    }
}
