//! Deterministic sample dataset.
//!
//! Used only when the operator opts into the `sample` fallback policy. The
//! regions are fictional so the output can never be mistaken for real
//! figures.

use chrono::{Duration, NaiveDate};
use std::sync::Arc;

use crate::data::DataError;
use crate::models::{Condition, DailySnapshotRow, TimeSeriesSet, TimeSeriesTable};

/// Label attached to reports built from this dataset.
pub const SAMPLE_LABEL: &str = "SAMPLE DATA (synthetic, not real case counts)";

struct SampleRegion {
    country: &'static str,
    province: Option<&'static str>,
    /// Confirmed cases on the last day.
    peak: u64,
    /// Deaths per thousand confirmed.
    deaths_per_mille: u64,
    /// Recovered per thousand confirmed.
    recovered_per_mille: u64,
}

const REGIONS: &[SampleRegion] = &[
    SampleRegion { country: "Northland", province: Some("Upper Reach"), peak: 48_000, deaths_per_mille: 31, recovered_per_mille: 610 },
    SampleRegion { country: "Northland", province: Some("Lower Reach"), peak: 22_500, deaths_per_mille: 28, recovered_per_mille: 640 },
    SampleRegion { country: "Southmark", province: None, peak: 61_200, deaths_per_mille: 44, recovered_per_mille: 520 },
    SampleRegion { country: "Eastvale", province: None, peak: 15_800, deaths_per_mille: 12, recovered_per_mille: 830 },
    SampleRegion { country: "Westreach", province: None, peak: 9_400, deaths_per_mille: 67, recovered_per_mille: 410 },
    SampleRegion { country: "Isla Muestra", province: None, peak: 1_250, deaths_per_mille: 8, recovered_per_mille: 900 },
    SampleRegion { country: "Quietshire", province: None, peak: 0, deaths_per_mille: 0, recovered_per_mille: 0 },
];

/// First date of the sample time series.
pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 22).unwrap_or(NaiveDate::MIN)
}

/// Cumulative counts of one region on day `day` of `days`.
///
/// Confirmed grows quadratically up to `peak`; deaths and recoveries
/// follow as fixed shares of confirmed. All three are non-decreasing.
fn counts_on(region: &SampleRegion, day: u64, days: u64) -> (u64, u64, u64) {
    let span = days.max(1);
    let confirmed = region.peak * day * day / (span * span);
    let deaths = confirmed * region.deaths_per_mille / 1000;
    let recovered = confirmed * region.recovered_per_mille / 1000;
    (confirmed, deaths, recovered)
}

/// Snapshot matching the last day of [`time_series_set`] with the same `days`.
pub fn snapshot(days: usize) -> Vec<DailySnapshotRow> {
    let days = days.max(1) as u64;
    REGIONS
        .iter()
        .map(|region| {
            let (confirmed, deaths, recovered) = counts_on(region, days, days);
            DailySnapshotRow {
                country: region.country.to_string(),
                province: region.province.map(String::from),
                confirmed,
                deaths,
                recovered,
            }
        })
        .collect()
}

/// Three aligned time-series tables covering `days` dates.
pub fn time_series_set(days: usize) -> Result<TimeSeriesSet, DataError> {
    let days = days.max(1);
    let dates: Vec<NaiveDate> = (0..days)
        .map(|offset| start_date() + Duration::days(offset as i64))
        .collect();

    let mut tables = Condition::ALL.map(|c| TimeSeriesTable::new(c, dates.clone()));

    for region in REGIONS {
        let series: Vec<(u64, u64, u64)> = (1..=days as u64)
            .map(|day| counts_on(region, day, days as u64))
            .collect();

        for table in tables.iter_mut() {
            let values = series
                .iter()
                .map(|(confirmed, deaths, recovered)| match table.condition {
                    Condition::Confirmed => *confirmed,
                    Condition::Deaths => *deaths,
                    Condition::Recovered => *recovered,
                })
                .collect();
            table.push_row(region.country, values);
            if let Some(row) = table.rows.last_mut() {
                row.province = region.province.map(String::from);
            }
        }
    }

    let [confirmed, deaths, recovered] = tables.map(Arc::new);
    TimeSeriesSet::new(confirmed, deaths, recovered)
}
