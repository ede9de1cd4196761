//! Case aggregation and derived statistics.
//!
//! This module turns the loaded source tables into the shapes the
//! dashboard renders: global totals, the per-country table and the merged
//! daily series.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::data::normalize_country;
use crate::models::{
    Condition, CorrelationMatrix, CountrySummary, DailySeriesPoint, DailySnapshotRow,
    GlobalTotals, SortKey, TimeSeriesSet, TimeSeriesTable,
};

/// Sum confirmed, deaths and recovered across every snapshot row.
///
/// All sums in this module saturate at `u64::MAX` instead of overflowing.
pub fn summarize_global(rows: &[DailySnapshotRow]) -> GlobalTotals {
    rows.iter().fold(GlobalTotals::default(), |mut totals, row| {
        totals.confirmed = totals.confirmed.saturating_add(row.confirmed);
        totals.deaths = totals.deaths.saturating_add(row.deaths);
        totals.recovered = totals.recovered.saturating_add(row.recovered);
        totals
    })
}

/// Group snapshot rows by country and derive rates.
///
/// Sub-region rows of the same country are summed. The result is sorted by
/// confirmed cases, highest first; ties keep the order in which countries
/// first appear in the snapshot.
pub fn summarize_countries(rows: &[DailySnapshotRow]) -> Vec<CountrySummary> {
    let mut order: Vec<(String, [u64; 3])> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let key = normalize_country(&row.country);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            order.push((key, [0; 3]));
            order.len() - 1
        });

        let counts = &mut order[slot].1;
        counts[0] = counts[0].saturating_add(row.confirmed);
        counts[1] = counts[1].saturating_add(row.deaths);
        counts[2] = counts[2].saturating_add(row.recovered);
    }

    let max_confirmed = order.iter().map(|(_, c)| c[0]).max().unwrap_or(0);

    let mut summaries: Vec<CountrySummary> = order
        .into_iter()
        .map(|(country, [confirmed, deaths, recovered])| {
            let death_rate = rate(deaths, confirmed);
            let active_cases = active_cases(confirmed, deaths, recovered);

            CountrySummary {
                country,
                confirmed,
                deaths,
                recovered,
                death_rate,
                recovery_rate: rate(recovered, confirmed),
                active_cases,
                severity_index: severity_index(death_rate, active_cases, confirmed, max_confirmed),
            }
        })
        .collect();

    // sort_by is stable, so ties stay in first-seen order
    summaries.sort_by(|a, b| b.confirmed.cmp(&a.confirmed));
    summaries
}

/// Merge the three condition tables into one daily series.
///
/// With `Some(country)` only rows whose normalized country matches exactly
/// are summed; with `None` every row is (the global series). A date appears
/// only if all three tables carry it. A country with no rows yields an empty
/// series.
pub fn build_time_series(set: &TimeSeriesSet, country: Option<&str>) -> Vec<DailySeriesPoint> {
    let key = country.map(normalize_country);

    let [confirmed, deaths, recovered] =
        Condition::ALL.map(|c| condition_totals(set.table(c), key.as_deref()));

    confirmed
        .into_iter()
        .filter_map(|(date, confirmed)| {
            Some(DailySeriesPoint {
                date,
                confirmed,
                deaths: *deaths.get(&date)?,
                recovered: *recovered.get(&date)?,
            })
        })
        .collect()
}

/// Per-date sum of one table, optionally restricted to one country.
fn condition_totals(table: &TimeSeriesTable, country: Option<&str>) -> BTreeMap<NaiveDate, u64> {
    let mut totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();

    let rows: Vec<_> = table
        .rows
        .iter()
        .filter(|row| country.map_or(true, |c| row.country == c))
        .collect();

    if rows.is_empty() {
        return totals;
    }

    for (i, date) in table.dates.iter().enumerate() {
        let sum = rows
            .iter()
            .map(|row| row.values.get(i).copied().unwrap_or(0))
            .fold(0u64, u64::saturating_add);
        let total = totals.entry(*date).or_default();
        *total = total.saturating_add(sum);
    }

    totals
}

/// `confirmed - deaths - recovered`, clamped to the `i64` range.
fn active_cases(confirmed: u64, deaths: u64, recovered: u64) -> i64 {
    let active = i128::from(confirmed) - i128::from(deaths) - i128::from(recovered);
    active.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Percentage of `part` in `whole`, undefined when `whole` is zero.
pub fn rate(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64 * 100.0)
    }
}

/// Composite severity score in `[0, 100]`.
///
/// Weighs the death rate (50%), the share of confirmed cases still active
/// (30%) and the country's case volume relative to the largest (20%).
pub fn severity_index(
    death_rate: Option<f64>,
    active_cases: i64,
    confirmed: u64,
    max_confirmed: u64,
) -> Option<f64> {
    let death_rate = death_rate?;
    if confirmed == 0 || max_confirmed == 0 {
        return None;
    }

    let active_share = active_cases.max(0) as f64 / confirmed as f64 * 100.0;
    let volume_share = confirmed as f64 / max_confirmed as f64 * 100.0;
    let score = 0.5 * death_rate + 0.3 * active_share + 0.2 * volume_share;

    Some(score.clamp(0.0, 100.0))
}

/// Country names in alphabetical order, for a selection list.
pub fn country_options(countries: &[CountrySummary]) -> Vec<String> {
    let mut names: Vec<String> = countries.iter().map(|c| c.country.clone()).collect();
    names.sort();
    names.dedup();
    names
}

/// Case-insensitive substring filter on the country name.
pub fn filter_countries(countries: &[CountrySummary], query: &str) -> Vec<CountrySummary> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return countries.to_vec();
    }

    countries
        .iter()
        .filter(|c| c.country.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Re-sort the country table. Numeric keys sort highest first, names
/// alphabetically; undefined rates go last.
pub fn sort_countries(countries: &mut [CountrySummary], key: SortKey) {
    countries.sort_by(|a, b| match key {
        SortKey::Confirmed => b.confirmed.cmp(&a.confirmed),
        SortKey::Deaths => b.deaths.cmp(&a.deaths),
        SortKey::Recovered => b.recovered.cmp(&a.recovered),
        SortKey::Active => b.active_cases.cmp(&a.active_cases),
        SortKey::DeathRate => cmp_undefined_last(a.death_rate, b.death_rate),
        SortKey::Severity => cmp_undefined_last(a.severity_index, b.severity_index),
        SortKey::Name => a.country.cmp(&b.country),
    });
}

fn cmp_undefined_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Get the first `n` countries of the table.
pub fn top_countries(countries: &[CountrySummary], n: usize) -> Vec<CountrySummary> {
    countries.iter().take(n).cloned().collect()
}

/// Pearson correlation between confirmed, deaths, recovered and active
/// cases across countries.
pub fn correlation_matrix(countries: &[CountrySummary]) -> CorrelationMatrix {
    let columns: [(&str, Vec<f64>); 4] = [
        ("confirmed", countries.iter().map(|c| c.confirmed as f64).collect()),
        ("deaths", countries.iter().map(|c| c.deaths as f64).collect()),
        ("recovered", countries.iter().map(|c| c.recovered as f64).collect()),
        ("active", countries.iter().map(|c| c.active_cases as f64).collect()),
    ];

    let cells = columns
        .iter()
        .map(|(_, xs)| columns.iter().map(|(_, ys)| pearson(xs, ys)).collect())
        .collect();

    CorrelationMatrix {
        labels: columns.iter().map(|(label, _)| label.to_string()).collect(),
        cells,
    }
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn snapshot_row(country: &str, province: &str, c: u64, d: u64, r: u64) -> DailySnapshotRow {
        DailySnapshotRow {
            province: Some(province.to_string()),
            ..DailySnapshotRow::new(country, c, d, r)
        }
    }

    fn sample_snapshot() -> Vec<DailySnapshotRow> {
        vec![
            snapshot_row("Testland", "North", 100, 5, 33),
            DailySnapshotRow::new("Otherland", 400, 20, 100),
            snapshot_row("Testland", "South", 50, 2, 40),
            DailySnapshotRow::new("Zeroland", 0, 0, 0),
            DailySnapshotRow::new("Evenland", 150, 1, 10),
        ]
    }

    fn table(condition: Condition, dates: &[&str], rows: &[(&str, &[u64])]) -> Arc<TimeSeriesTable> {
        let mut table = TimeSeriesTable::new(condition, dates.iter().map(|d| date(d)).collect());
        for (country, values) in rows {
            table.push_row(*country, values.to_vec());
        }
        Arc::new(table)
    }

    fn series_set(rows: [&[(&str, &[u64])]; 3], dates: &[&str]) -> TimeSeriesSet {
        TimeSeriesSet::new(
            table(Condition::Confirmed, dates, rows[0]),
            table(Condition::Deaths, dates, rows[1]),
            table(Condition::Recovered, dates, rows[2]),
        )
        .unwrap()
    }

    fn two_country_set() -> TimeSeriesSet {
        let dates = ["2020-01-22", "2020-01-23", "2020-01-24"];
        series_set(
            [
                &[("Testland", &[1, 4, 9]), ("Otherland", &[0, 2, 3]), ("Testland", &[2, 2, 5])],
                &[("Testland", &[0, 0, 1]), ("Otherland", &[0, 0, 1]), ("Testland", &[0, 1, 1])],
                &[("Testland", &[0, 1, 2]), ("Otherland", &[0, 0, 0]), ("Testland", &[0, 0, 3])],
            ],
            &dates,
        )
    }

    #[test]
    fn test_summarize_global() {
        let totals = summarize_global(&sample_snapshot());
        assert_eq!(totals.confirmed, 700);
        assert_eq!(totals.deaths, 28);
        assert_eq!(totals.recovered, 183);
    }

    #[test]
    fn test_summarize_global_empty() {
        assert_eq!(summarize_global(&[]), GlobalTotals::default());
    }

    #[test]
    fn test_sub_regions_are_summed() {
        let summaries = summarize_countries(&sample_snapshot());
        let testland = summaries.iter().find(|c| c.country == "Testland").unwrap();

        assert_eq!(testland.confirmed, 150);
        assert_eq!(testland.deaths, 7);
        assert_eq!(testland.recovered, 73);
        assert!((testland.death_rate.unwrap() - 4.67).abs() < 0.01);
    }

    #[test]
    fn test_testland_example() {
        let rows = vec![
            snapshot_row("Testland", "North", 100, 5, 33),
            snapshot_row("Testland", "South", 50, 2, 40),
        ];
        let summaries = summarize_countries(&rows);

        assert_eq!(summaries.len(), 1);
        let testland = &summaries[0];
        assert_eq!(testland.confirmed, 150);
        assert_eq!(testland.deaths, 7);
        assert_eq!(testland.recovered, 73);
        assert_eq!(testland.active_cases, 70);
        assert!((testland.death_rate.unwrap() - 4.666_666).abs() < 1e-4);
        assert!((testland.recovery_rate.unwrap() - 48.666_666).abs() < 1e-4);
    }

    #[test]
    fn test_countries_sorted_desc_with_stable_ties() {
        let summaries = summarize_countries(&sample_snapshot());
        let names: Vec<&str> = summaries.iter().map(|c| c.country.as_str()).collect();

        // Testland and Evenland both have 150; Testland appeared first.
        assert_eq!(names, vec!["Otherland", "Testland", "Evenland", "Zeroland"]);
        assert!(summaries.windows(2).all(|w| w[0].confirmed >= w[1].confirmed));
        assert_eq!(summaries, summarize_countries(&sample_snapshot()));
    }

    #[test]
    fn test_country_totals_match_global() {
        let rows = sample_snapshot();
        let totals = summarize_global(&rows);
        let summaries = summarize_countries(&rows);

        assert_eq!(summaries.iter().map(|c| c.confirmed).sum::<u64>(), totals.confirmed);
        assert_eq!(summaries.iter().map(|c| c.deaths).sum::<u64>(), totals.deaths);
        assert_eq!(summaries.iter().map(|c| c.recovered).sum::<u64>(), totals.recovered);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let rows = vec![
            DailySnapshotRow::new("A", u64::MAX, 0, 0),
            DailySnapshotRow::new("B", 1, 0, 0),
            DailySnapshotRow::new("A", 5, u64::MAX, u64::MAX),
        ];

        let totals = summarize_global(&rows);
        assert_eq!(totals.confirmed, u64::MAX);
        assert_eq!(totals.deaths, u64::MAX);

        let summaries = summarize_countries(&rows);
        assert_eq!(summaries[0].country, "A");
        assert_eq!(summaries[0].confirmed, u64::MAX);
        assert_eq!(summaries[0].active_cases, i64::MIN);
    }

    #[test]
    fn test_huge_series_values_saturate() {
        let set = series_set(
            [
                &[("A", &[u64::MAX]), ("B", &[1])],
                &[("A", &[0]), ("B", &[0])],
                &[("A", &[0]), ("B", &[0])],
            ],
            &["2020-01-01"],
        );

        let series = build_time_series(&set, None);
        assert_eq!(series[0].confirmed, u64::MAX);
    }

    #[test]
    fn test_zero_confirmed_rates_are_undefined() {
        let summaries = summarize_countries(&sample_snapshot());
        let zero = summaries.iter().find(|c| c.country == "Zeroland").unwrap();

        assert_eq!(zero.death_rate, None);
        assert_eq!(zero.recovery_rate, None);
        assert_eq!(zero.severity_index, None);
        assert_eq!(zero.active_cases, 0);
    }

    #[test]
    fn test_rates_within_bounds() {
        for summary in summarize_countries(&sample_snapshot()) {
            if summary.confirmed > 0 {
                let death_rate = summary.death_rate.unwrap();
                assert!((0.0..=100.0).contains(&death_rate));
                let severity = summary.severity_index.unwrap();
                assert!((0.0..=100.0).contains(&severity));
            }
        }
    }

    #[test]
    fn test_country_names_are_normalized() {
        let rows = vec![
            DailySnapshotRow::new("Testland ", 1, 0, 0),
            DailySnapshotRow::new(" Testland", 2, 0, 0),
        ];
        let summaries = summarize_countries(&rows);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].confirmed, 3);
    }

    #[test]
    fn test_single_point_series() {
        let set = series_set(
            [&[("Testland", &[10])], &[("Testland", &[1])], &[("Testland", &[5])]],
            &["2020-01-01"],
        );

        let series = build_time_series(&set, Some("Testland"));
        assert_eq!(
            series,
            vec![DailySeriesPoint {
                date: date("2020-01-01"),
                confirmed: 10,
                deaths: 1,
                recovered: 5,
            }]
        );
    }

    #[test]
    fn test_country_series_sums_sub_regions() {
        let series = build_time_series(&two_country_set(), Some("Testland"));

        assert_eq!(series.len(), 3);
        assert_eq!(series[2].confirmed, 14);
        assert_eq!(series[2].deaths, 2);
        assert_eq!(series[2].recovered, 5);
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_global_series_is_sum_of_countries() {
        let set = two_country_set();
        let global = build_time_series(&set, None);
        let testland = build_time_series(&set, Some("Testland"));
        let otherland = build_time_series(&set, Some("Otherland"));

        assert_eq!(global.len(), 3);
        for ((g, t), o) in global.iter().zip(&testland).zip(&otherland) {
            assert_eq!(g.date, t.date);
            assert_eq!(g.confirmed, t.confirmed + o.confirmed);
            assert_eq!(g.deaths, t.deaths + o.deaths);
            assert_eq!(g.recovered, t.recovered + o.recovered);
        }
    }

    #[test]
    fn test_unknown_country_is_empty() {
        assert!(build_time_series(&two_country_set(), Some("Atlantis")).is_empty());
    }

    #[test]
    fn test_series_is_inner_join_on_date() {
        let set = TimeSeriesSet::new(
            table(Condition::Confirmed, &["2020-01-02", "2020-01-01", "2020-01-03"], &[("A", &[2, 1, 3])]),
            table(Condition::Deaths, &["2020-01-01", "2020-01-02"], &[("A", &[0, 1])]),
            table(Condition::Recovered, &["2020-01-01", "2020-01-02", "2020-01-03"], &[("A", &[0, 0, 1])]),
        )
        .unwrap();

        let series = build_time_series(&set, None);
        let dates: Vec<NaiveDate> = series.iter().map(|p| p.date).collect();

        assert_eq!(dates, vec![date("2020-01-01"), date("2020-01-02")]);
        assert_eq!(series[0].confirmed, 1);
        assert_eq!(series[1].deaths, 1);
    }

    #[test]
    fn test_country_options_alphabetical() {
        let summaries = summarize_countries(&sample_snapshot());
        assert_eq!(
            country_options(&summaries),
            vec!["Evenland", "Otherland", "Testland", "Zeroland"]
        );
    }

    #[test]
    fn test_filter_countries() {
        let summaries = summarize_countries(&sample_snapshot());
        let filtered = filter_countries(&summaries, "  LAND");
        assert_eq!(filtered.len(), 4);

        let filtered = filter_countries(&summaries, "test");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].country, "Testland");

        assert_eq!(filter_countries(&summaries, "").len(), summaries.len());
    }

    #[test]
    fn test_sort_by_death_rate_puts_undefined_last() {
        let mut summaries = summarize_countries(&sample_snapshot());
        sort_countries(&mut summaries, SortKey::DeathRate);

        assert_eq!(summaries[0].country, "Otherland");
        assert_eq!(summaries.last().map(|c| c.country.as_str()), Some("Zeroland"));
    }

    #[test]
    fn test_sort_by_name() {
        let mut summaries = summarize_countries(&sample_snapshot());
        sort_countries(&mut summaries, SortKey::Name);
        assert_eq!(summaries[0].country, "Evenland");
    }

    #[test]
    fn test_top_countries() {
        let summaries = summarize_countries(&sample_snapshot());
        let top = top_countries(&summaries, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].country, "Otherland");
        assert_eq!(top_countries(&summaries, 10).len(), 4);
    }

    #[test]
    fn test_correlation_matrix() {
        let summaries = summarize_countries(&sample_snapshot());
        let matrix = correlation_matrix(&summaries);

        assert_eq!(matrix.labels.len(), 4);
        let diag = matrix.get("confirmed", "confirmed").unwrap();
        assert!((diag - 1.0).abs() < 1e-9);
        assert_eq!(matrix.get("deaths", "confirmed"), matrix.get("confirmed", "deaths"));
        assert!(matrix.get("confirmed", "deaths").unwrap() > 0.5);
    }

    #[test]
    fn test_correlation_needs_two_countries() {
        let summaries = summarize_countries(&[DailySnapshotRow::new("Solo", 10, 1, 2)]);
        let matrix = correlation_matrix(&summaries);
        assert!(matrix.cells.iter().flatten().all(|c| c.is_none()));
    }
}
