//! Markdown and JSON report generation.
//!
//! This module renders a [`Report`] the way the dashboard would lay it
//! out: totals, the country table, the daily series and the correlation
//! heatmap, each as a Markdown table.

use anyhow::Result;

use crate::models::{
    CorrelationMatrix, CountrySummary, DataSource, GlobalTotals, Report, ReportMetadata,
    SeriesSection,
};

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Coronadash Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_warnings_section(&report.warnings));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_totals_section(&report.totals));
    output.push_str(&generate_countries_section(&report.countries));
    output.push_str(&generate_series_section(&report.series));
    output.push_str(&generate_correlation_section(&report.correlation));
    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Format a count with thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

fn format_signed(n: i64) -> String {
    if n < 0 {
        format!("-{}", format_count(n.unsigned_abs()))
    } else {
        format_count(n as u64)
    }
}

/// Format a percentage with two decimals, or `n/a` when undefined.
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.2}%", r),
        None => "n/a".to_string(),
    }
}

fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{:.2}", s),
        None => "n/a".to_string(),
    }
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    match metadata.data_source {
        DataSource::Files { ref dir } => {
            section.push_str(&format!("- **Data Source:** `{}`\n", dir));
        }
        DataSource::Sample { .. } => {
            section.push_str("- **Data Source:** ⚠️ synthetic sample data\n");
        }
    }
    section.push_str(&format!("- **Countries:** {}\n", metadata.countries_total));
    section.push_str(&format!("- **Dates:** {}\n", metadata.dates_total));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_warnings_section(warnings: &[String]) -> String {
    if warnings.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    for warning in warnings {
        section.push_str(&format!("> ⚠️ **Warning:** {}\n", warning));
    }
    section.push('\n');

    section
}

fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Global Totals](#global-totals)\n");
    toc.push_str("- [Countries](#countries)\n");
    toc.push_str("- [Daily Series](#daily-series)\n");
    if !report.correlation.labels.is_empty() {
        toc.push_str("- [Correlation](#correlation)\n");
    }
    toc.push('\n');

    toc
}

fn generate_totals_section(totals: &GlobalTotals) -> String {
    let mut section = String::new();

    section.push_str("## Global Totals\n\n");
    section.push_str("| Condition | Count |\n");
    section.push_str("|:---|---:|\n");
    for (condition, count) in totals.as_rows() {
        section.push_str(&format!("| {} | {} |\n", condition, format_count(count)));
    }
    section.push('\n');

    section
}

fn generate_countries_section(countries: &[CountrySummary]) -> String {
    let mut section = String::new();

    section.push_str("## Countries\n\n");

    if countries.is_empty() {
        section.push_str("No countries to display.\n\n");
        return section;
    }

    section.push_str(
        "| # | Country | Confirmed | Deaths | Recovered | Active | Death Rate | Recovery Rate | Severity |\n",
    );
    section.push_str("|---:|:---|---:|---:|---:|---:|---:|---:|---:|\n");

    for (i, c) in countries.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            i + 1,
            c.country,
            format_count(c.confirmed),
            format_count(c.deaths),
            format_count(c.recovered),
            format_signed(c.active_cases),
            format_rate(c.death_rate),
            format_rate(c.recovery_rate),
            format_score(c.severity_index),
        ));
    }
    section.push('\n');

    section
}

fn generate_series_section(series: &SeriesSection) -> String {
    let mut section = String::new();

    section.push_str("## Daily Series\n\n");
    section.push_str(&format!("*Scope: {}*\n\n", series.scope()));

    if series.points.is_empty() {
        section.push_str(&format!("No data available for {}.\n\n", series.scope()));
        return section;
    }

    section.push_str("| Date | Confirmed | Deaths | Recovered |\n");
    section.push_str("|:---|---:|---:|---:|\n");
    for point in &series.points {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            point.date.format("%Y-%m-%d"),
            format_count(point.confirmed),
            format_count(point.deaths),
            format_count(point.recovered),
        ));
    }
    section.push('\n');

    section
}

fn generate_correlation_section(matrix: &CorrelationMatrix) -> String {
    if matrix.labels.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Correlation\n\n");
    section.push_str(&format!("| | {} |\n", matrix.labels.join(" | ")));
    section.push_str(&format!("|:---|{}\n", "---:|".repeat(matrix.labels.len())));

    for (label, row) in matrix.labels.iter().zip(&matrix.cells) {
        let cells: Vec<String> = row.iter().map(|c| format_score(*c)).collect();
        section.push_str(&format!("| **{}** | {} |\n", label, cells.join(" | ")));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by coronadash*\n".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailySeriesPoint, SeriesSection};
    use chrono::{NaiveDate, Utc};

    fn create_test_report() -> Report {
        Report {
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                data_source: DataSource::Files {
                    dir: "fixtures/data".to_string(),
                },
                countries_total: 2,
                dates_total: 1,
                duration_seconds: 0.25,
            },
            totals: GlobalTotals {
                confirmed: 1_234_567,
                deaths: 7,
                recovered: 73,
            },
            countries: vec![
                CountrySummary {
                    country: "Testland".to_string(),
                    confirmed: 150,
                    deaths: 7,
                    recovered: 73,
                    death_rate: Some(4.666_666),
                    recovery_rate: Some(48.666_666),
                    active_cases: 70,
                    severity_index: Some(30.33),
                },
                CountrySummary {
                    country: "Zeroland".to_string(),
                    confirmed: 0,
                    deaths: 0,
                    recovered: 0,
                    death_rate: None,
                    recovery_rate: None,
                    active_cases: 0,
                    severity_index: None,
                },
            ],
            series: SeriesSection {
                country: Some("Testland".to_string()),
                requested_country: Some("Testland".to_string()),
                points: vec![DailySeriesPoint {
                    date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                    confirmed: 10,
                    deaths: 1,
                    recovered: 5,
                }],
            },
            correlation: CorrelationMatrix {
                labels: vec!["confirmed".to_string(), "deaths".to_string()],
                cells: vec![vec![Some(1.0), Some(0.5)], vec![Some(0.5), None]],
            },
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
        assert_eq!(format_signed(-12_345), "-12,345");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(Some(4.666_666)), "4.67%");
        assert_eq!(format_rate(None), "n/a");
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report());

        assert!(markdown.contains("# Coronadash Report"));
        assert!(markdown.contains("## Global Totals"));
        assert!(markdown.contains("| Confirmed | 1,234,567 |"));
        assert!(markdown.contains("| 1 | Testland | 150 | 7 | 73 | 70 | 4.67% | 48.67% | 30.33 |"));
        assert!(markdown.contains("| 2 | Zeroland | 0 | 0 | 0 | 0 | n/a | n/a | n/a |"));
        assert!(markdown.contains("*Scope: Testland*"));
        assert!(markdown.contains("| 2020-01-01 | 10 | 1 | 5 |"));
        assert!(markdown.contains("| **deaths** | 0.50 | n/a |"));
        assert!(!markdown.contains("Warning"));
    }

    #[test]
    fn test_sample_source_is_flagged() {
        let mut report = create_test_report();
        report.metadata.data_source = DataSource::Sample {
            reason: "missing".to_string(),
        };
        report.warnings.push("SAMPLE DATA".to_string());

        let markdown = generate_markdown_report(&report);
        assert!(markdown.contains("synthetic sample data"));
        assert!(markdown.contains("> ⚠️ **Warning:** SAMPLE DATA"));
    }

    #[test]
    fn test_empty_series_section() {
        let series = SeriesSection {
            country: Some("Atlantis".to_string()),
            requested_country: Some("Atlantis".to_string()),
            points: Vec::new(),
        };
        let section = generate_series_section(&series);
        assert!(section.contains("No data available for Atlantis."));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report()).unwrap();

        assert!(json.contains("\"totals\""));
        assert!(json.contains("\"date\": \"2020-01-01\""));
        assert!(json.contains("\"death_rate\": null"));
        assert!(json.contains("\"kind\": \"files\""));
    }
}
