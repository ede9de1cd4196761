//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::FallbackPolicy;
use crate::models::SortKey;

/// Coronadash - COVID-19 case dashboard reports
///
/// Aggregates a daily snapshot and the confirmed/deaths/recovered
/// time-series tables into global totals, a per-country table and a
/// daily series, rendered as Markdown or JSON.
///
/// Examples:
///   coronadash --data-dir ./data
///   coronadash --data-dir ./data --country Italy --days 60
///   coronadash --format json --stdout --search land --sort-by death-rate
///   coronadash --fallback sample
///   coronadash --list-countries
///   coronadash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing daily_report.csv and time_<condition>.csv
    ///
    /// Defaults to the config file setting, or ./data.
    #[arg(short, long, value_name = "DIR", env = "CORONADASH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Country for the daily series (omit for the global series)
    #[arg(long, value_name = "NAME")]
    pub country: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the report to stdout instead of writing a file
    #[arg(long)]
    pub stdout: bool,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Number of countries in the country table
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Number of most recent days in the series table
    #[arg(long, value_name = "DAYS")]
    pub days: Option<usize>,

    /// Only list countries whose name contains this text
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Column used to order the country table
    #[arg(long, value_name = "KEY")]
    pub sort_by: Option<SortKey>,

    /// What to do when the input files are missing or malformed
    ///
    /// "error" exits with status 1; "sample" substitutes a clearly
    /// labeled synthetic dataset.
    #[arg(long, value_name = "POLICY")]
    pub fallback: Option<FallbackPolicy>,

    /// Always re-read input files instead of reusing parsed tables
    #[arg(long)]
    pub no_cache: bool,

    /// Print the available countries and exit
    #[arg(long)]
    pub list_countries: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .coronadash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .coronadash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        if self.days == Some(0) {
            return Err("--days must be at least 1".to_string());
        }

        if let Some(ref country) = self.country {
            if country.trim().is_empty() {
                return Err("--country must not be empty".to_string());
            }
        }

        if self.stdout && self.output.is_some() {
            return Err("Cannot use both --stdout and --output".to_string());
        }

        if let Some(ref data_dir) = self.data_dir {
            if data_dir.exists() && !data_dir.is_dir() {
                return Err(format!(
                    "Data path is not a directory: {}",
                    data_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
