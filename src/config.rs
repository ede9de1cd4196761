//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.coronadash.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::OutputFormat;
use crate::data::CachePolicy;
use crate::models::SortKey;

/// Name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".coronadash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input data settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
        }
    }
}

fn default_output() -> String {
    "coronadash_report.md".to_string()
}

/// What to do when the input files cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Report the error and exit.
    #[default]
    Error,
    /// Substitute the labeled sample dataset.
    Sample,
}

/// Input data settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the snapshot and time-series files.
    #[serde(default = "default_data_dir")]
    pub dir: String,

    /// File name of the daily snapshot inside `dir`.
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,

    /// Table cache policy.
    #[serde(default)]
    pub cache: CachePolicy,

    /// Missing-data policy.
    #[serde(default)]
    pub fallback: FallbackPolicy,

    /// Number of days in the sample dataset.
    #[serde(default = "default_sample_days")]
    pub sample_days: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            snapshot_file: default_snapshot_file(),
            cache: CachePolicy::default(),
            fallback: FallbackPolicy::default(),
            sample_days: default_sample_days(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_snapshot_file() -> String {
    "daily_report.csv".to_string()
}

fn default_sample_days() -> usize {
    60
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of countries in the country table.
    #[serde(default = "default_top")]
    pub top: usize,

    /// Number of most recent days in the series table.
    #[serde(default = "default_days")]
    pub days: usize,

    /// Country table ordering.
    #[serde(default)]
    pub sort_by: SortKey,

    /// Show the global series when the selected country has no rows.
    #[serde(default = "default_true")]
    pub fallback_to_global: bool,

    /// Include the correlation matrix section.
    #[serde(default = "default_true")]
    pub include_correlation: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top: default_top(),
            days: default_days(),
            sort_by: SortKey::default(),
            fallback_to_global: true,
            include_correlation: true,
        }
    }
}

fn default_top() -> usize {
    20
}

fn default_days() -> usize {
    30
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.data_dir {
            self.data.dir = dir.display().to_string();
        }
        if let Some(fallback) = args.fallback {
            self.data.fallback = fallback;
        }
        if args.no_cache {
            self.data.cache = CachePolicy::Disabled;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(top) = args.top {
            self.report.top = top;
        }
        if let Some(days) = args.days {
            self.report.days = days;
        }
        if let Some(sort_by) = args.sort_by {
            self.report.sort_by = sort_by;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.dir, "data");
        assert_eq!(config.data.snapshot_file, "daily_report.csv");
        assert_eq!(config.data.fallback, FallbackPolicy::Error);
        assert_eq!(config.report.top, 20);
        assert!(config.report.fallback_to_global);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "dashboard.json"
format = "json"

[data]
dir = "/srv/covid"
cache = "disabled"
fallback = "sample"

[report]
top = 5
sort_by = "death_rate"
fallback_to_global = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "dashboard.json");
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.data.dir, "/srv/covid");
        assert_eq!(config.data.cache, CachePolicy::Disabled);
        assert_eq!(config.data.fallback, FallbackPolicy::Sample);
        assert_eq!(config.data.snapshot_file, "daily_report.csv");
        assert_eq!(config.report.top, 5);
        assert_eq!(config.report.days, 30);
        assert_eq!(config.report.sort_by, SortKey::DeathRate);
        assert!(!config.report.fallback_to_global);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[data]"));
        assert!(toml_str.contains("[report]"));
        assert!(!toml_str.contains("verbose"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.report.days, 30);
    }

    #[test]
    fn test_merge_only_overrides_explicit_args() {
        let mut config = Config::default();
        config.report.top = 7;
        config.data.fallback = FallbackPolicy::Sample;

        let mut args = crate::cli::tests::make_args();
        args.data_dir = Some(PathBuf::from("fixtures/data"));
        args.no_cache = true;
        config.merge_with_args(&args);

        assert_eq!(config.report.top, 7);
        assert_eq!(config.data.fallback, FallbackPolicy::Sample);
        assert_eq!(config.data.dir, "fixtures/data");
        assert_eq!(config.data.cache, CachePolicy::Disabled);
    }
}
