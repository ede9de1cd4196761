//! Coronadash - COVID-19 case dashboard reports
//!
//! A CLI tool that aggregates a daily snapshot and per-condition
//! time-series tables into global totals, a per-country table and a
//! daily series, and renders them as a Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, data unavailable, write failure)

use anyhow::{Context, Result};
use coronadash::analysis::{
    build_report, country_options, load_dataset, summarize_countries, ReportOptions,
};
use coronadash::cli::{Args, OutputFormat};
use coronadash::config::{Config, FallbackPolicy, DEFAULT_CONFIG_FILE};
use coronadash::data::DataLoader;
use coronadash::report::{self, generator::format_count};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("Coronadash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .coronadash.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the data directory, fallback policy and report layout.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load the data, build the report and write it. Returns the exit code.
fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Step 1: Load the source tables
    let mut loader = DataLoader::from_config(&config.data);
    info!("Loading data from {}", loader.data_dir().display());

    let dataset = match load_dataset(&mut loader, config.data.fallback, config.data.sample_days) {
        Ok(dataset) => dataset,
        Err(e) => {
            if config.data.fallback == FallbackPolicy::Error {
                eprintln!("   Hint: pass --fallback sample to render with labeled sample data.");
            }
            return Err(e).with_context(|| {
                format!("Data unavailable in {}", loader.data_dir().display())
            });
        }
    };

    if dataset.source.is_sample() {
        warn!("Report is built from synthetic sample data");
    }

    // Handle --list-countries: print the selection list and exit
    if args.list_countries {
        let countries = summarize_countries(&dataset.snapshot);
        for name in country_options(&countries) {
            println!("{}", name);
        }
        return Ok(0);
    }

    // Step 2: Aggregate into the report
    let options = ReportOptions::from_config(&config, args.country.clone(), args.search.clone());
    let report = build_report(&dataset, &options, start_time.elapsed().as_secs_f64());

    for warning in &report.warnings {
        warn!("{}", warning);
    }

    // Step 3: Render and save
    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    if args.stdout {
        println!("{}", output);
        return Ok(0);
    }

    std::fs::write(&config.general.output, &output)
        .with_context(|| format!("Failed to write report to {}", config.general.output))?;

    if !args.quiet {
        println!("\n📊 Dashboard Summary:");
        println!("   Countries: {}", report.metadata.countries_total);
        println!(
            "   Confirmed: {} | Deaths: {} | Recovered: {}",
            format_count(report.totals.confirmed),
            format_count(report.totals.deaths),
            format_count(report.totals.recovered),
        );
        println!(
            "   Series: {} ({} days shown)",
            report.series.scope(),
            report.series.points.len()
        );
        println!("\n✅ Report saved to: {}", config.general.output);
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
