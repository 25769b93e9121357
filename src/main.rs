//! movement-analyser - structural movement survey analysis
//!
//! # Usage
//!
//! ```bash
//! # Analyse a survey export, auto-detecting the date column
//! movement-analyser analyse --input survey.csv
//!
//! # With rainfall for the site postcode, JSON for charting
//! movement-analyser analyse --input survey.csv --postcode "SW1A 1AA" --format json
//!
//! # With a local rainfall file and chosen sensors
//! movement-analyser analyse --input survey.csv --rainfall-csv rain.csv --sensors "Crack 1,Crack 2"
//!
//! # Fit the thermal component on COSMOS-UK soil moisture near the site
//! movement-analyser analyse --input survey.csv --postcode "RG1 1AA" --soil-moisture
//!
//! # ... or on a local soil moisture file
//! movement-analyser analyse --input survey.csv --rainfall-csv rain.csv --soil-moisture-csv vwc.csv
//!
//! # Show the effective configuration
//! movement-analyser print-config
//! ```
//!
//! # Environment Variables
//!
//! - `MOVEMENT_CONFIG`: path to a TOML config file
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use movement_analyser::alignment::{TimeAligner, TimeColumn};
use movement_analyser::analysis::MovementAnalyzer;
use movement_analyser::config::AnalysisConfig;
use movement_analyser::ingest::RawTable;
use movement_analyser::report::{generate_narrative, ReportExport};
use movement_analyser::types::EnvironmentalSeries;
use movement_analyser::weather::{
    rainfall_for_postcode, soil_moisture_for_postcode, CosmosUkClient, CsvPrecipitationSource,
    CsvSoilMoistureSource, Location, OpenMeteoArchive, PostcodesIoGeocoder, PrecipitationSource,
    SoilMoistureSource,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "movement-analyser")]
#[command(about = "Structural movement monitoring: decomposition, classification and rainfall correlation")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides MOVEMENT_CONFIG and ./movement_config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Analyse one survey export
    Analyse {
        /// Survey file (.csv, .tsv or .txt)
        #[arg(short, long)]
        input: PathBuf,

        /// Name of the date/time column (auto-detected when omitted)
        #[arg(long)]
        time_column: Option<String>,

        /// Comma-separated sensor columns (default: every numeric column)
        #[arg(long, value_delimiter = ',')]
        sensors: Option<Vec<String>>,

        /// Local daily rainfall CSV (takes precedence over --postcode)
        #[arg(long)]
        rainfall_csv: Option<PathBuf>,

        /// Site postcode for rainfall lookup (default: survey.postcode from config)
        #[arg(long)]
        postcode: Option<String>,

        /// Local daily soil moisture CSV, used as the thermal covariate
        #[arg(long)]
        soil_moisture_csv: Option<PathBuf>,

        /// Fetch soil moisture from the nearest COSMOS-UK station for the
        /// postcode and use it as the thermal covariate
        #[arg(long, conflicts_with = "soil_moisture_csv")]
        soil_moisture: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    PrintConfig,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => AnalysisConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalysisConfig::load(),
    };

    match args.command {
        SubCommand::PrintConfig => {
            print!("{}", config.to_toml().context("Failed to serialise config")?);
            Ok(())
        }
        SubCommand::Analyse {
            input,
            time_column,
            sensors,
            rainfall_csv,
            postcode,
            soil_moisture_csv,
            soil_moisture,
            format,
            output,
        } => {
            let request = AnalyseRequest {
                input,
                time_column,
                sensors,
                rainfall_csv,
                postcode,
                soil_moisture_csv,
                soil_moisture,
                format,
                output,
            };
            run_analyse(&config, request).await
        }
    }
}

struct AnalyseRequest {
    input: PathBuf,
    time_column: Option<String>,
    sensors: Option<Vec<String>>,
    rainfall_csv: Option<PathBuf>,
    postcode: Option<String>,
    soil_moisture_csv: Option<PathBuf>,
    soil_moisture: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
}

async fn run_analyse(config: &AnalysisConfig, request: AnalyseRequest) -> Result<()> {
    info!(
        survey = %config.survey.name,
        input = %request.input.display(),
        "Starting analysis"
    );

    let table = RawTable::from_path(&request.input)
        .with_context(|| format!("Failed to read {}", request.input.display()))?;

    let time_column = request
        .time_column
        .map_or(TimeColumn::AutoDetect, TimeColumn::Named);
    let dataset = TimeAligner::new(&config.alignment)
        .align(&table, &time_column, request.sensors.as_deref())
        .context("Failed to align survey data")?;

    let postcode = request
        .postcode
        .or_else(|| Some(config.survey.postcode.clone()).filter(|p| !p.trim().is_empty()));

    if request.soil_moisture && postcode.is_none() {
        warn!("--soil-moisture needs a postcode; thermal fit falls back to rainfall");
    }

    let (environment, covariate) = match dataset.time_range() {
        Some((start, end)) => {
            let (start, end) = (start.date(), end.date());
            let rainfall = load_rainfall(
                config,
                request.rainfall_csv.as_deref(),
                postcode.as_deref(),
                start,
                end,
            );
            let soil = load_soil_moisture(
                config,
                request.soil_moisture_csv.as_deref(),
                request.soil_moisture.then_some(postcode.as_deref()).flatten(),
                start,
                end,
            );
            tokio::join!(rainfall, soil)
        }
        None => (None, None),
    };

    // Core stages are CPU-bound; keep them off the async workers
    let analyzer = MovementAnalyzer::new(config);
    let report = tokio::task::spawn_blocking(move || {
        analyzer.analyze_with_covariate(&dataset, environment.as_ref(), covariate.as_ref())
    })
    .await
    .context("Analysis task failed")?;

    let rendered = match request.format {
        OutputFormat::Text => generate_narrative(&config.survey, &report),
        OutputFormat::Json => ReportExport::from_report(&config.survey, &report)
            .to_json()
            .context("Failed to serialise report")?,
    };

    match &request.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Rainfall from a local file or postcode lookup. Any failure is logged and
/// the analysis continues without rainfall.
async fn load_rainfall(
    config: &AnalysisConfig,
    rainfall_csv: Option<&Path>,
    postcode: Option<&str>,
    start: NaiveDate,
    end: NaiveDate,
) -> Option<EnvironmentalSeries> {
    if let Some(path) = rainfall_csv {
        let result = match CsvPrecipitationSource::from_path(path, &config.alignment) {
            Ok(source) => {
                let anywhere = Location { latitude: 0.0, longitude: 0.0 };
                source.daily_precipitation(&anywhere, start, end).await
            }
            Err(e) => Err(e),
        };
        return match result {
            Ok(series) => Some(series),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Rainfall file unusable; continuing without rainfall");
                None
            }
        };
    }

    let postcode = postcode?;
    let clients = PostcodesIoGeocoder::new(&config.weather)
        .and_then(|g| OpenMeteoArchive::new(&config.weather).map(|a| (g, a)));
    let result = match clients {
        Ok((geocoder, archive)) => {
            rainfall_for_postcode(&geocoder, &archive, postcode, start, end).await
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(series) => Some(series),
        Err(e) => {
            warn!(postcode, error = %e, "Rainfall lookup failed; continuing without rainfall");
            None
        }
    }
}

/// Soil moisture from a local file or the COSMOS-UK station nearest the
/// postcode. `None` when neither is requested; any failure is logged and the
/// thermal component falls back to rainfall.
async fn load_soil_moisture(
    config: &AnalysisConfig,
    soil_moisture_csv: Option<&Path>,
    postcode: Option<&str>,
    start: NaiveDate,
    end: NaiveDate,
) -> Option<EnvironmentalSeries> {
    if let Some(path) = soil_moisture_csv {
        let result = match CsvSoilMoistureSource::from_path(path, &config.alignment) {
            Ok(source) => {
                let anywhere = Location { latitude: 0.0, longitude: 0.0 };
                source.daily_soil_moisture(&anywhere, start, end).await
            }
            Err(e) => Err(e),
        };
        return match result {
            Ok(series) => Some(series),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Soil moisture file unusable; thermal fit falls back to rainfall");
                None
            }
        };
    }

    let postcode = postcode?;
    let clients = PostcodesIoGeocoder::new(&config.weather)
        .and_then(|g| CosmosUkClient::new(&config.weather).map(|c| (g, c)));
    let result = match clients {
        Ok((geocoder, cosmos)) => {
            soil_moisture_for_postcode(&geocoder, &cosmos, postcode, start, end).await
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(series) => Some(series),
        Err(e) => {
            warn!(postcode, error = %e, "Soil moisture lookup failed; thermal fit falls back to rainfall");
            None
        }
    }
}
