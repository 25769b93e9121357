//! Synthetic Survey Generator
//!
//! Writes a crack-monitoring export plus matching daily rainfall and soil
//! moisture files for demos and manual testing of `movement-analyser`:
//! - `Crack 1`: steady progressive opening
//! - `Crack 2`: clay shrink/swell (opens in summer, closes through wet winters)
//! - `Gauge 3`: stable, noise only
//!
//! Readings are roughly weekly with jitter and the odd missed visit.
//!
//! # Usage
//! ```bash
//! ./synthetic-survey --days 540 --seed 7 --out-dir demo
//! ./movement-analyser analyse --input demo/synthetic_survey.csv --rainfall-csv demo/synthetic_rainfall.csv
//! ./movement-analyser analyse --input demo/synthetic_survey.csv --rainfall-csv demo/synthetic_rainfall.csv \
//!     --soil-moisture-csv demo/synthetic_soil_moisture.csv
//! ```

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Exp, Normal};
use std::f64::consts::TAU;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::info;

// ============================================================================
// Site Constants
// ============================================================================

/// Mean daily rainfall (mm) around which the annual cycle swings
const MEAN_RAIN_MM: f64 = 2.0;
/// Annual rainfall swing (mm/day), wettest in midwinter
const RAIN_SWING_MM: f64 = 1.2;
/// Share of dry days
const DRY_DAY_PROBABILITY: f64 = 0.45;
/// Mean volumetric soil water content (%)
const MEAN_VWC: f64 = 32.0;
/// Annual soil moisture swing (%), driest with the widest crack opening
const VWC_SWING: f64 = 9.0;
/// VWC rise per mm of rain, decaying back to the seasonal level
const VWC_PER_MM: f64 = 0.35;
/// Daily decay of rain-driven wetting
const VWC_RECOVERY: f64 = 0.8;
/// Progressive crack opening (mm/day)
const PROGRESSIVE_RATE: f64 = 0.002;
/// Seasonal crack amplitude (mm)
const SEASONAL_AMPLITUDE: f64 = 0.4;
/// Slow closing of the seasonal crack as the clay rewets (mm/day)
const SEASONAL_CLOSING_RATE: f64 = 0.0008;
/// Annual phase of the widest seasonal opening (late July)
const DRIEST_PHASE: f64 = 205.0 / 365.25 * TAU;
/// Reading noise (mm, one sigma)
const READING_NOISE: f64 = 0.02;
/// Chance a sensor is not read on a visit
const MISSED_READING_PROBABILITY: f64 = 0.03;

#[derive(Parser, Debug)]
#[command(name = "synthetic-survey")]
#[command(about = "Generate a synthetic crack-monitoring survey with rainfall and soil moisture files")]
struct Args {
    /// Length of the survey in days
    #[arg(long, default_value = "540")]
    days: i64,

    /// Nominal days between visits
    #[arg(long, default_value = "7")]
    interval: i64,

    /// First survey date (YYYY-MM-DD)
    #[arg(long, default_value = "2023-01-09")]
    start: NaiveDate,

    /// RNG seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

/// Annual phase, 0 at 1 January.
fn year_phase(date: NaiveDate) -> f64 {
    f64::from(date.ordinal0()) / 365.25 * TAU
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    if args.days < 1 || args.interval < 1 {
        return Err(anyhow!("--days and --interval must be positive"));
    }

    let mut rng: StdRng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let noise = Normal::new(0.0, READING_NOISE).map_err(|e| anyhow!("noise distribution: {e}"))?;

    // Daily rainfall, wettest in midwinter; soil moisture follows the
    // seasonal cycle plus decaying wetting from recent rain
    let mut rainfall = String::from("Date,Rainfall (mm)\n");
    let mut soil = String::from("Date,Soil moisture (VWC %)\n");
    let mut wetting = 0.0;
    for offset in 0..args.days {
        let date = args.start + Duration::days(offset);
        let mean = MEAN_RAIN_MM + RAIN_SWING_MM * year_phase(date).cos();
        let mm = if rng.gen_bool(DRY_DAY_PROBABILITY) {
            0.0
        } else {
            let wet = Exp::new(1.0 / mean.max(0.1)).map_err(|e| anyhow!("rain distribution: {e}"))?;
            wet.sample(&mut rng)
        };
        writeln!(rainfall, "{},{mm:.1}", date.format("%d/%m/%Y"))?;

        wetting = wetting * VWC_RECOVERY + VWC_PER_MM * mm;
        let vwc = MEAN_VWC - VWC_SWING * (year_phase(date) - DRIEST_PHASE).cos() + wetting;
        writeln!(soil, "{},{:.1}", date.format("%d/%m/%Y"), vwc.clamp(5.0, 55.0))?;
    }

    // Survey visits
    let mut survey = String::from("Date,Crack 1,Crack 2,Gauge 3\n");
    let mut visits = 0usize;
    let mut offset = 0i64;
    while offset < args.days {
        let date = args.start + Duration::days(offset);
        let hour = rng.gen_range(8..17);
        let minute = rng.gen_range(0..60);
        let t = offset as f64;

        let seasonal = SEASONAL_AMPLITUDE * (year_phase(date) - DRIEST_PHASE).cos()
            - SEASONAL_CLOSING_RATE * t;
        let readings = [PROGRESSIVE_RATE * t, seasonal, 0.0];

        let mut row = format!("{} {hour:02}:{minute:02}", date.format("%d/%m/%Y"));
        for base in readings {
            if rng.gen_bool(MISSED_READING_PROBABILITY) {
                row.push(',');
            } else {
                write!(row, ",{:.3}", base + noise.sample(&mut rng))?;
            }
        }
        survey.push_str(&row);
        survey.push('\n');
        visits += 1;

        offset += (args.interval + rng.gen_range(-1..=1)).max(1);
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;
    let survey_path = args.out_dir.join("synthetic_survey.csv");
    let rain_path = args.out_dir.join("synthetic_rainfall.csv");
    let soil_path = args.out_dir.join("synthetic_soil_moisture.csv");
    std::fs::write(&survey_path, survey)
        .with_context(|| format!("Failed to write {}", survey_path.display()))?;
    std::fs::write(&rain_path, rainfall)
        .with_context(|| format!("Failed to write {}", rain_path.display()))?;
    std::fs::write(&soil_path, soil)
        .with_context(|| format!("Failed to write {}", soil_path.display()))?;

    info!(
        survey = %survey_path.display(),
        rainfall = %rain_path.display(),
        soil_moisture = %soil_path.display(),
        visits,
        days = args.days,
        "Synthetic survey written"
    );
    Ok(())
}
