//! Analysis Configuration - every analysis threshold as an operator-tunable TOML value
//!
//! Each struct implements `Default` with the standard survey constants from
//! `defaults`, so an absent config file gives the reference behaviour.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one analysis session.
///
/// Load with `AnalysisConfig::load()` which searches:
/// 1. `$MOVEMENT_CONFIG` env var
/// 2. `./movement_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Survey / site identification
    #[serde(default)]
    pub survey: SurveyInfo,

    /// Time column detection and row handling
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Environmental resampling
    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Thermal / seasonal / progressive split
    #[serde(default)]
    pub decomposition: DecompositionConfig,

    /// Movement-type rules
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Slope strength buckets
    #[serde(default)]
    pub trend: TrendConfig,

    /// Geocoding and precipitation retrieval
    #[serde(default)]
    pub weather: WeatherConfig,
}

impl AnalysisConfig {
    /// Load configuration using the standard search order:
    /// 1. `$MOVEMENT_CONFIG` environment variable
    /// 2. `./movement_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), survey = %config.survey.name, "Loaded analysis config from MOVEMENT_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from MOVEMENT_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "MOVEMENT_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./movement_config.toml
        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(survey = %config.survey.name, "Loaded analysis config from ./movement_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./movement_config.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No movement_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys are logged, not fatal.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Analysis config saved");
        Ok(())
    }

    /// Validate all settings for internal consistency.
    ///
    /// Rules:
    /// - Windows and minimum counts must be positive
    /// - Ratios and correlation cutoffs must lie in their mathematical range
    /// - Trend buckets must be ordered: 0 < weak < moderate
    /// - Months must be 1-12
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let a = &self.alignment;
        if !(a.min_time_parse_ratio > 0.0 && a.min_time_parse_ratio <= 1.0) {
            errors.push(format!(
                "alignment.min_time_parse_ratio ({}) must be in (0, 1]",
                a.min_time_parse_ratio
            ));
        }

        if !self.environment.missing_fill.is_finite() {
            errors.push("environment.missing_fill must be a finite number".to_string());
        }

        if self.decomposition.seasonal_window == 0 {
            errors.push("decomposition.seasonal_window must be > 0".to_string());
        }

        let c = &self.classification;
        if c.min_defined_points < 2 {
            errors.push(format!(
                "classification.min_defined_points ({}) must be >= 2",
                c.min_defined_points
            ));
        }
        if !(-1.0..=1.0).contains(&c.rain_correlation_cutoff) {
            errors.push(format!(
                "classification.rain_correlation_cutoff ({}) must be in [-1, 1]",
                c.rain_correlation_cutoff
            ));
        }
        Self::check_months(&c.summer_months, "classification.summer_months", &mut errors);
        Self::check_months(&c.winter_months, "classification.winter_months", &mut errors);

        let t = &self.trend;
        Self::check_escalation(t.weak_below, t.moderate_below, "trend", &mut errors);
        if !(t.significance_level > 0.0 && t.significance_level < 1.0) {
            errors.push(format!(
                "trend.significance_level ({}) must be in (0, 1)",
                t.significance_level
            ));
        }

        if self.weather.timeout_secs == 0 {
            errors.push("weather.timeout_secs must be > 0".to_string());
        }
        let max_km = self.weather.soil_station_max_km;
        if !(max_km.is_finite() && max_km > 0.0) {
            errors.push(format!("weather.soil_station_max_km ({max_km}) must be > 0"));
        }

        let (range_errors, range_warnings) = super::validation::validate_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_escalation(weak: f64, moderate: f64, name: &str, errors: &mut Vec<String>) {
        // NaN/Inf comparisons silently pass, catch them explicitly
        if !weak.is_finite() || !moderate.is_finite() {
            errors.push(format!(
                "{name}: values must be finite (got weak_below={weak}, moderate_below={moderate})"
            ));
            return;
        }
        if weak <= 0.0 {
            errors.push(format!("{name}.weak_below ({weak:.3}) must be > 0"));
        }
        if moderate <= weak {
            errors.push(format!(
                "{name}: moderate_below ({moderate:.3}) must be > weak_below ({weak:.3})"
            ));
        }
    }

    fn check_months(months: &[u32], name: &str, errors: &mut Vec<String>) {
        if months.is_empty() {
            errors.push(format!("{name} must list at least one month"));
        }
        for m in months {
            if !(1..=12).contains(m) {
                errors.push(format!("{name}: month {m} is outside 1-12"));
            }
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Survey Info
// ============================================================================

/// Identification metadata, not used for logic but shown in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyInfo {
    #[serde(default = "default_survey_name")]
    pub name: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub address: String,
    /// Used for rainfall lookup when no location is given on the command line
    #[serde(default)]
    pub postcode: String,
}

fn default_survey_name() -> String {
    "Unnamed survey".to_string()
}

impl Default for SurveyInfo {
    fn default() -> Self {
        Self {
            name: default_survey_name(),
            client: String::new(),
            address: String::new(),
            postcode: String::new(),
        }
    }
}

// ============================================================================
// Alignment
// ============================================================================

/// What to do with rows sharing a timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep every row, original order within equal timestamps
    #[default]
    KeepAll,
    /// Collapse equal timestamps to the last row in input order
    KeepLast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Share of non-empty cells that must parse for a column to be the time axis.
    #[serde(default = "default_min_time_parse_ratio")]
    pub min_time_parse_ratio: f64,

    #[serde(default)]
    pub duplicate_timestamps: DuplicatePolicy,
}

fn default_min_time_parse_ratio() -> f64 { defaults::MIN_TIME_PARSE_RATIO }

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            min_time_parse_ratio: default_min_time_parse_ratio(),
            duplicate_timestamps: DuplicatePolicy::default(),
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// How an environmental series is mapped onto the sensor timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplePolicy {
    /// Value of the closest sample in time (step-like daily aggregates)
    #[default]
    Nearest,
    /// Linear interpolation between the bracketing samples
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub resample: ResamplePolicy,

    /// Value used where the environmental record is missing.
    #[serde(default = "default_missing_fill")]
    pub missing_fill: f64,
}

fn default_missing_fill() -> f64 { defaults::ENVIRONMENT_MISSING_FILL }

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            resample: ResamplePolicy::default(),
            missing_fill: default_missing_fill(),
        }
    }
}

// ============================================================================
// Decomposition
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionConfig {
    /// Centered moving-average window in samples (rows, not days).
    #[serde(default = "default_seasonal_window")]
    pub seasonal_window: usize,
}

fn default_seasonal_window() -> usize { defaults::SEASONAL_WINDOW_SAMPLES }

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            seasonal_window: default_seasonal_window(),
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Fewer defined points than this short-circuit to `none`/`insufficient`.
    #[serde(default = "default_min_defined_points")]
    pub min_defined_points: usize,

    /// Cumulative-rainfall correlation must fall below this for `seasonal`.
    #[serde(default = "default_rain_correlation_cutoff")]
    pub rain_correlation_cutoff: f64,

    #[serde(default = "default_summer_months")]
    pub summer_months: Vec<u32>,

    #[serde(default = "default_winter_months")]
    pub winter_months: Vec<u32>,
}

fn default_min_defined_points() -> usize { defaults::MIN_CLASSIFICATION_POINTS }
fn default_rain_correlation_cutoff() -> f64 { defaults::RAIN_CORRELATION_CUTOFF }
fn default_summer_months() -> Vec<u32> { defaults::SUMMER_MONTHS.to_vec() }
fn default_winter_months() -> Vec<u32> { defaults::WINTER_MONTHS.to_vec() }

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            min_defined_points: default_min_defined_points(),
            rain_correlation_cutoff: default_rain_correlation_cutoff(),
            summer_months: default_summer_months(),
            winter_months: default_winter_months(),
        }
    }
}

// ============================================================================
// Trend
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    #[serde(default = "default_weak_below")]
    pub weak_below: f64,

    #[serde(default = "default_moderate_below")]
    pub moderate_below: f64,

    /// p-value threshold for significance statements in reports.
    #[serde(default = "default_significance_level")]
    pub significance_level: f64,
}

fn default_weak_below() -> f64 { defaults::TREND_WEAK_BELOW }
fn default_moderate_below() -> f64 { defaults::TREND_MODERATE_BELOW }
fn default_significance_level() -> f64 { defaults::SIGNIFICANCE_LEVEL }

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            weak_below: default_weak_below(),
            moderate_below: default_moderate_below(),
            significance_level: default_significance_level(),
        }
    }
}

// ============================================================================
// Weather
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,

    #[serde(default = "default_archive_url")]
    pub archive_url: String,

    /// COSMOS-UK API root (soil moisture)
    #[serde(default = "default_soil_moisture_url")]
    pub soil_moisture_url: String,

    /// Furthest COSMOS-UK station accepted for a site (km)
    #[serde(default = "default_soil_station_max_km")]
    pub soil_station_max_km: f64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_geocoder_url() -> String { defaults::GEOCODER_URL.to_string() }
fn default_archive_url() -> String { defaults::PRECIPITATION_ARCHIVE_URL.to_string() }
fn default_soil_moisture_url() -> String { defaults::SOIL_MOISTURE_API_URL.to_string() }
fn default_soil_station_max_km() -> f64 { defaults::SOIL_STATION_MAX_KM }
fn default_timeout_secs() -> u64 { defaults::WEATHER_HTTP_TIMEOUT_SECS }

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            geocoder_url: default_geocoder_url(),
            archive_url: default_archive_url(),
            soil_moisture_url: default_soil_moisture_url(),
            soil_station_max_km: default_soil_station_max_km(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
