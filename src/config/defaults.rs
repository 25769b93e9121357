//! System-wide default constants.
//!
//! Centralises the numbers behind every `AnalysisConfig` default.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Configuration Loading
// ============================================================================

/// Environment variable holding an explicit config path.
pub const CONFIG_ENV_VAR: &str = "MOVEMENT_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "movement_config.toml";

// ============================================================================
// Alignment
// ============================================================================

/// A column is a time column when more than this share of its non-empty
/// cells parse as date/times.
pub const MIN_TIME_PARSE_RATIO: f64 = 0.5;

/// Value assigned where no environmental record exists (no rain recorded).
pub const ENVIRONMENT_MISSING_FILL: f64 = 0.0;

// ============================================================================
// Decomposition
// ============================================================================

/// Centered moving-average window for the seasonal component (samples).
pub const SEASONAL_WINDOW_SAMPLES: usize = 30;

/// Minimum paired sensor/covariate points for the thermal regression.
pub const MIN_THERMAL_PAIRS: usize = 2;

// ============================================================================
// Classification
// ============================================================================

/// Below this many defined points a sensor is rated `insufficient`.
pub const MIN_CLASSIFICATION_POINTS: usize = 5;

/// Cumulative-rainfall correlation below which movement is moisture-driven.
pub const RAIN_CORRELATION_CUTOFF: f64 = -0.3;

/// Northern-hemisphere summer months (Jun, Jul, Aug).
pub const SUMMER_MONTHS: [u32; 3] = [6, 7, 8];

/// Northern-hemisphere winter months (Dec, Jan, Feb).
pub const WINTER_MONTHS: [u32; 3] = [12, 1, 2];

// ============================================================================
// Trend Strength
// ============================================================================

/// |normalised slope| below this is `weak`.
pub const TREND_WEAK_BELOW: f64 = 0.3;

/// |normalised slope| below this (and not weak) is `moderate`.
pub const TREND_MODERATE_BELOW: f64 = 0.6;

/// p-value threshold for calling a slope or correlation significant.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

// ============================================================================
// Weather Collaborators
// ============================================================================

/// UK postcode lookup service.
pub const GEOCODER_URL: &str = "https://api.postcodes.io";

/// Open-Meteo historical archive endpoint.
pub const PRECIPITATION_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// COSMOS-UK soil moisture API (OGC EDR).
pub const SOIL_MOISTURE_API_URL: &str = "https://cosmos-api.ceh.ac.uk";

/// A COSMOS-UK station further than this from the site is not representative (km).
pub const SOIL_STATION_MAX_KM: f64 = 40.0;

/// HTTP timeout for weather and geocoding requests (seconds).
pub const WEATHER_HTTP_TIMEOUT_SECS: u64 = 20;
