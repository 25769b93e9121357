//! Analysis output types: DecomposedSignal, ClassificationRecord, AnalysisReport

use serde::{Deserialize, Serialize};

use super::{EnvironmentalSeries, TimeSeries, Timestamp};

/// Dominant movement pattern of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Net drift exceeding the series' own scatter
    Progressive,
    /// Moisture-driven shrink/swell cycle
    Seasonal,
    None,
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Progressive => write!(f, "Progressive"),
            Self::Seasonal => write!(f, "Seasonal"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Qualitative strength bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Weak,
    Moderate,
    Strong,
    /// Too little data to rate
    Insufficient,
}

impl std::fmt::Display for Strength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weak => write!(f, "Weak"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Strong => write!(f, "Strong"),
            Self::Insufficient => write!(f, "Insufficient data"),
        }
    }
}

// ============================================================================
// Decomposition
// ============================================================================

/// Ordinary least squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Points the line was fitted on
    pub sample_count: usize,
}

impl LinearFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// How the thermal component was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ThermalStatus {
    /// Regression on the environmental covariate
    Fitted(LinearFit),
    /// No environmental series was supplied
    NoCovariate,
    /// Fewer than 2 paired points (or a flat covariate); thermal is flat zero
    InsufficientCoverage { paired_points: usize },
}

/// Thermal / seasonal / progressive split of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecomposedSignal {
    pub sensor_name: String,
    pub original: TimeSeries,
    pub thermal: TimeSeries,
    pub seasonal: TimeSeries,
    pub progressive: TimeSeries,
    pub thermal_status: ThermalStatus,
    /// Mean of `original - thermal`, used to re-centre the seasonal estimate
    pub residual_mean: Option<f64>,
}

// ============================================================================
// Correlation & Trend
// ============================================================================

/// Pearson correlation with its significance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub r_value: f64,
    pub r_squared: f64,
    /// Two-tailed p-value (Student's t, n-2 degrees of freedom)
    pub p_value: f64,
    pub sample_count: usize,
}

/// Slope of the series against row index, normalised by its spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendAssessment {
    /// Units per sample (row), not per day
    pub slope_per_sample: f64,
    pub normalized_slope: Option<f64>,
    pub strength: Strength,
    /// Two-tailed p-value of the slope; `None` with fewer than 3 points
    pub p_value: Option<f64>,
    pub sample_count: usize,
    /// Threshold `significant` was judged against
    pub significance_level: f64,
    /// `p_value < significance_level`; false when no p-value exists
    pub significant: bool,
}

// ============================================================================
// Classification
// ============================================================================

/// Statistics the classification was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEvidence {
    pub defined_points: usize,
    pub std_dev: Option<f64>,
    /// `last - first` over defined values
    pub net_change: Option<f64>,
    /// Summer mean minus winter mean
    pub seasonal_differential: Option<f64>,
    /// Name of the rule that produced the outcome
    pub rule: String,
    pub trend: Option<TrendAssessment>,
}

/// Movement classification of one sensor. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub sensor_name: String,
    pub movement_type: MovementType,
    pub strength: Strength,
    pub supporting_note: String,
    /// Pearson r against cumulative rainfall; `None` when not computable
    pub rain_correlation: Option<f64>,
    pub evidence: ClassificationEvidence,
}

impl ClassificationRecord {
    /// Rain correlation rounded to 2 decimal places, or "n/a".
    pub fn rain_correlation_display(&self) -> String {
        self.rain_correlation
            .map_or_else(|| "n/a".to_string(), |r| format!("{r:.2}"))
    }
}

// ============================================================================
// Report
// ============================================================================

/// Everything computed for one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorAnalysis {
    pub sensor_name: String,
    pub decomposition: DecomposedSignal,
    pub classification: ClassificationRecord,
    pub trend: TrendAssessment,
    /// Movement rate (first difference) against aligned rainfall
    pub rate_correlation: Option<CorrelationResult>,
}

/// A sensor that could not be analysed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorFailure {
    pub sensor_name: String,
    pub reason: String,
}

/// Result of one analysis run over a whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub timeline: Vec<Timestamp>,
    /// Rainfall resampled onto the timeline
    pub environment: Option<TimeSeries>,
    pub cumulative_rainfall: Option<TimeSeries>,
    /// Series the thermal component was regressed on, resampled onto the
    /// timeline: soil moisture when supplied, else rainfall
    pub thermal_covariate: Option<EnvironmentalSeries>,
    pub sensors: Vec<SensorAnalysis>,
    pub failures: Vec<SensorFailure>,
}

impl AnalysisReport {
    pub fn sensor(&self, name: &str) -> Option<&SensorAnalysis> {
        self.sensors.iter().find(|s| s.sensor_name == name)
    }

    pub fn has_environment(&self) -> bool {
        self.environment.is_some()
    }
}
