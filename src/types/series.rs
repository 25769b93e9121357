//! Time-indexed series types: TimeSeries, AlignedDataset, EnvironmentalSeries

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timestamps are wall-clock survey readings; no timezone is carried.
pub type Timestamp = NaiveDateTime;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("Length mismatch: {timestamps} timestamps but {values} values")]
    LengthMismatch { timestamps: usize, values: usize },

    #[error("Timestamps out of order at index {index}")]
    Unordered { index: usize },
}

/// Ordered (timestamp, value) pairs with independently missing values.
///
/// Timestamps are non-decreasing. Every transform returns a new series; a
/// `TimeSeries` is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    timestamps: Vec<Timestamp>,
    values: Vec<Option<f64>>,
}

impl TimeSeries {
    /// Build a series, rejecting mismatched lengths and decreasing timestamps.
    ///
    /// Non-finite values are stored as missing.
    pub fn new(timestamps: Vec<Timestamp>, values: Vec<Option<f64>>) -> Result<Self, SeriesError> {
        if timestamps.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                timestamps: timestamps.len(),
                values: values.len(),
            });
        }
        if let Some(index) = timestamps.windows(2).position(|w| w[1] < w[0]) {
            return Err(SeriesError::Unordered { index: index + 1 });
        }
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        Ok(Self { timestamps, values })
    }

    /// Build from (timestamp, value) pairs that are already in order.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (Timestamp, Option<f64>)>,
    ) -> Result<Self, SeriesError> {
        let (timestamps, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self::new(timestamps, values)
    }

    /// Same timeline, new values. Used by stages deriving a component series.
    pub(crate) fn with_values(&self, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(values.len(), self.timestamps.len());
        Self {
            timestamps: self.timestamps.clone(),
            values: values
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect(),
        }
    }

    /// Series of `value` at every timestamp of `timeline`.
    pub fn constant(timeline: &[Timestamp], value: f64) -> Self {
        Self {
            timestamps: timeline.to_vec(),
            values: vec![Some(value); timeline.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<(Timestamp, Option<f64>)> {
        Some((*self.timestamps.get(index)?, *self.values.get(index)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, Option<f64>)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }

    /// Defined values only, in order.
    pub fn defined_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(|v| *v).collect()
    }

    /// Defined values with their row index.
    pub fn defined_indexed(&self) -> Vec<(usize, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|x| (i, x)))
            .collect()
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn first_defined(&self) -> Option<(Timestamp, f64)> {
        self.iter().find_map(|(t, v)| v.map(|x| (t, x)))
    }

    pub fn last_defined(&self) -> Option<(Timestamp, f64)> {
        self.timestamps
            .iter()
            .zip(self.values.iter())
            .rev()
            .find_map(|(t, v)| v.map(|x| (*t, x)))
    }

    /// Apply `f` to every defined value; missing stays missing.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        self.with_values(self.values.iter().map(|v| v.map(&f)).collect())
    }

    /// Combine two co-indexed series element-wise; missing on either side
    /// yields missing.
    ///
    /// Both series must share the same length. Extra elements of the longer
    /// series are ignored.
    pub fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        let values = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => Some(f(*a, *b)),
                _ => None,
            })
            .collect();
        Self {
            timestamps: self.timestamps[..self.len().min(other.len())].to_vec(),
            values,
        }
    }

    /// Running sum. Missing cells contribute nothing but still carry the
    /// running total.
    pub fn cumulative_sum(&self) -> Self {
        let mut total = 0.0;
        let values = self
            .values
            .iter()
            .map(|v| {
                total += v.unwrap_or(0.0);
                Some(total)
            })
            .collect();
        self.with_values(values)
    }

    /// First difference `x[i] - x[i-1]`; the first element is missing.
    pub fn difference(&self) -> Self {
        let mut values = Vec::with_capacity(self.len());
        if !self.values.is_empty() {
            values.push(None);
        }
        for w in self.values.windows(2) {
            values.push(match (w[0], w[1]) {
                (Some(a), Some(b)) => Some(b - a),
                _ => None,
            });
        }
        self.with_values(values)
    }
}

// ============================================================================
// Aligned Dataset
// ============================================================================

/// One sensor column on the shared timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSeries {
    pub name: String,
    pub series: TimeSeries,
}

/// Canonical timeline plus every sensor's series on exactly that timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedDataset {
    timeline: Vec<Timestamp>,
    sensors: Vec<SensorSeries>,
}

impl AlignedDataset {
    /// Assemble a dataset. Every column must have one value per timeline entry.
    pub fn new(
        timeline: Vec<Timestamp>,
        columns: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self, SeriesError> {
        let mut sensors = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            let series = TimeSeries::new(timeline.clone(), values)?;
            sensors.push(SensorSeries { name, series });
        }
        // validates ordering even with zero sensor columns
        TimeSeries::new(timeline.clone(), vec![None; timeline.len()])?;
        Ok(Self { timeline, sensors })
    }

    pub fn timeline(&self) -> &[Timestamp] {
        &self.timeline
    }

    pub fn row_count(&self) -> usize {
        self.timeline.len()
    }

    pub fn sensors(&self) -> &[SensorSeries] {
        &self.sensors
    }

    pub fn sensor_names(&self) -> Vec<&str> {
        self.sensors.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sensor(&self, name: &str) -> Option<&TimeSeries> {
        self.sensors.iter().find(|s| s.name == name).map(|s| &s.series)
    }

    /// First and last timestamp, if any rows survived.
    pub fn time_range(&self) -> Option<(Timestamp, Timestamp)> {
        Some((*self.timeline.first()?, *self.timeline.last()?))
    }
}

// ============================================================================
// Environmental Series
// ============================================================================

/// External covariate at its native sampling (daily precipitation or soil moisture).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalSeries {
    /// Quantity name, e.g. `precipitation_mm`.
    pub name: String,
    pub series: TimeSeries,
}

impl EnvironmentalSeries {
    pub fn new(name: impl Into<String>, series: TimeSeries) -> Self {
        Self {
            name: name.into(),
            series,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.defined_count() == 0
    }
}
