//! Alignment
//!
//! Two stages share the sensor timeline:
//!
//! - `TimeAligner`: raw table to `AlignedDataset` (time column detection,
//!   row filtering, stable ordering, numeric coercion)
//! - `EnvironmentalAligner`: resamples an external series (daily rainfall)
//!   onto that timeline

pub mod environmental;
pub mod time_aligner;

use thiserror::Error;

use crate::types::SeriesError;

pub use environmental::EnvironmentalAligner;
pub use time_aligner::{TimeAligner, TimeColumn};

#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error("No time column found ({columns_checked} columns checked); name one explicitly")]
    NoTimeColumnFound { columns_checked: usize },

    #[error("Time column '{0}' not present in the table")]
    TimeColumnMissing(String),

    #[error("Sensor column '{0}' not present in the table")]
    SensorColumnMissing(String),

    #[error("No rows left after dropping unparseable '{time_column}' values ({rows_read} rows read)")]
    EmptyAfterFiltering { time_column: String, rows_read: usize },

    #[error(transparent)]
    Series(#[from] SeriesError),
}
