//! Movement Analyser: structural crack and displacement monitoring
//!
//! Turns irregular multi-sensor survey exports into per-sensor thermal,
//! seasonal and progressive components, then classifies each sensor's
//! movement and relates it to rainfall and soil moisture.
//!
//! ## Architecture
//!
//! - **Ingest**: delimited text to a typed `RawTable`
//! - **Alignment**: time column detection, ordering, environmental resampling
//! - **Analysis**: decomposition, classification, trend and correlation
//! - **Weather**: postcode geocoding, daily precipitation and soil moisture sources
//! - **Report**: markdown narrative and JSON export

pub mod alignment;
pub mod analysis;
pub mod config;
pub mod ingest;
pub mod report;
pub mod types;
pub mod weather;

// Re-export configuration
pub use config::{AnalysisConfig, ConfigError};

// Re-export commonly used types
pub use types::{
    AlignedDataset, AnalysisReport, ClassificationRecord, DecomposedSignal, EnvironmentalSeries,
    MovementType, SensorAnalysis, Strength, TimeSeries, Timestamp,
};

// Re-export pipeline stages
pub use alignment::{AlignmentError, EnvironmentalAligner, TimeAligner, TimeColumn};
pub use analysis::{Classifier, CorrelationEngine, Decomposer, MovementAnalyzer, TrendAnalyzer};
pub use ingest::{IngestError, RawTable};
