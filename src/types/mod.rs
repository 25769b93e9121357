//! Shared data structures for structural movement analysis
//!
//! This module defines the core types flowing through the analysis pipeline:
//! - Stage 1: TimeSeries / AlignedDataset (time aligner output)
//! - Stage 2: EnvironmentalSeries (covariate at native sampling)
//! - Stage 3: DecomposedSignal (thermal / seasonal / progressive)
//! - Stage 4: ClassificationRecord, TrendAssessment, CorrelationResult
//! - Stage 5: AnalysisReport (per-sensor results handed to presentation)

mod series;
mod analysis;

pub use series::*;
pub use analysis::*;
