//! Movement Analysis Engine
//!
//! Decomposition, classification and correlation of aligned sensor series.
//!
//! ## Architecture
//! - `stats`: mean, population std, least squares, Student's t p-values (statrs)
//! - `correlations`: Pearson correlation over mutually defined points
//! - `decomposer`: thermal / seasonal / progressive split
//! - `trend`: OLS slope strength buckets
//! - `classifier`: ordered movement-type rules
//! - `analyzer`: per-dataset orchestrator, sensors fanned out with rayon

pub mod analyzer;
pub mod classifier;
pub mod correlations;
pub mod decomposer;
pub mod stats;
pub mod trend;

pub use analyzer::MovementAnalyzer;
pub use classifier::{default_rules, ClassificationRule, Classifier, RuleContext, RuleOutcome};
pub use correlations::CorrelationEngine;
pub use decomposer::{centered_moving_average, Decomposer};
pub use trend::TrendAnalyzer;
