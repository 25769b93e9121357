//! Analysis Configuration Module
//!
//! Provides per-session configuration loaded from TOML files. Every analysis
//! threshold (moving-average window, strength buckets, correlation cutoff)
//! is an operator-tunable value rather than an embedded constant.
//!
//! ## Loading Order
//!
//! 1. `MOVEMENT_CONFIG` environment variable (path to TOML file)
//! 2. `movement_config.toml` in the current working directory
//! 3. Built-in defaults (see `defaults`)
//!
//! ## Usage
//!
//! The config is an explicit value handed to each stage; there is no global.
//!
//! ```ignore
//! let config = AnalysisConfig::load();
//! let analyzer = MovementAnalyzer::new(&config);
//! ```

mod analysis_config;
pub mod defaults;
pub mod validation;

pub use analysis_config::*;
