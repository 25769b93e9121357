//! Report output: markdown narrative and JSON chart payload

pub mod export;
pub mod narrative;

pub use export::{EnvironmentExport, ReportExport, SensorExport};
pub use narrative::generate_narrative;
