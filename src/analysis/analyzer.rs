//! Movement Analyzer
//!
//! Main orchestrator that, for one aligned dataset:
//! 1. Resamples rainfall and the optional thermal covariate onto the sensor
//!    timeline
//! 2. Builds cumulative rainfall from the aligned rainfall
//! 3. Decomposes, trends and classifies every sensor in parallel
//! 4. Correlates movement rate against rainfall
//!
//! The thermal component regresses on soil moisture when it is supplied and
//! on rainfall otherwise. Rainfall alone drives the cumulative correlation
//! rule and the rate correlation.
//!
//! Sensors are independent: one sensor's failure is recorded and the rest
//! still complete. Output order follows the dataset's sensor order.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::alignment::EnvironmentalAligner;
use crate::config::AnalysisConfig;
use crate::types::{
    AlignedDataset, AnalysisReport, EnvironmentalSeries, SensorAnalysis, SensorFailure,
    SensorSeries, TimeSeries,
};

use super::{
    classifier::Classifier, correlations::CorrelationEngine, decomposer::Decomposer,
    trend::TrendAnalyzer,
};

#[derive(Debug, Clone)]
pub struct MovementAnalyzer {
    environment: EnvironmentalAligner,
    decomposer: Decomposer,
    classifier: Classifier,
    trend: TrendAnalyzer,
}

impl MovementAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            environment: EnvironmentalAligner::new(&config.environment),
            decomposer: Decomposer::new(&config.decomposition),
            classifier: Classifier::new(&config.classification),
            trend: TrendAnalyzer::new(&config.trend),
        }
    }

    /// Run the full pipeline with rainfall as the only environmental
    /// series.
    pub fn analyze(
        &self,
        dataset: &AlignedDataset,
        rainfall: Option<&EnvironmentalSeries>,
    ) -> AnalysisReport {
        self.analyze_with_covariate(dataset, rainfall, None)
    }

    /// Run the full pipeline. `covariate` replaces rainfall as the thermal
    /// regressor. An absent or empty series skips every step that depends
    /// on it.
    pub fn analyze_with_covariate(
        &self,
        dataset: &AlignedDataset,
        rainfall: Option<&EnvironmentalSeries>,
        covariate: Option<&EnvironmentalSeries>,
    ) -> AnalysisReport {
        let aligned_rain = self.align_usable(rainfall, dataset, true);
        let cumulative = aligned_rain.as_ref().map(|r| r.series.cumulative_sum());
        let thermal_covariate = self
            .align_usable(covariate, dataset, false)
            .or_else(|| aligned_rain.clone());
        let aligned_env = aligned_rain.map(|r| r.series);

        let results: Vec<Result<SensorAnalysis, SensorFailure>> = dataset
            .sensors()
            .par_iter()
            .map(|sensor| {
                self.analyze_sensor(
                    sensor,
                    aligned_env.as_ref(),
                    cumulative.as_ref(),
                    thermal_covariate.as_ref().map(|c| &c.series),
                )
            })
            .collect();

        let mut sensors = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(analysis) => sensors.push(analysis),
                Err(failure) => {
                    warn!(sensor = %failure.sensor_name, reason = %failure.reason, "Sensor skipped");
                    failures.push(failure);
                }
            }
        }

        info!(
            rows = dataset.row_count(),
            analysed = sensors.len(),
            failed = failures.len(),
            environment = aligned_env.is_some(),
            thermal_covariate = thermal_covariate.as_ref().map_or("none", |c| c.name.as_str()),
            "Analysis complete"
        );

        AnalysisReport {
            timeline: dataset.timeline().to_vec(),
            environment: aligned_env,
            cumulative_rainfall: cumulative,
            thermal_covariate,
            sensors,
            failures,
        }
    }

    /// Resample onto the dataset timeline, or `None` when absent or empty.
    /// `fill_gaps` applies the configured missing fill (rainfall only).
    fn align_usable(
        &self,
        series: Option<&EnvironmentalSeries>,
        dataset: &AlignedDataset,
        fill_gaps: bool,
    ) -> Option<EnvironmentalSeries> {
        match series {
            Some(env) if env.is_empty() => {
                warn!(series = %env.name, "Environmental series empty; continuing without it");
                None
            }
            Some(env) => {
                let aligned = if fill_gaps {
                    self.environment.align(env, dataset.timeline())
                } else {
                    self.environment.align_level(env, dataset.timeline())
                };
                Some(EnvironmentalSeries::new(env.name.clone(), aligned))
            }
            None => None,
        }
    }

    fn analyze_sensor(
        &self,
        sensor: &SensorSeries,
        rainfall: Option<&TimeSeries>,
        cumulative: Option<&TimeSeries>,
        thermal_covariate: Option<&TimeSeries>,
    ) -> Result<SensorAnalysis, SensorFailure> {
        if sensor.series.defined_count() == 0 {
            return Err(SensorFailure {
                sensor_name: sensor.name.clone(),
                reason: "no numeric readings".to_string(),
            });
        }

        let decomposition = self
            .decomposer
            .decompose(&sensor.name, &sensor.series, thermal_covariate);
        let trend = self.trend.assess(&sensor.series);
        let classification = self.classifier.classify(&decomposition, cumulative, Some(&trend));
        let rate_correlation =
            rainfall.and_then(|rain| CorrelationEngine::rate_correlation(&sensor.series, rain));

        info!(
            sensor = %sensor.name,
            movement = %classification.movement_type,
            strength = %classification.strength,
            rain_r = %classification.rain_correlation_display(),
            "Sensor classified"
        );

        Ok(SensorAnalysis {
            sensor_name: sensor.name.clone(),
            decomposition,
            classification,
            trend,
            rate_correlation,
        })
    }
}
