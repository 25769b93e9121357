//! Environmental Aligner - external covariate onto the sensor timeline
//!
//! Rainfall is a step-like daily aggregate, so the default policy copies the
//! nearest sample rather than interpolating. Targets outside the source
//! range take the nearest endpoint's value. For rainfall, missing results
//! are replaced by the configured fill (0.0: no record means no rain). Level
//! series such as soil moisture keep their gaps.

use tracing::{debug, warn};

use crate::config::{EnvironmentConfig, ResamplePolicy};
use crate::types::{EnvironmentalSeries, TimeSeries, Timestamp};

#[derive(Debug, Clone)]
pub struct EnvironmentalAligner {
    policy: ResamplePolicy,
    missing_fill: f64,
}

impl EnvironmentalAligner {
    pub fn new(config: &EnvironmentConfig) -> Self {
        Self {
            policy: config.resample,
            missing_fill: config.missing_fill,
        }
    }

    /// One value per `timeline` entry, gaps filled. Never fails.
    pub fn align(&self, env: &EnvironmentalSeries, timeline: &[Timestamp]) -> TimeSeries {
        let values = self
            .resample(env, timeline)
            .into_iter()
            .map(|v| Some(v.unwrap_or(self.missing_fill)))
            .collect();
        TimeSeries::constant(timeline, self.missing_fill).with_values(values)
    }

    /// One value per `timeline` entry; missing source values stay missing.
    pub fn align_level(&self, env: &EnvironmentalSeries, timeline: &[Timestamp]) -> TimeSeries {
        let values = self.resample(env, timeline);
        TimeSeries::constant(timeline, self.missing_fill).with_values(values)
    }

    fn resample(&self, env: &EnvironmentalSeries, timeline: &[Timestamp]) -> Vec<Option<f64>> {
        let source = &env.series;
        if source.is_empty() {
            warn!(series = %env.name, "Environmental series has no samples");
            return vec![None; timeline.len()];
        }

        let values = timeline
            .iter()
            .map(|t| match self.policy {
                ResamplePolicy::Nearest => nearest(source, *t),
                ResamplePolicy::Linear => linear(source, *t),
            })
            .collect();

        debug!(
            series = %env.name,
            policy = ?self.policy,
            targets = timeline.len(),
            samples = source.len(),
            "Environmental series aligned"
        );
        values
    }
}

/// Index of the first sample strictly after `t`.
fn upper_bound(source: &TimeSeries, t: Timestamp) -> usize {
    source.timestamps().partition_point(|s| *s <= t)
}

/// Value of the closest sample. Equal distance goes to the earlier sample.
fn nearest(source: &TimeSeries, t: Timestamp) -> Option<f64> {
    let ts = source.timestamps();
    let idx = upper_bound(source, t);
    let chosen = if idx == 0 {
        0
    } else if idx == ts.len() {
        ts.len() - 1
    } else {
        let before = t - ts[idx - 1];
        let after = ts[idx] - t;
        if after < before { idx } else { idx - 1 }
    };
    source.values()[chosen]
}

/// Linear interpolation between bracketing samples, clamped at the ends.
fn linear(source: &TimeSeries, t: Timestamp) -> Option<f64> {
    let ts = source.timestamps();
    let values = source.values();
    let idx = upper_bound(source, t);
    if idx == 0 {
        return values[0];
    }
    if idx == ts.len() {
        return values[ts.len() - 1];
    }
    let (t0, t1) = (ts[idx - 1], ts[idx]);
    if t == t0 {
        return values[idx - 1];
    }
    let (v0, v1) = (values[idx - 1]?, values[idx]?);
    let span = (t1 - t0).num_seconds() as f64;
    if span <= 0.0 {
        return Some(v0);
    }
    let frac = (t - t0).num_seconds() as f64 / span;
    Some(v0 + (v1 - v0) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn day(n: i64) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(n)
    }

    fn env(days: &[(i64, Option<f64>)]) -> EnvironmentalSeries {
        let series = TimeSeries::from_pairs(days.iter().map(|(d, v)| (day(*d), *v))).unwrap();
        EnvironmentalSeries::new("precipitation_mm", series)
    }

    fn aligner(policy: ResamplePolicy) -> EnvironmentalAligner {
        EnvironmentalAligner::new(&EnvironmentConfig {
            resample: policy,
            ..EnvironmentConfig::default()
        })
    }

    #[test]
    fn test_nearest_clamps_to_endpoints() {
        let source = env(&(5..=15).map(|d| (d, Some(d as f64))).collect::<Vec<_>>());
        let timeline: Vec<Timestamp> = (0..30).map(day).collect();
        let out = aligner(ResamplePolicy::Nearest).align(&source, &timeline);
        assert_eq!(out.len(), 30);
        assert_eq!(out.values()[0], Some(5.0));
        assert_eq!(out.values()[4], Some(5.0));
        assert_eq!(out.values()[10], Some(10.0));
        assert_eq!(out.values()[16], Some(15.0));
        assert_eq!(out.values()[29], Some(15.0));
    }

    #[test]
    fn test_nearest_tie_goes_to_earlier() {
        let source = env(&[(0, Some(1.0)), (2, Some(3.0))]);
        let out = aligner(ResamplePolicy::Nearest).align(&source, &[day(1)]);
        assert_eq!(out.values(), &[Some(1.0)]);
    }

    #[test]
    fn test_missing_source_value_filled() {
        let source = env(&[(0, None), (1, Some(4.0))]);
        let out = aligner(ResamplePolicy::Nearest).align(&source, &[day(0), day(1)]);
        assert_eq!(out.values(), &[Some(0.0), Some(4.0)]);
    }

    #[test]
    fn test_linear_interpolates_midday() {
        let source = env(&[(0, Some(0.0)), (1, Some(10.0))]);
        let noon = day(0) + Duration::hours(12);
        let out = aligner(ResamplePolicy::Linear).align(&source, &[noon, day(3)]);
        assert_eq!(out.values(), &[Some(5.0), Some(10.0)]);
    }

    #[test]
    fn test_level_alignment_keeps_gaps() {
        let source = env(&[(0, Some(30.0)), (1, None), (2, Some(32.0))]);
        let timeline: Vec<Timestamp> = (0..4).map(day).collect();
        let out = aligner(ResamplePolicy::Nearest).align_level(&source, &timeline);
        assert_eq!(out.values(), &[Some(30.0), None, Some(32.0), Some(32.0)]);
        let linear = aligner(ResamplePolicy::Linear)
            .align_level(&source, &[day(0) + Duration::hours(12)]);
        assert_eq!(linear.values(), &[None]);
    }

    #[test]
    fn test_empty_source_all_fill() {
        let source = EnvironmentalSeries::new("precipitation_mm", TimeSeries::from_pairs(vec![]).unwrap());
        let out = aligner(ResamplePolicy::Nearest).align(&source, &[day(0), day(1)]);
        assert_eq!(out.values(), &[Some(0.0), Some(0.0)]);
    }
}
