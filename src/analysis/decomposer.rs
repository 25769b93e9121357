//! Signal Decomposer
//!
//! Splits a sensor series into three additive parts:
//!
//! - thermal: linear regression of the sensor on the environmental covariate,
//!   evaluated over the whole timeline (flat zero without a usable covariate)
//! - seasonal: centered moving average of `original - thermal`
//! - progressive: `original - thermal - (seasonal - mean(original - thermal))`
//!
//! The moving-average window counts rows, not days, so it assumes roughly
//! regular sampling.

use tracing::debug;

use crate::config::{defaults::MIN_THERMAL_PAIRS, DecompositionConfig};
use crate::types::{DecomposedSignal, ThermalStatus, TimeSeries};

use super::stats::{least_squares, mean};

#[derive(Debug, Clone)]
pub struct Decomposer {
    window: usize,
}

impl Decomposer {
    pub fn new(config: &DecompositionConfig) -> Self {
        Self {
            window: config.seasonal_window.max(1),
        }
    }

    /// Decompose `original`, optionally against an environmental series
    /// already aligned to the same timeline.
    pub fn decompose(
        &self,
        sensor_name: &str,
        original: &TimeSeries,
        environment: Option<&TimeSeries>,
    ) -> DecomposedSignal {
        let (thermal, thermal_status) = Self::thermal_component(original, environment);

        let residual = original.zip_with(&thermal, |o, t| o - t);
        let residual_mean = mean(&residual.defined_values());
        let seasonal = centered_moving_average(&residual, self.window);

        let progressive = match residual_mean {
            Some(m) => residual.zip_with(&seasonal, |r, s| r - (s - m)),
            None => original.with_values(vec![None; original.len()]),
        };

        debug!(
            sensor = sensor_name,
            thermal = ?thermal_status,
            window = self.window,
            "Sensor decomposed"
        );

        DecomposedSignal {
            sensor_name: sensor_name.to_string(),
            original: original.clone(),
            thermal,
            seasonal,
            progressive,
            thermal_status,
            residual_mean,
        }
    }

    fn thermal_component(
        original: &TimeSeries,
        environment: Option<&TimeSeries>,
    ) -> (TimeSeries, ThermalStatus) {
        let zeros = TimeSeries::constant(original.timestamps(), 0.0);

        let Some(env) = environment else {
            return (zeros, ThermalStatus::NoCovariate);
        };

        let (xs, ys): (Vec<f64>, Vec<f64>) = env
            .values()
            .iter()
            .zip(original.values())
            .filter_map(|(e, o)| Some(((*e)?, (*o)?)))
            .unzip();

        let fit = if xs.len() < MIN_THERMAL_PAIRS {
            None
        } else {
            least_squares(&xs, &ys)
        };

        match fit {
            Some(fit) => {
                let values = env
                    .values()
                    .iter()
                    .take(original.len())
                    .map(|e| e.map(|x| fit.evaluate(x)))
                    .chain(std::iter::repeat(None))
                    .take(original.len())
                    .collect();
                (original.with_values(values), ThermalStatus::Fitted(fit))
            }
            None => (
                zeros,
                ThermalStatus::InsufficientCoverage {
                    paired_points: xs.len(),
                },
            ),
        }
    }
}

/// Centered moving average over `window` rows, skipping missing cells.
///
/// An even window sits one row further left than right. Near either end the
/// window shrinks symmetrically, down to the single row at each edge. A
/// window with no defined values yields a missing result.
pub fn centered_moving_average(series: &TimeSeries, window: usize) -> TimeSeries {
    let window = window.max(1);
    let half_left = window / 2;
    let half_right = window - 1 - half_left;
    let values = series.values();
    let n = values.len();

    let averaged = (0..n)
        .map(|i| {
            let edge = i.min(n - 1 - i);
            let lo = i - half_left.min(edge);
            let hi = i + half_right.min(edge);
            let defined: Vec<f64> = values[lo..=hi].iter().flatten().copied().collect();
            mean(&defined)
        })
        .collect();
    series.with_values(averaged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(values: &[Option<f64>]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TimeSeries::from_pairs(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (start + Duration::days(i as i64), *v)),
        )
        .unwrap()
    }

    fn ramp(n: usize) -> TimeSeries {
        series(&(0..n).map(|i| Some(i as f64)).collect::<Vec<_>>())
    }

    fn decomposer(window: usize) -> Decomposer {
        Decomposer::new(&DecompositionConfig { seasonal_window: window })
    }

    #[test]
    fn test_moving_average_edges_shrink_to_one() {
        let s = ramp(10);
        let avg = centered_moving_average(&s, 30);
        // the edges see only themselves
        assert_eq!(avg.values()[0], Some(0.0));
        assert_eq!(avg.values()[9], Some(9.0));
        // second row: window 0..=2
        assert_eq!(avg.values()[1], Some(1.0));
    }

    #[test]
    fn test_moving_average_even_window_offset() {
        let s = ramp(10);
        // window 4 at row 5: rows 3..=6
        let avg = centered_moving_average(&s, 4);
        assert_eq!(avg.values()[5], Some(4.5));
    }

    #[test]
    fn test_moving_average_skips_missing() {
        let s = series(&[Some(1.0), None, Some(3.0), None, None]);
        let avg = centered_moving_average(&s, 3);
        assert_eq!(avg.values()[1], Some(2.0));
        assert_eq!(avg.values()[4], None);
    }

    #[test]
    fn test_no_covariate_thermal_is_zero() {
        let d = decomposer(30).decompose("Crack 1", &ramp(10), None);
        assert_eq!(d.thermal_status, ThermalStatus::NoCovariate);
        assert!(d.thermal.values().iter().all(|v| *v == Some(0.0)));
    }

    #[test]
    fn test_additivity_without_covariate() {
        let s = series(&[Some(0.2), Some(0.5), None, Some(0.4), Some(0.9), Some(1.1)]);
        let d = decomposer(3).decompose("Crack 1", &s, None);
        let m = d.residual_mean.unwrap();
        for i in 0..s.len() {
            if let Some(o) = s.values()[i] {
                let p = d.progressive.values()[i].unwrap();
                let se = d.seasonal.values()[i].unwrap();
                assert!((p + se - (o + m)).abs() < 1e-12);
            } else {
                assert_eq!(d.progressive.values()[i], None);
            }
        }
    }

    #[test]
    fn test_thermal_fit_evaluated_everywhere() {
        // sensor = 2 * env + 1 where sensor is defined
        let env = series(&[Some(0.0), Some(1.0), Some(2.0), Some(3.0)]);
        let s = series(&[Some(1.0), None, Some(5.0), Some(7.0)]);
        let d = decomposer(30).decompose("Gauge", &s, Some(&env));
        assert!(matches!(d.thermal_status, ThermalStatus::Fitted(f) if (f.slope - 2.0).abs() < 1e-12));
        let t1 = d.thermal.values()[1].unwrap();
        assert!((t1 - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_insufficient_coverage_falls_back_to_zero() {
        let env = series(&[Some(1.0), None, None]);
        let s = series(&[Some(1.0), Some(2.0), Some(3.0)]);
        let d = decomposer(30).decompose("Gauge", &s, Some(&env));
        assert_eq!(
            d.thermal_status,
            ThermalStatus::InsufficientCoverage { paired_points: 1 }
        );
        assert!(d.thermal.values().iter().all(|v| *v == Some(0.0)));
    }

    #[test]
    fn test_flat_covariate_is_insufficient() {
        let env = series(&[Some(0.0); 4]);
        let d = decomposer(30).decompose("Gauge", &ramp(4), Some(&env));
        assert!(matches!(d.thermal_status, ThermalStatus::InsufficientCoverage { .. }));
    }

    #[test]
    fn test_all_missing_sensor() {
        let s = series(&[None, None, None]);
        let d = decomposer(30).decompose("Dead", &s, None);
        assert_eq!(d.residual_mean, None);
        assert!(d.progressive.values().iter().all(Option::is_none));
    }
}
