//! Trend strength: OLS slope against row index, normalised by the series'
//! standard deviation.
//!
//! Row index stands in for elapsed time, so irregular sampling distorts the
//! slope. Reports carry the slope per sample for that reason.

use crate::config::TrendConfig;
use crate::types::{Strength, TimeSeries, TrendAssessment};

use super::stats::{has_spread, least_squares, slope_p_value, std_dev};

#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: &TrendConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn assess(&self, series: &TimeSeries) -> TrendAssessment {
        let (xs, ys): (Vec<f64>, Vec<f64>) = series
            .defined_indexed()
            .into_iter()
            .map(|(i, v)| (i as f64, v))
            .unzip();

        let Some(fit) = least_squares(&xs, &ys) else {
            return self.assessment(0.0, None, Strength::Insufficient, None, ys.len());
        };

        // Constant readings: the fitted slope is rounding noise
        if !has_spread(&ys) {
            let p_value = (ys.len() >= 3).then_some(1.0);
            return self.assessment(0.0, None, Strength::Weak, p_value, ys.len());
        }

        let normalized_slope = std_dev(&ys)
            .filter(|s| *s > 0.0)
            .map(|s| fit.slope / s);

        self.assessment(
            fit.slope,
            normalized_slope,
            self.bucket(normalized_slope),
            slope_p_value(&xs, &ys, &fit),
            fit.sample_count,
        )
    }

    fn assessment(
        &self,
        slope_per_sample: f64,
        normalized_slope: Option<f64>,
        strength: Strength,
        p_value: Option<f64>,
        sample_count: usize,
    ) -> TrendAssessment {
        let significance_level = self.config.significance_level;
        TrendAssessment {
            slope_per_sample,
            normalized_slope,
            strength,
            p_value,
            sample_count,
            significance_level,
            significant: p_value.is_some_and(|p| p < significance_level),
        }
    }

    /// Strength bucket for a normalised slope. A flat series is weak.
    pub fn bucket(&self, normalized_slope: Option<f64>) -> Strength {
        let magnitude = normalized_slope.map_or(0.0, f64::abs);
        if magnitude < self.config.weak_below {
            Strength::Weak
        } else if magnitude < self.config.moderate_below {
            Strength::Moderate
        } else {
            Strength::Strong
        }
    }
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

    fn analyzer() -> TrendAnalyzer {
        TrendAnalyzer::new(&TrendConfig::default())
    }

    #[test]
    fn test_bucket_boundaries() {
        let a = analyzer();
        assert_eq!(a.bucket(Some(0.29)), Strength::Weak);
        assert_eq!(a.bucket(Some(0.3)), Strength::Moderate);
        assert_eq!(a.bucket(Some(-0.59)), Strength::Moderate);
        assert_eq!(a.bucket(Some(0.6)), Strength::Strong);
        assert_eq!(a.bucket(None), Strength::Weak);
    }

    #[test]
    fn test_ramp_slope_and_significance() {
        let ramp: Vec<Option<f64>> = (0..10).map(|i| Some(f64::from(i))).collect();
        let t = analyzer().assess(&series(&ramp));
        assert!((t.slope_per_sample - 1.0).abs() < 1e-12);
        // 1 / 2.872
        assert!((t.normalized_slope.unwrap() - 0.3482).abs() < 1e-3);
        assert_eq!(t.strength, Strength::Moderate);
        assert!(t.significant);
        assert_eq!(t.significance_level, 0.05);
    }

    #[test]
    fn test_flat_series_is_weak() {
        let t = analyzer().assess(&series(&[Some(5.0); 10]));
        assert_eq!(t.slope_per_sample, 0.0);
        assert_eq!(t.normalized_slope, None);
        assert_eq!(t.strength, Strength::Weak);
    }

    #[test]
    fn test_constant_inexact_decimal_is_flat() {
        for c in [0.1, 0.3, 1.7, 0.05] {
            let t = analyzer().assess(&series(&[Some(c); 12]));
            assert_eq!(t.slope_per_sample, 0.0, "c = {c}");
            assert_eq!(t.normalized_slope, None, "c = {c}");
            assert_eq!(t.strength, Strength::Weak);
            assert_eq!(t.p_value, Some(1.0));
            assert!(!t.significant);
        }
    }

    #[test]
    fn test_significance_follows_configured_level() {
        // noisy upward drift
        let values: Vec<Option<f64>> = [0.0, 2.0, -1.0, 3.0, 1.0, 4.0, 2.0, 5.0, 1.5, 3.5]
            .into_iter()
            .map(Some)
            .collect();
        let loose = analyzer().assess(&series(&values));
        let p = loose.p_value.unwrap();
        let strict = TrendAnalyzer::new(&TrendConfig {
            significance_level: p / 2.0,
            ..TrendConfig::default()
        })
        .assess(&series(&values));
        let lenient = TrendAnalyzer::new(&TrendConfig {
            significance_level: (p * 2.0).min(0.99),
            ..TrendConfig::default()
        })
        .assess(&series(&values));
        assert!(!strict.significant);
        assert!(lenient.significant);
        assert_eq!(strict.p_value, lenient.p_value);
    }

    #[test]
    fn test_slope_uses_row_position_across_gaps() {
        let t = analyzer().assess(&series(&[Some(0.0), None, None, Some(3.0)]));
        assert!((t.slope_per_sample - 1.0).abs() < 1e-12);
        assert_eq!(t.sample_count, 2);
        assert_eq!(t.p_value, None);
        assert!(!t.significant);
    }

    #[test]
    fn test_single_point_insufficient() {
        let t = analyzer().assess(&series(&[Some(1.0), None]));
        assert_eq!(t.strength, Strength::Insufficient);
    }
}
