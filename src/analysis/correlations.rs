//! Statistical Correlation Engine
//!
//! Pearson correlation between two co-aligned series over their mutually
//! defined points, with a Student's t p-value from statrs.
//!
//! A correlation that cannot be computed (fewer than 2 shared points, or a
//! series with zero variance) is `None`, never 0.

use crate::types::{CorrelationResult, TimeSeries};

use super::stats::{has_spread, two_tailed_p};

/// Correlation analysis engine with statistical significance testing
pub struct CorrelationEngine;

impl CorrelationEngine {
    /// Pearson r over indices where both series are defined.
    pub fn pearson(a: &TimeSeries, b: &TimeSeries) -> Option<f64> {
        let (x, y) = Self::mutual_points(a, b);
        Self::pearson_slices(&x, &y)
    }

    /// Pearson r with p-value and sample count.
    pub fn calculate(a: &TimeSeries, b: &TimeSeries) -> Option<CorrelationResult> {
        let (x, y) = Self::mutual_points(a, b);
        let r = Self::pearson_slices(&x, &y)?;
        Some(CorrelationResult {
            r_value: r,
            r_squared: r * r,
            p_value: Self::p_value_for_r(r, x.len()),
            sample_count: x.len(),
        })
    }

    /// Movement rate (first difference of the sensor) against `env`.
    pub fn rate_correlation(sensor: &TimeSeries, env: &TimeSeries) -> Option<CorrelationResult> {
        Self::calculate(&sensor.difference(), env)
    }

    fn mutual_points(a: &TimeSeries, b: &TimeSeries) -> (Vec<f64>, Vec<f64>) {
        a.values()
            .iter()
            .zip(b.values())
            .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
            .unzip()
    }

    /// Formula: r = Σ[(xi - x̄)(yi - ȳ)] / sqrt(Σ(xi - x̄)² × Σ(yi - ȳ)²)
    pub fn pearson_slices(x: &[f64], y: &[f64]) -> Option<f64> {
        let n = x.len().min(y.len());
        if n < 2 || !has_spread(&x[..n]) || !has_spread(&y[..n]) {
            return None;
        }
        let mx = x[..n].iter().sum::<f64>() / n as f64;
        let my = y[..n].iter().sum::<f64>() / n as f64;

        let mut sxy = 0.0;
        let mut sxx = 0.0;
        let mut syy = 0.0;
        for (a, b) in x[..n].iter().zip(&y[..n]) {
            let (dx, dy) = (a - mx, b - my);
            sxy += dx * dy;
            sxx += dx * dx;
            syy += dy * dy;
        }

        let denominator = (sxx * syy).sqrt();
        if denominator == 0.0 || !denominator.is_finite() {
            return None;
        }
        Some((sxy / denominator).clamp(-1.0, 1.0))
    }

    /// Formula: t = r × sqrt(n-2) / sqrt(1-r²), two-tailed with n-2 degrees of freedom
    fn p_value_for_r(r: f64, n: usize) -> f64 {
        if n < 3 {
            return 1.0;
        }

        // Perfect or near-perfect correlation is highly significant
        if r.abs() >= 0.9999 {
            return 0.0;
        }

        let df = (n - 2) as f64;
        let t_stat = r * df.sqrt() / (1.0 - r * r).sqrt();
        two_tailed_p(t_stat, df)
    }
}
