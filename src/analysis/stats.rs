//! Descriptive statistics and least squares over defined values

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::types::LinearFit;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// True when at least two values differ.
///
/// Exact comparison: a constant series of an inexact decimal (0.1, 1.7)
/// leaves rounding noise in any mean-centred sum, so a computed variance is
/// never a reliable zero test.
pub fn has_spread(values: &[f64]) -> bool {
    values
        .split_first()
        .is_some_and(|(first, rest)| rest.iter().any(|v| v != first))
}

/// Population standard deviation (divides by n). Exactly 0 for a constant
/// series.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if !has_spread(values) {
        return Some(0.0);
    }
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Ordinary least squares `y = slope * x + intercept`.
///
/// `None` with fewer than 2 points or when `x` has no spread.
pub fn least_squares(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    if !has_spread(xs) {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: my - slope * mx,
        sample_count: n,
    })
}

/// Two-tailed p-value of a fitted slope (H0: slope = 0), n-2 degrees of freedom.
///
/// `None` with fewer than 3 points.
pub fn slope_p_value(xs: &[f64], ys: &[f64], fit: &LinearFit) -> Option<f64> {
    let n = fit.sample_count;
    if n < 3 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mx = mean(xs)?;
    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    let sse: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - fit.evaluate(*x)).powi(2))
        .sum();
    let df = (n - 2) as f64;
    let se = (sse / df).sqrt() / sxx.sqrt();

    // Exact fit
    if se == 0.0 || !se.is_finite() {
        return Some(if fit.slope == 0.0 { 1.0 } else { 0.0 });
    }
    Some(two_tailed_p(fit.slope / se, df))
}

/// Two-tailed p-value of a t statistic.
pub fn two_tailed_p(t_stat: f64, df: f64) -> f64 {
    match StudentsT::new(0.0, 1.0, df) {
        Ok(t_dist) => (2.0 * (1.0 - t_dist.cdf(t_stat.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}
