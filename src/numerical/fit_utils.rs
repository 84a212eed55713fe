//! Small statistical helpers around a fit.
use crate::error::{CurveFitError, Result};
use crate::symbolic::special_functions::norm_ppf;
use nalgebra::{DMatrix, DVector};

/// Simple linear equation `m x + b`.
pub fn line(x: f64, m: f64, b: f64) -> f64 {
    x * m + b
}

/// Half-width of the two-sided confidence interval at level `p` for a normally
/// distributed quantity with standard deviation `std`.
///
/// `ci_x(1.0, 0.95) ≈ 1.959964`. Fails with `InvalidOption` unless `0 <= p <= 1`.
pub fn ci_x(std: f64, p: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&p) {
        return Err(CurveFitError::InvalidOption(format!(
            "confidence level must lie in [0, 1], got {}",
            p
        )));
    }
    let population = p + (1.0 - p) / 2.0;
    Ok(norm_ppf(population) * std)
}

fn nan_max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, f64::max)
}

/// NaN when any value is NaN
fn max_propagating(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, |acc, v| {
        if acc.is_nan() || v.is_nan() {
            f64::NAN
        } else {
            acc.max(v)
        }
    })
}

/// Converts measurement errors into weights in `[0, 1]`: the smallest error gets
/// weight 1, larger errors get less.
///
/// `α = nanmax(e) - e`, `ω = 1 - exp(-α/max(α) - 1)`, result `(ω / max ω)²`.
pub fn weights(errors: &[f64]) -> Vec<f64> {
    let top = nan_max(errors);
    let alpha: Vec<f64> = errors.iter().map(|e| top - e).collect();
    let alpha_max = max_propagating(&alpha);
    let omega: Vec<f64> = alpha
        .iter()
        .map(|a| 1.0 - (-a / alpha_max - 1.0).exp())
        .collect();
    let omega_max = max_propagating(&omega);
    omega.iter().map(|w| (w / omega_max).powi(2)).collect()
}

/// Least squares solution `[m, b]` of `y ≈ m x + b z`; `z` defaults to ones.
pub fn regression(x: &[f64], y: &[f64], z: Option<&[f64]>) -> Result<Vec<f64>> {
    let n = x.len();
    if y.len() != n {
        return Err(CurveFitError::ShapeMismatch {
            what: "y",
            expected: n,
            found: y.len(),
        });
    }
    let ones = vec![1.0; n];
    let z = z.unwrap_or(&ones);
    if z.len() != n {
        return Err(CurveFitError::ShapeMismatch {
            what: "z",
            expected: n,
            found: z.len(),
        });
    }
    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { x[i] } else { z[i] });
    let rhs = DVector::from_column_slice(y);
    let svd = design.svd(true, true);
    let eps = f64::EPSILON * n.max(2) as f64 * svd.singular_values.max();
    let solution = svd
        .solve(&rhs, eps)
        .map_err(|msg| CurveFitError::InvalidOption(msg.to_string()))?;
    Ok(solution.iter().copied().collect())
}
