//! Weighted nonlinear curve fitting.
//!
//! Minimizes `Σ ((f(xᵢ; p) - yᵢ)/σᵢ)²` with [`LevenbergMarquardt`] and estimates the
//! parameter covariance from the Jacobian at the solution:
//! ```text
//! cov = (JᵀJ)⁺ · s²,   s² = Σ rᵢ² / (n - k)   (s² = 1 with absolute_sigma)
//! ```
//! `(JᵀJ)⁺` is the pseudo-inverse computed from the SVD of `J`, singular values below
//! `eps · max(n, k) · s_max` are dropped. With `n == k` the covariance cannot be
//! estimated and is filled with `+inf`.
use crate::numerical::fit_functions::FitFunction;
use crate::numerical::optimization::LM_optimization::{MinimizationReport, TerminationReason};
use crate::numerical::optimization::fit_options::FitOptions;
use crate::numerical::optimization::problem_LM::LeastSquaresProblem;
use log::debug;
use nalgebra::{DMatrix, DVector};

/// Residuals and Jacobian of a weighted fit of `function` to `(x, y)`.
pub struct CurveFitProblem<'a, F: FitFunction + ?Sized> {
    function: &'a F,
    x: &'a [f64],
    y: &'a [f64],
    sigma: Option<&'a [f64]>,
    params: DVector<f64>,
}

impl<'a, F: FitFunction + ?Sized> CurveFitProblem<'a, F> {
    pub fn new(
        function: &'a F,
        x: &'a [f64],
        y: &'a [f64],
        sigma: Option<&'a [f64]>,
        initial_guess: &[f64],
    ) -> Self {
        CurveFitProblem {
            function,
            x,
            y,
            sigma,
            params: DVector::from_column_slice(initial_guess),
        }
    }

    fn weight(&self, i: usize) -> f64 {
        self.sigma.map_or(1.0, |s| 1.0 / s[i])
    }

    /// Central difference of `f` in parameter `j`.
    fn finite_difference(&self, x: f64, params: &mut [f64], j: usize) -> f64 {
        let p = params[j];
        let h = f64::EPSILON.cbrt() * p.abs().max(1.0);
        params[j] = p + h;
        let forward = self.function.eval(x, params);
        params[j] = p - h;
        let backward = self.function.eval(x, params);
        params[j] = p;
        (forward - backward) / (2.0 * h)
    }
}

impl<F: FitFunction + ?Sized> LeastSquaresProblem for CurveFitProblem<'_, F> {
    fn set_params(&mut self, p: &DVector<f64>) {
        self.params.copy_from(p);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let params = self.params.as_slice();
        Some(DVector::from_iterator(
            self.x.len(),
            self.x
                .iter()
                .zip(self.y)
                .enumerate()
                .map(|(i, (&x, &y))| (self.function.eval(x, params) - y) * self.weight(i)),
        ))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let k = self.params.len();
        let mut params = self.params.as_slice().to_vec();
        let mut jacobian = DMatrix::zeros(self.x.len(), k);
        for (i, &x) in self.x.iter().enumerate() {
            let analytic = self.function.parameter_gradient(x, &params);
            for j in 0..k {
                let derivative = match analytic.as_ref().and_then(|g| g.get(j)) {
                    Some(d) if d.is_finite() => *d,
                    _ => self.finite_difference(x, &mut params, j),
                };
                jacobian[(i, j)] = derivative * self.weight(i);
            }
        }
        Some(jacobian)
    }
}

/// Converged fit.
#[derive(Debug, Clone)]
pub struct CurveFit {
    pub best_fit: Vec<f64>,
    pub covariance: DMatrix<f64>,
    pub report: MinimizationReport,
}

/// Pseudo-inverse of `JᵀJ` through the SVD of `J`.
fn normal_pseudo_inverse(jacobian: DMatrix<f64>) -> Option<DMatrix<f64>> {
    let (m, n) = jacobian.shape();
    let svd = jacobian.svd(false, true);
    let v_t = svd.v_t?;
    let threshold = f64::EPSILON * m.max(n) as f64 * svd.singular_values.max();
    let mut pcov = DMatrix::zeros(n, n);
    for (s, row) in svd.singular_values.iter().zip(v_t.row_iter()) {
        if *s > threshold {
            pcov += row.transpose() * row / (s * s);
        }
    }
    Some(pcov)
}

/// Fits `function` to `(x, y)`; `sigma` are the standard deviations of `y`.
///
/// Returns the reason when `y` or `sigma` do not match `x` in length, when there are
/// fewer points than parameters, when the solver did not converge, or when the solution
/// is not finite.
pub fn curve_fit<F: FitFunction + ?Sized>(
    function: &F,
    x: &[f64],
    y: &[f64],
    sigma: Option<&[f64]>,
    options: &FitOptions,
) -> Result<CurveFit, TerminationReason> {
    let k = function.k();
    let n = x.len();
    if y.len() != n {
        return Err(TerminationReason::WrongDimensions("ydata length differs from xdata"));
    }
    if sigma.is_some_and(|s| s.len() != n) {
        return Err(TerminationReason::WrongDimensions("sigma length differs from xdata"));
    }
    if n < k {
        return Err(TerminationReason::WrongDimensions(
            "fewer data points than parameters",
        ));
    }
    let guess = options.starting_point(k);
    let problem = CurveFitProblem::new(function, x, y, sigma, &guess);
    let (problem, report) = options.solver().minimize(problem);
    debug!(
        "{}: {:?} after {} evaluations",
        function.name(),
        report.termination,
        report.number_of_evaluations
    );
    if !report.termination.was_successful() {
        return Err(report.termination);
    }
    let best = problem.params();
    if best.iter().any(|p| !p.is_finite()) {
        return Err(TerminationReason::Numerical("parameters"));
    }
    let jacobian = problem
        .jacobian()
        .ok_or(TerminationReason::User("jacobian"))?;
    let covariance = if n > k {
        let pcov = normal_pseudo_inverse(jacobian)
            .ok_or(TerminationReason::Numerical("covariance"))?;
        if options.absolute_sigma {
            pcov
        } else {
            let chi2 = problem
                .residuals()
                .map_or(f64::NAN, |r| r.norm_squared());
            pcov * (chi2 / (n - k) as f64)
        }
    } else {
        DMatrix::from_element(k, k, f64::INFINITY)
    };
    Ok(CurveFit {
        best_fit: best.iter().copied().collect(),
        covariance,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::fit_functions::{ClosureFunction, line_function};
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [-1.0, 1.0, 3.0, 5.0, 7.0];
        let fit = curve_fit(&line_function(), &x, &y, None, &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.best_fit[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(fit.best_fit[1], -1.0, epsilon = 1e-8);
        assert_eq!(fit.covariance.shape(), (2, 2));
        assert!(fit.covariance.iter().all(|c| c.abs() < 1e-10));
    }

    #[test]
    fn test_linear_covariance_matches_ordinary_least_squares() {
        // y = x + noise, OLS: cov = s² (XᵀX)⁻¹
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [0.1, 0.9, 2.1, 2.9];
        let fit = curve_fit(&line_function(), &x, &y, None, &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.best_fit[0], 0.96, epsilon = 1e-8);
        assert_relative_eq!(fit.best_fit[1], 0.06, epsilon = 1e-8);
        // ssr = 0.032, s² = 0.016, (XᵀX)⁻¹ = [[0.2, -0.3], [-0.3, 0.7]]
        assert_relative_eq!(fit.covariance[(0, 0)], 0.016 * 0.2, epsilon = 1e-10);
        assert_relative_eq!(fit.covariance[(0, 1)], -0.016 * 0.3, epsilon = 1e-10);
        assert_relative_eq!(fit.covariance[(1, 1)], 0.016 * 0.7, epsilon = 1e-10);
        let absolute = curve_fit(
            &line_function(),
            &x,
            &y,
            None,
            &FitOptions::default().with_absolute_sigma(true),
        )
        .unwrap();
        assert_relative_eq!(absolute.covariance[(1, 1)], 0.7, epsilon = 1e-10);
    }

    #[test]
    fn test_weighted_exponential_with_numeric_jacobian() {
        let f = ClosureFunction::new("growth", &["A", "k"], |x, p| p[0] * (p[1] * x).exp());
        let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.3).collect();
        let y: Vec<f64> = x.iter().map(|x| 2.0 * (0.8 * x).exp()).collect();
        let sigma = vec![0.1; x.len()];
        let fit = curve_fit(&f, &x, &y, Some(&sigma), &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.best_fit[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(fit.best_fit[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_failures() {
        let nan = ClosureFunction::new("nan", &["a"], |_, _| f64::NAN);
        let err = curve_fit(&nan, &[1.0, 2.0], &[1.0, 2.0], None, &FitOptions::default());
        assert_eq!(err.unwrap_err(), TerminationReason::Numerical("residuals norm"));
        let err = curve_fit(&line_function(), &[1.0], &[1.0], None, &FitOptions::default());
        assert!(matches!(err, Err(TerminationReason::WrongDimensions(_))));
    }

    #[test]
    fn test_mismatched_lengths() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let options = FitOptions::default();
        let err = curve_fit(&line_function(), &x, &[1.0, 2.0], None, &options);
        assert!(matches!(err, Err(TerminationReason::WrongDimensions(_))));
        let sigma = [1.0; 3];
        let err = curve_fit(&line_function(), &x, &[1.0; 4], Some(&sigma), &options);
        assert!(matches!(err, Err(TerminationReason::WrongDimensions(_))));
        let err = curve_fit(&line_function(), &x[..2], &[1.0; 4], None, &options);
        assert!(matches!(err, Err(TerminationReason::WrongDimensions(_))));
    }

    #[test]
    fn test_numeric_jacobian_covariance() {
        // same data as the OLS case, without an analytic gradient
        let f = ClosureFunction::new("line", &["m", "b"], |x, p| p[0] * x + p[1]);
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [0.1, 0.9, 2.1, 2.9];
        let fit = curve_fit(&f, &x, &y, None, &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.covariance[(0, 0)], 0.016 * 0.2, max_relative = 1e-6);
        assert_relative_eq!(fit.covariance[(0, 1)], -0.016 * 0.3, max_relative = 1e-6);
        assert_relative_eq!(fit.covariance[(1, 1)], 0.016 * 0.7, max_relative = 1e-6);
    }

    #[test]
    fn test_as_many_points_as_parameters() {
        let fit = curve_fit(
            &line_function(),
            &[0.0, 1.0],
            &[1.0, 3.0],
            None,
            &FitOptions::default(),
        )
        .unwrap();
        assert_relative_eq!(fit.best_fit[0], 2.0, epsilon = 1e-8);
        assert!(fit.covariance.iter().all(|c| c.is_infinite()));
    }
}
