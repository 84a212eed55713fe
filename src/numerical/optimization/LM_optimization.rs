//! Levenberg-Marquardt least squares.
//!
//! Each iteration solves the damped normal equations
//! ```text
//! (JᵀJ + μ D) h = -Jᵀr
//! ```
//! with `D = diag(JᵀJ)` (Marquardt scaling, kept as a running maximum) or the identity.
//! A trial step is accepted when the gain ratio `ρ = actual / predicted reduction` is
//! positive; the damping then shrinks by `max(1/3, 1 - (2ρ - 1)³)`, otherwise it grows by
//! a doubling factor `ν`. Termination follows MINPACK's `ftol`, `xtol` and `gtol` tests
//! and the evaluation budget `patience · (n + 1)`.
use crate::numerical::optimization::problem_LM::LeastSquaresProblem;
use log::debug;
use nalgebra::{DMatrix, DVector};

const ACCEPT_RATIO: f64 = 1.0e-4;

/// Reasons for terminating the minimization.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum TerminationReason {
    /// The residual or Jacobian computation was not successful, it returned `None`.
    User(&'static str),
    /// Encountered `NaN` or `inf`.
    Numerical(&'static str),
    /// The residuals are literally zero.
    ResidualsZero,
    /// The residual vector is orthogonal to the columns of the Jacobian
    /// (the `gtol` criterion).
    Orthogonal,
    /// The `ftol` or `xtol` criterion was fulfilled.
    Converged { ftol: bool, xtol: bool },
    /// A criterion passed with the machine epsilon but not with the requested bound.
    NoImprovementPossible(&'static str),
    /// Maximum number of function evaluations was hit.
    LostPatience,
    /// The number of parameters n is zero.
    NoParameters,
    /// The number of residuals m is zero.
    NoResiduals,
    /// The dimensions of the problem are wrong.
    WrongDimensions(&'static str),
}

impl TerminationReason {
    /// Whether the outcome counts as a converged fit.
    pub fn was_successful(&self) -> bool {
        matches!(
            self,
            TerminationReason::ResidualsZero
                | TerminationReason::Orthogonal
                | TerminationReason::Converged { .. }
        )
    }
}

/// Information about the minimization.
#[derive(Debug, Clone)]
pub struct MinimizationReport {
    pub termination: TerminationReason,
    /// Number of residual evaluations.
    pub number_of_evaluations: usize,
    /// `½‖r‖²` at the returned parameters.
    pub objective_function: f64,
}

/// Levenberg-Marquardt optimization algorithm.
///
/// The defaults are those of MINPACK's `lmder` as used by `curve_fit`:
/// `ftol = xtol = 1.49012e-8`, `gtol = 0`, `patience = 200`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LevenbergMarquardt {
    ftol: f64,
    xtol: f64,
    gtol: f64,
    initial_damping: f64,
    patience: usize,
    scale_diag: bool,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::new()
    }
}

impl LevenbergMarquardt {
    pub fn new() -> Self {
        let user_tol = 1.49012e-08;
        Self {
            ftol: user_tol,
            xtol: user_tol,
            gtol: 0.0,
            initial_damping: 1.0e-3,
            patience: 200,
            scale_diag: true,
        }
    }

    /// Set the relative error desired in the objective function.
    ///
    /// Termination occurs when both the actual and predicted relative reductions of
    /// `½‖r‖²` are at most `ftol`.
    ///
    /// # Panics
    ///
    /// Panics if ftol is negative.
    #[must_use]
    pub fn with_ftol(self, ftol: f64) -> Self {
        assert!(!ftol.is_sign_negative(), "ftol must be >= 0");
        Self { ftol, ..self }
    }

    /// Set the relative error desired in the parameters.
    ///
    /// Termination occurs when `‖h‖ <= xtol (‖p‖ + xtol)` for the last step `h`.
    ///
    /// # Panics
    ///
    /// Panics if xtol is negative.
    #[must_use]
    pub fn with_xtol(self, xtol: f64) -> Self {
        assert!(!xtol.is_sign_negative(), "xtol must be >= 0");
        Self { xtol, ..self }
    }

    /// Set orthogonality desired between the residual vector and the Jacobian columns.
    ///
    /// Termination occurs when `|(Jᵀr)ᵢ| / (‖Jeᵢ‖ ‖r‖) <= gtol` for every column `i`.
    ///
    /// # Panics
    ///
    /// Panics if `gtol < 0`.
    #[must_use]
    pub fn with_gtol(self, gtol: f64) -> Self {
        assert!(!gtol.is_sign_negative(), "gtol must be >= 0");
        Self { gtol, ..self }
    }

    /// Set the damping `μ` of the first iteration.
    ///
    /// # Panics
    ///
    /// Panics if `initial_damping <= 0`.
    #[must_use]
    pub fn with_initial_damping(self, initial_damping: f64) -> Self {
        assert!(
            initial_damping.is_sign_positive() && initial_damping > 0.0,
            "initial_damping must be > 0"
        );
        Self {
            initial_damping,
            ..self
        }
    }

    /// Set factor for the maximal number of function evaluations, `patience·(n+1)`.
    ///
    /// # Panics
    ///
    /// Panics if `patience == 0`.
    #[must_use]
    pub fn with_patience(self, patience: usize) -> Self {
        assert!(patience > 0, "patience must be > 0");
        Self { patience, ..self }
    }

    /// Enable or disable the Marquardt scaling `D = diag(JᵀJ)`.
    #[must_use]
    pub fn with_scale_diag(self, scale_diag: bool) -> Self {
        Self { scale_diag, ..self }
    }

    /// Try to solve the given least squares problem.
    ///
    /// The parameters of the problem when this function is called are the initial
    /// guess. The problem is handed back with the best parameters found set.
    pub fn minimize<O>(&self, target: O) -> (O, MinimizationReport)
    where
        O: LeastSquaresProblem,
    {
        let mut lm = match LM::new(self, target) {
            Err(report) => return report,
            Ok(lm) => lm,
        };
        loop {
            if let Err(reason) = lm.linearize() {
                return lm.into_report(reason);
            }
            loop {
                match lm.damped_step() {
                    Ok(true) => break,
                    Ok(false) => (),
                    Err(reason) => return lm.into_report(reason),
                }
            }
        }
    }
}

/// State of one minimization.
struct LM<'a, O>
where
    O: LeastSquaresProblem,
{
    config: &'a LevenbergMarquardt,
    target: O,
    report: MinimizationReport,
    x: DVector<f64>,
    residuals: DVector<f64>,
    /// ½‖r‖²
    cost: f64,
    /// JᵀJ
    normal: DMatrix<f64>,
    /// Jᵀr
    gradient: DVector<f64>,
    diag: DVector<f64>,
    mu: f64,
    nu: f64,
    first_linearization: bool,
    max_fev: usize,
    m: usize,
}

impl<'a, O> LM<'a, O>
where
    O: LeastSquaresProblem,
{
    #[allow(clippy::result_large_err)]
    fn new(config: &'a LevenbergMarquardt, target: O) -> Result<Self, (O, MinimizationReport)> {
        let mut report = MinimizationReport {
            termination: TerminationReason::ResidualsZero,
            number_of_evaluations: 0,
            objective_function: f64::NAN,
        };
        let x = target.params();
        let n = x.nrows();
        if n == 0 {
            report.termination = TerminationReason::NoParameters;
            return Err((target, report));
        }
        report.number_of_evaluations = 1;
        let residuals = match target.residuals() {
            Some(residuals) => residuals,
            None => {
                report.termination = TerminationReason::User("residuals");
                return Err((target, report));
            }
        };
        let m = residuals.nrows();
        if m == 0 {
            report.termination = TerminationReason::NoResiduals;
            return Err((target, report));
        }
        let cost = 0.5 * residuals.norm_squared();
        report.objective_function = cost;
        if !cost.is_finite() {
            report.termination = TerminationReason::Numerical("residuals norm");
            return Err((target, report));
        }
        if cost <= f64::MIN_POSITIVE {
            return Err((target, report));
        }
        Ok(Self {
            config,
            target,
            report,
            x,
            residuals,
            cost,
            normal: DMatrix::zeros(n, n),
            gradient: DVector::zeros(n),
            diag: DVector::from_element(n, 1.0),
            mu: config.initial_damping,
            nu: 2.0,
            first_linearization: true,
            max_fev: config.patience * (n + 1),
            m,
        })
    }

    fn into_report(self, termination: TerminationReason) -> (O, MinimizationReport) {
        (
            self.target,
            MinimizationReport {
                termination,
                ..self.report
            },
        )
    }

    /// Jacobian at the current point, normal equations and the `gtol` test.
    fn linearize(&mut self) -> Result<(), TerminationReason> {
        let n = self.x.nrows();
        let jacobian = self
            .target
            .jacobian()
            .ok_or(TerminationReason::User("jacobian"))?;
        if jacobian.ncols() != n || jacobian.nrows() != self.m {
            return Err(TerminationReason::WrongDimensions("jacobian"));
        }
        if jacobian.iter().any(|v| !v.is_finite()) {
            return Err(TerminationReason::Numerical("jacobian"));
        }
        self.normal = jacobian.transpose() * &jacobian;
        self.gradient = jacobian.transpose() * &self.residuals;

        // cosine between r and each column of J
        let residuals_norm = self.residuals.norm();
        let gnorm = (0..n)
            .filter_map(|j| {
                let column_norm = jacobian.column(j).norm();
                (column_norm > 0.0)
                    .then(|| self.gradient[j].abs() / (column_norm * residuals_norm))
            })
            .fold(0.0, f64::max);
        if gnorm <= self.config.gtol {
            return Err(TerminationReason::Orthogonal);
        }

        if self.config.scale_diag {
            for (d, a) in self.diag.iter_mut().zip(self.normal.diagonal().iter()) {
                *d = if self.first_linearization {
                    if *a > 0.0 { *a } else { 1.0 }
                } else {
                    d.max(*a)
                };
            }
        }
        self.first_linearization = false;
        Ok(())
    }

    /// One trial step. `Ok(true)` when the step was accepted and the Jacobian must be
    /// recomputed, `Ok(false)` when the damping was increased and the step is retried.
    fn damped_step(&mut self) -> Result<bool, TerminationReason> {
        let mut damped = self.normal.clone();
        for i in 0..damped.nrows() {
            damped[(i, i)] += self.mu * self.diag[i];
        }
        let step = match damped.cholesky() {
            Some(cholesky) => cholesky.solve(&(-&self.gradient)),
            None => {
                self.increase_damping()?;
                return Ok(false);
            }
        };
        if step.iter().any(|v| !v.is_finite()) {
            return Err(TerminationReason::Numerical("step"));
        }

        let trial = &self.x + &step;
        self.target.set_params(&trial);
        self.report.number_of_evaluations += 1;
        let trial_residuals = self
            .target
            .residuals()
            .ok_or(TerminationReason::User("residuals"))?;
        if trial_residuals.nrows() != self.m {
            return Err(TerminationReason::WrongDimensions("residuals"));
        }
        let trial_cost = 0.5 * trial_residuals.norm_squared();

        // ½ hᵀ(μ D h - g)
        let scaled_step = step.component_mul(&self.diag) * self.mu;
        let predicted = 0.5 * step.dot(&(scaled_step - &self.gradient));
        let actual = if trial_cost.is_finite() {
            self.cost - trial_cost
        } else {
            -1.0
        };
        let ratio = if predicted > 0.0 {
            actual / predicted
        } else {
            0.0
        };
        let accepted = trial_cost.is_finite() && ratio >= ACCEPT_RATIO;

        let step_norm = step.norm();
        let xtol_check = step_norm <= self.config.xtol * (self.x.norm() + self.config.xtol);
        let ftol_check = (actual / self.cost).abs() <= self.config.ftol
            && predicted / self.cost <= self.config.ftol;

        if accepted {
            self.x = trial;
            self.residuals = trial_residuals;
            self.cost = trial_cost;
            self.report.objective_function = trial_cost;
            self.mu *= f64::max(1.0 / 3.0, 1.0 - (2.0 * ratio - 1.0).powi(3));
            self.nu = 2.0;
        } else {
            self.target.set_params(&self.x);
            self.increase_damping()?;
        }
        debug!(
            "LM step {}: cost = {:e}, rho = {:.3}, mu = {:e}",
            self.report.number_of_evaluations, self.cost, ratio, self.mu
        );

        if self.cost <= f64::MIN_POSITIVE {
            return Err(TerminationReason::ResidualsZero);
        }
        if ftol_check || xtol_check {
            return Err(TerminationReason::Converged {
                ftol: ftol_check,
                xtol: xtol_check,
            });
        }
        if self.report.number_of_evaluations >= self.max_fev {
            return Err(TerminationReason::LostPatience);
        }
        if step_norm <= f64::EPSILON * self.x.norm() {
            return Err(TerminationReason::NoImprovementPossible("xtol"));
        }
        Ok(accepted)
    }

    fn increase_damping(&mut self) -> Result<(), TerminationReason> {
        self.mu *= self.nu;
        self.nu *= 2.0;
        if self.mu.is_finite() {
            Ok(())
        } else {
            Err(TerminationReason::Numerical("damping"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_classes() {
        assert!(TerminationReason::Converged {
            ftol: true,
            xtol: false
        }
        .was_successful());
        assert!(!TerminationReason::LostPatience.was_successful());
        assert!(!TerminationReason::NoResiduals.was_successful());
    }

    #[test]
    fn test_defaults() {
        let lm = LevenbergMarquardt::default();
        assert_eq!(lm, LevenbergMarquardt::new());
        assert_eq!(lm.gtol, 0.0);
        assert_eq!(lm.patience, 200);
        let lm = lm.with_ftol(1e-10).with_xtol(1e-10).with_patience(5).with_scale_diag(false);
        assert_eq!((lm.ftol, lm.xtol, lm.patience), (1e-10, 1e-10, 5));
        assert!(!lm.scale_diag);
    }

    #[test]
    #[should_panic(expected = "patience must be > 0")]
    fn test_zero_patience_panics() {
        let _ = LevenbergMarquardt::new().with_patience(0);
    }
}
