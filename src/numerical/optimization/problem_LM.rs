use nalgebra::{DMatrix, DVector};

/// A nonlinear least squares problem `min ½‖r(p)‖²`.
///
/// The solver owns the problem while it runs: it sets trial parameters, asks for the
/// residuals at them and, for accepted steps, for the Jacobian `∂rᵢ/∂pⱼ` (m × n).
/// Returning `None` from either evaluation stops the solver with
/// `TerminationReason::User`.
pub trait LeastSquaresProblem {
    /// Set the stored parameters `p`.
    fn set_params(&mut self, p: &DVector<f64>);

    /// Current parameter vector `p`.
    fn params(&self) -> DVector<f64>;

    /// Residual vector at the current parameters.
    fn residuals(&self) -> Option<DVector<f64>>;

    /// Jacobian of the residual vector at the current parameters.
    fn jacobian(&self) -> Option<DMatrix<f64>>;
}
