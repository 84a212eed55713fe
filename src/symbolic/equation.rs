//! # Equation bundle
//!
//! ## Purpose
//! [`Equation`] takes one [`SymbolicExpression`] and derives, at construction time,
//! its first derivative, second derivative and indefinite integral with respect to the
//! expression's variables. Each of the four forms is compiled into a [`NumericFunction`]
//! sharing the calling convention `f(variables..., constants...)` of
//! [`SymbolicExpression::args`].
//!
//! With several variables the derivative is the mixed partial `∂ⁿf/∂v₁…∂vₙ` and the
//! integral the iterated integral, in the sorted variable order.
//!
//! When the integration rules find no closed form for a one-variable expression, the
//! integral is built numerically instead: `∫ f dt` from
//! [`QUADRATURE_ORIGIN`] to `x`, evaluated by Gauss-Legendre quadrature on every call
//! (see [`NumericFunction::antiderivative`]).
//!
//! ## Failure
//! Construction is all or nothing: if any of the four forms cannot be built
//! (an argument missing from the list, no closed-form integral of a multi-variable
//! expression) the error is returned and no bundle exists.
//!
//! ## Example
//! ```rust, ignore
//! let eq = Equation::new(NamedEquation::OneSiteSpecificBinding.expression()?)?;
//! // x, Bmax, Kd
//! let y = eq.equation().call(&[2.0, 10.0, 1.0])?;
//! let slope = eq.derivative().call(&[2.0, 10.0, 1.0])?;
//! ```
use crate::error::{CurveFitError, Result};
use crate::symbolic::catalog::NamedEquation;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_integration::QUADRATURE_ORIGIN;
use crate::symbolic::symbolic_lambdify::{Backend, LambdifiedFn};
use crate::symbolic::symbols::SymbolicExpression;
use log::{debug, info};
use std::fmt;

/// A compiled expression together with its argument list and rendering.
///
/// Besides the value, the partial derivatives with respect to every constant
/// (the fit parameters) are compiled as well; the fit uses them as analytic Jacobian.
pub struct NumericFunction {
    name: String,
    expression: Expr,
    args: Vec<String>,
    n_variables: usize,
    func: LambdifiedFn,
    parameter_gradient: Vec<LambdifiedFn>,
    latex: String,
    /// set when `expression` is the integrand of a numeric antiderivative
    quadrature_variable: Option<String>,
}

impl NumericFunction {
    /// Compiles `expression` against `args`; the first `n_variables` arguments are
    /// variables, the rest are parameters.
    pub fn new(
        name: &str,
        expression: Expr,
        args: &[&str],
        n_variables: usize,
        backend: Backend,
    ) -> Result<Self> {
        let func = expression.lambdify_with(args, backend)?;
        let parameter_gradient = expression
            .diff_multi_args(&args[n_variables.min(args.len())..])
            .iter()
            .map(|df| df.lambdify_with(args, backend))
            .collect::<Result<Vec<_>>>()?;
        let latex = expression.to_latex();
        Ok(NumericFunction {
            name: name.to_string(),
            expression,
            args: args.iter().map(|s| s.to_string()).collect(),
            n_variables,
            func,
            parameter_gradient,
            latex,
            quadrature_variable: None,
        })
    }

    /// Numeric antiderivative of a one-variable `integrand`: `∫ integrand dt` from
    /// [`QUADRATURE_ORIGIN`] to `args[0]`. The parameter gradient integrates the partial
    /// derivatives of the integrand the same way.
    pub fn antiderivative(
        name: &str,
        integrand: Expr,
        args: &[&str],
        backend: Backend,
    ) -> Result<Self> {
        let var = *args
            .first()
            .ok_or_else(|| CurveFitError::NoVariable(name.to_string()))?;
        let func = integrand.quadrature_antiderivative(args, var, backend)?;
        let parameter_gradient = integrand
            .diff_multi_args(&args[1..])
            .iter()
            .map(|df| df.quadrature_antiderivative(args, var, backend))
            .collect::<Result<Vec<_>>>()?;
        let latex = integrand.quadrature_latex(var);
        Ok(NumericFunction {
            name: name.to_string(),
            expression: integrand,
            args: args.iter().map(|s| s.to_string()).collect(),
            n_variables: 1,
            func,
            parameter_gradient,
            latex,
            quadrature_variable: Some(var.to_string()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compiled expression, or the integrand for a numeric antiderivative.
    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    /// Integration variable when the function is evaluated by quadrature.
    pub fn quadrature_variable(&self) -> Option<&str> {
        self.quadrature_variable.as_deref()
    }

    /// Positional argument names, variables first.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Names of the trailing (parameter) arguments.
    pub fn parameter_names(&self) -> Vec<String> {
        self.args[self.n_variables.min(self.args.len())..].to_vec()
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// LaTeX rendering of the compiled expression (`\int_{0}^{x} … \, dt` by quadrature).
    pub fn latex(&self) -> &str {
        &self.latex
    }

    /// Evaluates at one point, `args` in [`NumericFunction::args`] order.
    pub fn call(&self, args: &[f64]) -> Result<f64> {
        if args.len() != self.args.len() {
            return Err(CurveFitError::ArgumentCount {
                expected: self.args.len(),
                found: args.len(),
            });
        }
        Ok((self.func)(args))
    }

    fn point(&self, x: f64, params: &[f64]) -> Option<Vec<f64>> {
        if self.n_variables != 1 || params.len() + 1 != self.args.len() {
            return None;
        }
        let mut args = Vec::with_capacity(self.args.len());
        args.push(x);
        args.extend_from_slice(params);
        Some(args)
    }

    /// `f(x, params...)` for a one-variable function. NaN when the arity does not match.
    pub fn eval(&self, x: f64, params: &[f64]) -> f64 {
        match self.point(x, params) {
            Some(args) => (self.func)(&args),
            None => f64::NAN,
        }
    }

    /// [`NumericFunction::eval`] elementwise over `xs`.
    pub fn eval_many(&self, xs: &[f64], params: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x, params)).collect()
    }

    /// `∂f/∂p` for every parameter at `(x, params)`; `None` when the arity does not match.
    pub fn parameter_gradient(&self, x: f64, params: &[f64]) -> Option<Vec<f64>> {
        let args = self.point(x, params)?;
        Some(self.parameter_gradient.iter().map(|df| df(&args)).collect())
    }
}

impl fmt::Debug for NumericFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NumericFunction")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("expression", &self.expression.to_string())
            .finish()
    }
}

impl fmt::Display for NumericFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let args = self.args.join(", ");
        match &self.quadrature_variable {
            Some(var) => write!(
                f,
                "{}({}) = ∫[{}, {}] {} d{}",
                self.name, args, QUADRATURE_ORIGIN, var, self.expression, var
            ),
            None => write!(f, "{}({}) = {}", self.name, args, self.expression),
        }
    }
}

/// Function, derivatives and integral of one expression.
#[derive(Debug)]
pub struct Equation {
    expression: SymbolicExpression,
    backend: Backend,
    equation: NumericFunction,
    derivative_expression: Expr,
    derivative: NumericFunction,
    second_derivative_expression: Expr,
    second_derivative: NumericFunction,
    integral_expression: Option<Expr>,
    integral: NumericFunction,
}

impl Equation {
    pub fn new(expression: SymbolicExpression) -> Result<Self> {
        Equation::with_backend(expression, Backend::default())
    }

    /// Builds the bundle with the given numeric backend.
    pub fn with_backend(expression: SymbolicExpression, backend: Backend) -> Result<Self> {
        let name = expression.name().to_string();
        let variables = expression.variable_names();
        if variables.is_empty() {
            return Err(CurveFitError::NoVariable(name));
        }
        let args = expression.arg_names();
        let n = variables.len();
        info!("building equation {} over {:?} with {} backend", name, args, backend);

        let formula = expression.expression().clone();
        let derivative_expression = formula.diff_multi(&variables);
        let second_derivative_expression = derivative_expression.diff_multi(&variables);
        let integral_expression = match formula.integrate_multi(&variables) {
            Ok(integral) => Some(integral),
            Err(CurveFitError::UnsupportedClosedForm { integrand, var }) if n == 1 => {
                info!(
                    "no closed form for the integral of {} in {}; {} is integrated numerically",
                    integrand, var, name
                );
                None
            }
            Err(e) => return Err(e),
        };
        debug!("d{}: {}", name, derivative_expression);
        debug!("d2{}: {}", name, second_derivative_expression);
        if let Some(integral) = &integral_expression {
            debug!("int {}: {}", name, integral);
        }

        let integral_name = format!("{}_integral", name);
        let integral = match &integral_expression {
            Some(integral) => {
                NumericFunction::new(&integral_name, integral.clone(), &args, n, backend)?
            }
            None => NumericFunction::antiderivative(&integral_name, formula.clone(), &args, backend)?,
        };
        let equation = NumericFunction::new(&name, formula, &args, n, backend)?;
        let derivative = NumericFunction::new(
            &format!("{}_derivative", name),
            derivative_expression.clone(),
            &args,
            n,
            backend,
        )?;
        let second_derivative = NumericFunction::new(
            &format!("{}_second_derivative", name),
            second_derivative_expression.clone(),
            &args,
            n,
            backend,
        )?;
        Ok(Equation {
            expression,
            backend,
            equation,
            derivative_expression,
            derivative,
            second_derivative_expression,
            second_derivative,
            integral_expression,
            integral,
        })
    }

    /// Bundle of a catalog entry.
    pub fn from_named(named: NamedEquation) -> Result<Self> {
        Equation::new(named.expression()?)
    }

    pub fn expression(&self) -> &SymbolicExpression {
        &self.expression
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn equation(&self) -> &NumericFunction {
        &self.equation
    }

    pub fn derivative_expression(&self) -> &Expr {
        &self.derivative_expression
    }

    pub fn derivative(&self) -> &NumericFunction {
        &self.derivative
    }

    pub fn second_derivative_expression(&self) -> &Expr {
        &self.second_derivative_expression
    }

    pub fn second_derivative(&self) -> &NumericFunction {
        &self.second_derivative
    }

    /// Closed-form integral; `None` when the integral is evaluated by quadrature.
    pub fn integral_expression(&self) -> Option<&Expr> {
        self.integral_expression.as_ref()
    }

    pub fn integral(&self) -> &NumericFunction {
        &self.integral
    }

    /// The four functions in the order equation, derivative, second derivative, integral.
    pub fn functions(&self) -> [&NumericFunction; 4] {
        [
            &self.equation,
            &self.derivative,
            &self.second_derivative,
            &self.integral,
        ]
    }
}
