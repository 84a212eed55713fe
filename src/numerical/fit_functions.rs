//! Functions that can be fitted: `y = f(x; p₁, …, p_k)`.
//!
//! [`FitFunction`] is implemented by the compiled [`NumericFunction`]s of an
//! [`crate::symbolic::equation::Equation`] and by [`ClosureFunction`], a named Rust
//! closure with declared parameter names.
use crate::numerical::fit_utils::line;
use crate::symbolic::equation::NumericFunction;
use std::fmt;
use std::sync::Arc;

pub trait FitFunction: Send + Sync {
    /// Display name used in reports and warnings.
    fn name(&self) -> &str;

    /// Parameter names, excluding the independent variable, in argument order.
    fn parameter_names(&self) -> Vec<String>;

    /// `f(x; params)`.
    fn eval(&self, x: f64, params: &[f64]) -> f64;

    fn eval_many(&self, xs: &[f64], params: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x, params)).collect()
    }

    /// Analytic `∂f/∂pⱼ` at `x`, if known.
    fn parameter_gradient(&self, _x: f64, _params: &[f64]) -> Option<Vec<f64>> {
        None
    }

    /// Number of parameters.
    fn k(&self) -> usize {
        self.parameter_names().len()
    }
}

impl<T: FitFunction + ?Sized> FitFunction for &T {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn parameter_names(&self) -> Vec<String> {
        (**self).parameter_names()
    }
    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        (**self).eval(x, params)
    }
    fn eval_many(&self, xs: &[f64], params: &[f64]) -> Vec<f64> {
        (**self).eval_many(xs, params)
    }
    fn parameter_gradient(&self, x: f64, params: &[f64]) -> Option<Vec<f64>> {
        (**self).parameter_gradient(x, params)
    }
}

impl<T: FitFunction + ?Sized> FitFunction for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn parameter_names(&self) -> Vec<String> {
        (**self).parameter_names()
    }
    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        (**self).eval(x, params)
    }
    fn eval_many(&self, xs: &[f64], params: &[f64]) -> Vec<f64> {
        (**self).eval_many(xs, params)
    }
    fn parameter_gradient(&self, x: f64, params: &[f64]) -> Option<Vec<f64>> {
        (**self).parameter_gradient(x, params)
    }
}

impl<T: FitFunction + ?Sized> FitFunction for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn parameter_names(&self) -> Vec<String> {
        (**self).parameter_names()
    }
    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        (**self).eval(x, params)
    }
    fn eval_many(&self, xs: &[f64], params: &[f64]) -> Vec<f64> {
        (**self).eval_many(xs, params)
    }
    fn parameter_gradient(&self, x: f64, params: &[f64]) -> Option<Vec<f64>> {
        (**self).parameter_gradient(x, params)
    }
}

impl FitFunction for NumericFunction {
    fn name(&self) -> &str {
        NumericFunction::name(self)
    }
    fn parameter_names(&self) -> Vec<String> {
        NumericFunction::parameter_names(self)
    }
    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        NumericFunction::eval(self, x, params)
    }
    fn parameter_gradient(&self, x: f64, params: &[f64]) -> Option<Vec<f64>> {
        NumericFunction::parameter_gradient(self, x, params)
    }
}

type ScalarFn = Box<dyn Fn(f64, &[f64]) -> f64 + Send + Sync>;
type GradientFn = Box<dyn Fn(f64, &[f64]) -> Vec<f64> + Send + Sync>;

/// A named closure `f(x, params)`, optionally with its parameter gradient.
pub struct ClosureFunction {
    name: String,
    parameters: Vec<String>,
    func: ScalarFn,
    gradient: Option<GradientFn>,
}

impl ClosureFunction {
    /// # Examples
    /// ```rust, ignore
    /// let decay = ClosureFunction::new("decay", &["A", "k"], |x, p| p[0] * (-p[1] * x).exp());
    /// ```
    pub fn new<F>(name: &str, parameters: &[&str], func: F) -> Self
    where
        F: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        ClosureFunction {
            name: name.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            func: Box::new(func),
            gradient: None,
        }
    }

    /// Attaches the analytic `∂f/∂pⱼ`, one entry per parameter.
    pub fn with_gradient<G>(mut self, gradient: G) -> Self
    where
        G: Fn(f64, &[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        self.gradient = Some(Box::new(gradient));
        self
    }
}

impl FitFunction for ClosureFunction {
    fn name(&self) -> &str {
        &self.name
    }
    fn parameter_names(&self) -> Vec<String> {
        self.parameters.clone()
    }
    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        (self.func)(x, params)
    }
    fn parameter_gradient(&self, x: f64, params: &[f64]) -> Option<Vec<f64>> {
        self.gradient.as_ref().map(|g| g(x, params))
    }
}

impl fmt::Debug for ClosureFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ClosureFunction({}({}))", self.name, self.parameters.join(", "))
    }
}

/// `line(x, m, b) = m x + b` as a fit function.
pub fn line_function() -> ClosureFunction {
    ClosureFunction::new("line", &["m", "b"], |x, p| line(x, p[0], p[1]))
        .with_gradient(|x, _| vec![x, 1.0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::catalog::NamedEquation;
    use crate::symbolic::equation::Equation;

    #[test]
    fn test_line_function() {
        let f = line_function();
        assert_eq!(f.name(), "line");
        assert_eq!(f.parameter_names(), vec!["m", "b"]);
        assert_eq!(f.k(), 2);
        assert_eq!(f.eval_many(&[0.0, 1.0, 2.0], &[1.0, 5.0]), vec![5.0, 6.0, 7.0]);
        assert_eq!(f.parameter_gradient(3.0, &[1.0, 5.0]), Some(vec![3.0, 1.0]));
        let plain = ClosureFunction::new("square", &["a"], |x, p| p[0] * x * x);
        assert!(plain.parameter_gradient(1.0, &[1.0]).is_none());
    }

    #[test]
    fn test_numeric_function_through_pointers() {
        let eq = Equation::from_named(NamedEquation::Parabola).unwrap();
        let by_ref: &dyn FitFunction = eq.equation();
        assert_eq!(by_ref.parameter_names(), vec!["a", "b", "c"]);
        assert_eq!(by_ref.eval(2.0, &[1.0, 0.0, 1.0]), 5.0);
        let boxed: Box<dyn FitFunction> = Box::new(line_function());
        assert_eq!(boxed.eval(3.0, &[2.0, -1.0]), 5.0);
        let shared = Arc::new(line_function());
        assert_eq!(shared.name(), "line");
    }
}
