//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation of [`Expr`] trees.
//!
//! ## Key Methods
//! - `diff(var)` - partial derivative with respect to one symbol
//! - `diff_multi(vars)` - successive derivative, one symbol after another (a mixed partial
//!   when several distinct variables are given)
//! - `diff_multi_args(args)` - gradient, one partial per argument
//!
//! `diff` returns the raw tree produced by the calculus rules; every public helper that
//! returns a finished derivative runs it through `simplify_` first.
//!
//! ## Power rule
//! `u^v` is handled in three shapes: a constant exponent (`v u^(v-1) u'`), a constant base
//! (`u^v ln(u) v'`) and the general case `u^v (v' ln(u) + v u'/u)`.

use crate::symbolic::symbolic_engine::Expr;
use std::f64::consts::PI;

impl Expr {
    /// Raw partial derivative with respect to `var`.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::var("x");
    /// let f = x.clone().pow(Expr::Const(2.0)); // x^2
    /// let df_dx = f.diff("x").simplify_(); // 2*x
    /// ```
    pub fn diff(&self, var: &str) -> Expr {
        if !self.contains_variable(var) {
            return Expr::Const(0.0);
        }
        match self {
            Expr::Var(name) => {
                if name == var {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Add(lhs, rhs) => Expr::Add(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Sub(lhs, rhs) => Expr::Sub(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Mul(lhs, rhs) => Expr::Add(
                Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                Box::new(Expr::Mul(lhs.clone(), Box::new(rhs.diff(var)))),
            ),
            Expr::Div(lhs, rhs) => {
                if !rhs.contains_variable(var) {
                    return Expr::Div(Box::new(lhs.diff(var)), rhs.clone());
                }
                Expr::Div(
                    Box::new(Expr::Sub(
                        Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                        Box::new(Expr::Mul(Box::new(rhs.diff(var)), lhs.clone())),
                    )),
                    Box::new(Expr::Pow(rhs.clone(), Box::new(Expr::Const(2.0)))),
                )
            }
            Expr::Pow(base, exp) => {
                let base_depends = base.contains_variable(var);
                let exp_depends = exp.contains_variable(var);
                match (base_depends, exp_depends) {
                    (true, false) => Expr::Mul(
                        Box::new(Expr::Mul(
                            exp.clone(),
                            Box::new(Expr::Pow(
                                base.clone(),
                                Box::new(Expr::Sub(exp.clone(), Box::new(Expr::Const(1.0)))),
                            )),
                        )),
                        Box::new(base.diff(var)),
                    ),
                    (false, _) => Expr::Mul(
                        Box::new(Expr::Mul(
                            Box::new(self.clone()),
                            Box::new(Expr::Ln(base.clone())),
                        )),
                        Box::new(exp.diff(var)),
                    ),
                    (true, true) => Expr::Mul(
                        Box::new(self.clone()),
                        Box::new(Expr::Add(
                            Box::new(Expr::Mul(
                                Box::new(exp.diff(var)),
                                Box::new(Expr::Ln(base.clone())),
                            )),
                            Box::new(Expr::Div(
                                Box::new(Expr::Mul(exp.clone(), Box::new(base.diff(var)))),
                                base.clone(),
                            )),
                        )),
                    ),
                }
            }
            Expr::Exp(expr) => {
                Expr::Mul(Box::new(Expr::Exp(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::Ln(expr) => Expr::Div(Box::new(expr.diff(var)), expr.clone()),
            Expr::sin(expr) => {
                Expr::Mul(Box::new(Expr::cos(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::cos(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(Expr::sin(expr.clone())),
                )),
                Box::new(expr.diff(var)),
            ),
            Expr::tg(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Pow(
                    Box::new(Expr::cos(expr.clone())),
                    Box::new(Expr::Const(2.0)),
                )),
            ),
            Expr::arctg(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Add(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                )),
            ),
            // d erf(u) = 2/sqrt(pi) exp(-u^2) du
            Expr::erf(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(2.0 / PI.sqrt())),
                    Box::new(Expr::Exp(Box::new(Expr::Mul(
                        Box::new(Expr::Const(-1.0)),
                        Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                    )))),
                )),
                Box::new(expr.diff(var)),
            ),
            // d gamma(u) = gamma(u) digamma(u) du
            Expr::gamma(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::gamma(expr.clone())),
                    Box::new(Expr::polygamma(0, expr.clone())),
                )),
                Box::new(expr.diff(var)),
            ),
            Expr::polygamma(n, expr) => Expr::Mul(
                Box::new(Expr::polygamma(n + 1, expr.clone())),
                Box::new(expr.diff(var)),
            ),
        }
    } // end of diff

    /// Successive derivative: differentiates with respect to `vars[0]`, then the result
    /// with respect to `vars[1]`, and so on. Each step is simplified.
    pub fn diff_multi(&self, vars: &[&str]) -> Expr {
        vars.iter()
            .fold(self.clone(), |acc, var| acc.diff(var).simplify_())
    }

    /// Simplified partial derivatives with respect to every argument, in argument order.
    pub fn diff_multi_args(&self, all_vars: &[&str]) -> Vec<Expr> {
        all_vars
            .iter()
            .map(|var| self.diff(var).simplify_())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn x() -> Expr {
        Expr::var("x")
    }

    /// Analytical derivative of a one-symbol expression against a central difference
    /// on `num_values` points of `[start, end]`; non-finite points are skipped.
    fn matches_central_difference(f: &Expr, start: f64, end: f64, num_values: usize, tol: f64) -> bool {
        let analytical = f.diff("x").simplify_().lambdify(&["x"]).unwrap();
        let function = f.lambdify(&["x"]).unwrap();
        let step = 1e-5 * (end - start).abs().max(1.0);
        let mut deviation: f64 = 0.0;
        for i in 0..num_values {
            let x = start + (end - start) * i as f64 / (num_values as f64 - 1.0);
            let numerical = (function(&[x + step]) - function(&[x - step])) / (2.0 * step);
            let exact = analytical(&[x]);
            if numerical.is_finite() && exact.is_finite() {
                deviation = deviation.max((numerical - exact).abs());
            }
        }
        deviation < tol
    }

    #[test]
    fn test_polynomial_derivative() {
        // a*x^2 + b*x + c
        let (a, b, c) = (Expr::var("a"), Expr::var("b"), Expr::var("c"));
        let f = a.clone() * x().pow(Expr::Const(2.0)) + b.clone() * x() + c;
        let df = f.diff("x").simplify_();
        let df_fn = df.lambdify(&["x", "a", "b"]).unwrap();
        assert_relative_eq!(df_fn(&[3.0, 2.0, -1.0]), 2.0 * 2.0 * 3.0 - 1.0, epsilon = 1e-12);
        let d2f = f.diff_multi(&["x", "x"]);
        assert_eq!(d2f.all_arguments_are_variables(), vec!["a"]);
        assert_eq!(f.diff_multi(&["x", "x", "x"]), Expr::Const(0.0));
    }

    #[test]
    fn test_derivative_of_constant_symbol_is_zero() {
        let f = Expr::var("Kd") * Expr::var("Bmax");
        assert_eq!(f.diff("x"), Expr::Const(0.0));
    }

    #[test]
    fn test_general_power_rule() {
        // x^x, d/dx = x^x (ln x + 1)
        let f = x().pow(x());
        let df = f.diff("x").simplify_().lambdify(&["x"]).unwrap();
        let at = 1.7_f64;
        assert_relative_eq!(df(&[at]), at.powf(at) * (at.ln() + 1.0), epsilon = 1e-12);
        // 10^(2x)
        let g = Expr::Const(10.0).pow(Expr::Const(2.0) * x());
        let dg = g.diff("x").simplify_().lambdify(&["x"]).unwrap();
        assert_relative_eq!(
            dg(&[0.3]),
            10f64.powf(0.6) * 10f64.ln() * 2.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_special_function_derivatives_numerically() {
        let erf = Expr::erf(x().boxed());
        assert!(matches_central_difference(&erf, -2.0, 2.0, 41, 1e-6));
        let gamma = Expr::gamma((x() + Expr::Const(1.0)).boxed());
        assert!(matches_central_difference(&gamma, 0.5, 4.0, 36, 1e-5));
        let digamma = Expr::polygamma(0, x().boxed());
        assert!(matches_central_difference(&digamma, 0.5, 4.0, 36, 1e-5));
        let arctg = Expr::arctg((x() * Expr::Const(2.0)).boxed());
        assert!(matches_central_difference(&arctg, -1.0, 1.0, 21, 1e-6));
        let tg = Expr::tg(x().boxed());
        assert!(matches_central_difference(&tg, -1.0, 1.0, 21, 1e-5));
    }

    #[test]
    fn test_diff_multi_is_mixed_partial() {
        // d2/dxdy (x^2 y^3) = 6 x y^2
        let y = Expr::var("y");
        let f = x().pow(Expr::Const(2.0)) * y.clone().pow(Expr::Const(3.0));
        let mixed = f.diff_multi(&["x", "y"]).lambdify(&["x", "y"]).unwrap();
        assert_relative_eq!(mixed(&[2.0, 3.0]), 6.0 * 2.0 * 9.0, epsilon = 1e-10);
        let gradient = f.diff_multi_args(&["x", "y"]);
        assert_eq!(gradient.len(), 2);
        let dy = gradient[1].lambdify(&["x", "y"]).unwrap();
        assert_relative_eq!(dy(&[2.0, 3.0]), 4.0 * 3.0 * 9.0, epsilon = 1e-10);
    }
}
