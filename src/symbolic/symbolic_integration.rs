//! SYMBOLIC INTEGRATION
//!
//! Indefinite integrals (without the constant of integration) by pattern rules. The rules
//! cover the model families of the catalog; anything outside them is reported as
//! [`CurveFitError::UnsupportedClosedForm`] instead of an approximate answer.
//!
//! | integrand                          | antiderivative                                   |
//! |------------------------------------|--------------------------------------------------|
//! | polynomial `Σ cₖ xᵏ`               | `Σ cₖ xᵏ⁺¹/(k+1)`                                |
//! | `exp(a x + b)`, `B^(a x + b)`      | `exp(a x + b)/a`, `B^(a x + b)/(a ln B)`         |
//! | `exp(c₂x² + c₁x + c₀)`             | `√π/(2√-c₂) exp(c₀ - c₁²/4c₂) erf(√-c₂ (x + c₁/2c₂))` |
//! | `(a₁x + a₀)/(b₁x + b₀)`            | `a₁/b₁ x + (a₀ - a₁b₀/b₁)/b₁ ln(b₁x + b₀)`      |
//! | `1/(c + exp(L))`, `1/(c + B^L)`    | `(L - ln(c + exp(L)))/(c L')` with `L` linear    |
//! | `p(x) exp(a x + b)`                | `exp(a x + b) Σ (-1)ᵏ p⁽ᵏ⁾(x)/aᵏ⁺¹`              |
//! | `ln`, `sin`, `cos` of linear `u`   | `(u ln u - u)/a`, `-cos(u)/a`, `sin(u)/a`        |
//!
//! plus linearity, constant factors and products or quotients distributed over sums.
//! Symbolic coefficients are allowed everywhere, so `Bmax x/(Kd + x)` integrates with `Bmax`
//! and `Kd` kept as symbols.
//!
//! Integrands outside the table can still be integrated numerically with
//! [`Expr::quadrature_antiderivative`]: a definite integral from [`QUADRATURE_ORIGIN`] to the
//! variable, evaluated by composite Gauss-Legendre quadrature at every call.
use crate::error::{CurveFitError, Result};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_lambdify::{Backend, LambdifiedFn};
use gauss_quad::GaussLegendre;
use std::f64::consts::PI;

/// Highest polynomial degree recognised by `polynomial_coefficients`.
const MAX_POLY_DEGREE: usize = 12;

/// Lower limit of numeric antiderivatives.
pub const QUADRATURE_ORIGIN: f64 = 0.0;
/// Gauss-Legendre nodes per panel.
const QUADRATURE_DEGREE: usize = 16;
/// Panels are at most one unit wide, up to this many.
const MAX_PANELS: usize = 512;

fn unsupported(integrand: &Expr, var: &str) -> CurveFitError {
    CurveFitError::UnsupportedClosedForm {
        integrand: integrand.to_string(),
        var: var.to_string(),
    }
}

fn poly_add(lhs: Vec<Expr>, rhs: Vec<Expr>, subtract: bool) -> Vec<Expr> {
    let len = lhs.len().max(rhs.len());
    (0..len)
        .map(|i| {
            let a = lhs.get(i).cloned().unwrap_or(Expr::Const(0.0));
            let b = rhs.get(i).cloned().unwrap_or(Expr::Const(0.0));
            if subtract { a - b } else { a + b }
        })
        .collect()
}

fn poly_mul(lhs: &[Expr], rhs: &[Expr]) -> Option<Vec<Expr>> {
    let degree = (lhs.len() - 1) + (rhs.len() - 1);
    if degree > MAX_POLY_DEGREE {
        return None;
    }
    let mut out = vec![Expr::Const(0.0); degree + 1];
    for (i, a) in lhs.iter().enumerate() {
        for (j, b) in rhs.iter().enumerate() {
            out[i + j] = out[i + j].clone() + a.clone() * b.clone();
        }
    }
    Some(out)
}

fn trimmed(coeffs: Vec<Expr>) -> Vec<Expr> {
    let mut coeffs: Vec<Expr> = coeffs.into_iter().map(|c| c.simplify_()).collect();
    while coeffs.len() > 1 && coeffs.last().is_some_and(Expr::is_zero) {
        coeffs.pop();
    }
    if coeffs.is_empty() {
        coeffs.push(Expr::Const(0.0));
    }
    coeffs
}

impl Expr {
    /// Indefinite integral with respect to `var`, simplified.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let f = Expr::parse_expression("Bmax*x/(Kd + x)")?;
    /// let F = f.integrate("x")?; // Bmax x - Bmax Kd ln(x + Kd)
    /// ```
    pub fn integrate(&self, var: &str) -> Result<Expr> {
        Ok(self.simplify_().integrate_raw(var)?.simplify_())
    }

    /// Iterated integral: first with respect to `vars[0]`, the result with respect to
    /// `vars[1]`, and so on.
    pub fn integrate_multi(&self, vars: &[&str]) -> Result<Expr> {
        vars.iter()
            .try_fold(self.clone(), |acc, var| acc.integrate(var))
    }

    /// Numeric antiderivative `F(args) = ∫ self dt` from [`QUADRATURE_ORIGIN`] to `args[var]`,
    /// every other argument held at its value. NaN when the upper limit is not finite.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let f = Expr::parse_expression("exp(-x^2)")?;
    /// let F = f.quadrature_antiderivative(&["x"], "x", Backend::Closure)?;
    /// assert!((F(&[10.0]) - PI.sqrt() / 2.0).abs() < 1e-12);
    /// ```
    pub fn quadrature_antiderivative(
        &self,
        args: &[&str],
        var: &str,
        backend: Backend,
    ) -> Result<LambdifiedFn> {
        let index = args
            .iter()
            .position(|&a| a == var)
            .ok_or_else(|| CurveFitError::UnknownArgument(var.to_string()))?;
        let integrand = self.lambdify_with(args, backend)?;
        let rule = GaussLegendre::new(QUADRATURE_DEGREE).map_err(|e| {
            CurveFitError::InvalidOption(format!("Gauss-Legendre rule: {:?}", e))
        })?;
        Ok(Box::new(move |values: &[f64]| {
            let upper = match values.get(index) {
                Some(&u) if u.is_finite() => u,
                _ => return f64::NAN,
            };
            let span = upper - QUADRATURE_ORIGIN;
            let panels = (span.abs().ceil() as usize).clamp(1, MAX_PANELS);
            let width = span / panels as f64;
            (0..panels)
                .map(|i| {
                    let a = QUADRATURE_ORIGIN + i as f64 * width;
                    rule.integrate(a, a + width, |t| {
                        let mut point = values.to_vec();
                        point[index] = t;
                        integrand(&point)
                    })
                })
                .sum::<f64>()
        }))
    }

    /// LaTeX of the definite integral computed by [`Expr::quadrature_antiderivative`],
    /// the integration variable renamed to a dummy symbol.
    pub fn quadrature_latex(&self, var: &str) -> String {
        let symbols = self.free_symbols();
        let dummy = ["t", "s", "u", "tau"]
            .into_iter()
            .find(|d| *d != var && !symbols.contains(*d))
            .unwrap_or("t'");
        format!(
            "\\int_{{{}}}^{{{}}} {} \\, d{}",
            QUADRATURE_ORIGIN,
            var,
            self.rename_variable(var, dummy).to_latex(),
            dummy
        )
    }

    /// Coefficients `[c₀, c₁, …]` when the expression is a polynomial in `var` whose
    /// coefficients are free of `var`. Trailing zero coefficients are dropped.
    pub fn polynomial_coefficients(&self, var: &str) -> Option<Vec<Expr>> {
        if !self.contains_variable(var) {
            return Some(vec![self.clone()]);
        }
        let coeffs = match self {
            Expr::Var(_) => vec![Expr::Const(0.0), Expr::Const(1.0)],
            Expr::Add(lhs, rhs) => poly_add(
                lhs.polynomial_coefficients(var)?,
                rhs.polynomial_coefficients(var)?,
                false,
            ),
            Expr::Sub(lhs, rhs) => poly_add(
                lhs.polynomial_coefficients(var)?,
                rhs.polynomial_coefficients(var)?,
                true,
            ),
            Expr::Mul(lhs, rhs) => poly_mul(
                &lhs.polynomial_coefficients(var)?,
                &rhs.polynomial_coefficients(var)?,
            )?,
            Expr::Div(lhs, rhs) if !rhs.contains_variable(var) => lhs
                .polynomial_coefficients(var)?
                .into_iter()
                .map(|c| c / *rhs.clone())
                .collect(),
            Expr::Pow(base, exp) => match exp.as_ref() {
                Expr::Const(n)
                    if *n >= 0.0 && n.fract() == 0.0 && *n <= MAX_POLY_DEGREE as f64 =>
                {
                    let base = base.polynomial_coefficients(var)?;
                    let mut acc = vec![Expr::Const(1.0)];
                    for _ in 0..(*n as usize) {
                        acc = trimmed(poly_mul(&acc, &base)?);
                    }
                    acc
                }
                _ => return None,
            },
            _ => return None,
        };
        Some(trimmed(coeffs))
    }

    /// `(c₀, c₁)` when the expression is `c₁ var + c₀` with `c₁ ≠ 0`.
    pub fn linear_coefficients(&self, var: &str) -> Option<(Expr, Expr)> {
        match self.polynomial_coefficients(var)?.as_slice() {
            [c0, c1] => Some((c0.clone(), c1.clone())),
            _ => None,
        }
    }

    fn integrate_raw(&self, var: &str) -> Result<Expr> {
        let x = Expr::var(var);
        // ∫ c dx = c*x
        if !self.contains_variable(var) {
            return Ok(self.clone() * x);
        }
        if let Some(coeffs) = self.polynomial_coefficients(var) {
            return Ok(integrate_polynomial(&coeffs, var));
        }
        match self {
            Expr::Add(lhs, rhs) => Ok(lhs.integrate_raw(var)? + rhs.integrate_raw(var)?),
            Expr::Sub(lhs, rhs) => Ok(lhs.integrate_raw(var)? - rhs.integrate_raw(var)?),
            Expr::Mul(lhs, rhs) => self.integrate_product(lhs, rhs, var),
            Expr::Div(lhs, rhs) => self.integrate_quotient(lhs, rhs, var),
            Expr::Pow(base, exp) => self.integrate_power(base, exp, var),
            Expr::Exp(arg) => self.integrate_exponential(arg, var),
            Expr::Ln(arg) => {
                // ∫ ln(a x + b) dx = (u ln u - u)/a
                let (_, a) = arg.linear_coefficients(var).ok_or_else(|| unsupported(self, var))?;
                let u = *arg.clone();
                Ok((u.clone() * u.clone().ln() - u) / a)
            }
            Expr::sin(arg) => {
                let (_, a) = arg.linear_coefficients(var).ok_or_else(|| unsupported(self, var))?;
                Ok(-Expr::cos(arg.clone()) / a)
            }
            Expr::cos(arg) => {
                let (_, a) = arg.linear_coefficients(var).ok_or_else(|| unsupported(self, var))?;
                Ok(Expr::sin(arg.clone()) / a)
            }
            _ => Err(unsupported(self, var)),
        }
    }

    fn integrate_product(&self, lhs: &Expr, rhs: &Expr, var: &str) -> Result<Expr> {
        // constant factors
        if !lhs.contains_variable(var) {
            return Ok(lhs.clone() * rhs.integrate_raw(var)?);
        }
        if !rhs.contains_variable(var) {
            return Ok(lhs.integrate_raw(var)? * rhs.clone());
        }
        // distribute over sums
        match (lhs, rhs) {
            (_, Expr::Add(a, b)) => {
                return (lhs.clone() * *a.clone() + lhs.clone() * *b.clone()).integrate_raw(var);
            }
            (_, Expr::Sub(a, b)) => {
                return (lhs.clone() * *a.clone() - lhs.clone() * *b.clone()).integrate_raw(var);
            }
            (Expr::Add(a, b), _) => {
                return (*a.clone() * rhs.clone() + *b.clone() * rhs.clone()).integrate_raw(var);
            }
            (Expr::Sub(a, b), _) => {
                return (*a.clone() * rhs.clone() - *b.clone() * rhs.clone()).integrate_raw(var);
            }
            _ => {}
        }
        // polynomial times exp(linear), either order
        for (poly, other) in [(lhs, rhs), (rhs, lhs)] {
            if let (Some(_), Expr::Exp(arg)) = (poly.polynomial_coefficients(var), other) {
                if let Some((_, a)) = arg.linear_coefficients(var) {
                    return Ok(integrate_polynomial_times_exponential(poly, arg, &a, var));
                }
            }
        }
        Err(unsupported(self, var))
    }

    fn integrate_quotient(&self, lhs: &Expr, rhs: &Expr, var: &str) -> Result<Expr> {
        let x = Expr::var(var);
        if !rhs.contains_variable(var) {
            return Ok(lhs.integrate_raw(var)? / rhs.clone());
        }
        // (a1 x + a0)/(b1 x + b0)
        if let (Some(num), Some((b0, b1))) = (
            lhs.polynomial_coefficients(var),
            rhs.linear_coefficients(var),
        ) {
            if num.len() <= 2 {
                let a0 = num[0].clone();
                let a1 = num.get(1).cloned().unwrap_or(Expr::Const(0.0));
                let quotient = a1.clone() / b1.clone();
                let remainder = a0 - a1 * b0 / b1.clone();
                return Ok(quotient * x + remainder / b1 * rhs.clone().ln());
            }
        }
        if !lhs.contains_variable(var) {
            return Ok(lhs.clone() * integrate_reciprocal(rhs, var)?);
        }
        match lhs {
            Expr::Add(a, b) => Ok((*a.clone() / rhs.clone()).integrate_raw(var)?
                + (*b.clone() / rhs.clone()).integrate_raw(var)?),
            Expr::Sub(a, b) => Ok((*a.clone() / rhs.clone()).integrate_raw(var)?
                - (*b.clone() / rhs.clone()).integrate_raw(var)?),
            Expr::Mul(a, b) if !a.contains_variable(var) => {
                Ok(*a.clone() * (*b.clone() / rhs.clone()).integrate_raw(var)?)
            }
            Expr::Mul(a, b) if !b.contains_variable(var) => {
                Ok(*b.clone() * (*a.clone() / rhs.clone()).integrate_raw(var)?)
            }
            _ => Err(unsupported(self, var)),
        }
    }

    fn integrate_power(&self, base: &Expr, exp: &Expr, var: &str) -> Result<Expr> {
        if !base.contains_variable(var) {
            // ∫ B^(a x + b) dx = B^(a x + b)/(a ln B)
            let (_, a) = exp.linear_coefficients(var).ok_or_else(|| unsupported(self, var))?;
            return Ok(self.clone() / (a * base.clone().ln()));
        }
        let (_, a) = base
            .linear_coefficients(var)
            .ok_or_else(|| unsupported(self, var))?;
        match exp {
            // ∫ (a x + b)^-1 dx = ln(a x + b)/a
            Expr::Const(n) if *n == -1.0 => Ok(base.clone().ln() / a),
            Expr::Const(n) => Ok(base.clone().pow(Expr::Const(n + 1.0)) / (Expr::Const(n + 1.0) * a)),
            _ => Err(unsupported(self, var)),
        }
    }

    fn integrate_exponential(&self, arg: &Expr, var: &str) -> Result<Expr> {
        let x = Expr::var(var);
        let coeffs = arg
            .polynomial_coefficients(var)
            .ok_or_else(|| unsupported(self, var))?;
        match coeffs.as_slice() {
            [_, c1] => Ok(self.clone() / c1.clone()),
            [c0, c1, c2] => {
                // complete the square: c2 (x + h)^2 + c0 - c1^2/(4 c2)
                let s = (-c2.clone()).sqrt();
                let h = c1.clone() / (Expr::Const(2.0) * c2.clone());
                let shift = c0.clone()
                    - c1.clone().pow(Expr::Const(2.0)) / (Expr::Const(4.0) * c2.clone());
                Ok(Expr::Const(PI.sqrt() / 2.0) / s.clone()
                    * shift.exp()
                    * Expr::erf((s * (x + h)).boxed()))
            }
            _ => Err(unsupported(self, var)),
        }
    }
}

fn integrate_polynomial(coeffs: &[Expr], var: &str) -> Expr {
    let x = Expr::var(var);
    coeffs
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_zero())
        .map(|(k, c)| {
            let power = (k + 1) as f64;
            c.clone() * x.clone().pow(Expr::Const(power)) / Expr::Const(power)
        })
        .reduce(|acc, term| acc + term)
        .unwrap_or(Expr::Const(0.0))
}

/// ∫ p(x) exp(a x + b) dx = exp(a x + b) Σ (-1)^k p^(k)(x) / a^(k+1)
fn integrate_polynomial_times_exponential(poly: &Expr, arg: &Expr, a: &Expr, var: &str) -> Expr {
    let mut sum = Expr::Const(0.0);
    let mut derivative = poly.clone();
    let mut k = 0;
    while !derivative.is_zero() {
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        sum = sum
            + Expr::Const(sign) * derivative.clone() / a.clone().pow(Expr::Const((k + 1) as f64));
        derivative = derivative.diff(var).simplify_();
        k += 1;
    }
    Expr::Exp(Box::new(arg.clone())) * sum
}

/// ∫ 1/r dx for the logistic denominators `c + exp(L)` and `c + B^L`, `L` linear.
fn integrate_reciprocal(rhs: &Expr, var: &str) -> Result<Expr> {
    let fail = || unsupported(&(Expr::Const(1.0) / rhs.clone()), var);
    let (c, growth) = match rhs {
        Expr::Add(a, b) if !a.contains_variable(var) => (a.as_ref(), b.as_ref()),
        Expr::Add(a, b) if !b.contains_variable(var) => (b.as_ref(), a.as_ref()),
        _ => return Err(fail()),
    };
    // natural exponent of the growing term
    let exponent = match growth {
        Expr::Exp(l) => *l.clone(),
        Expr::Pow(base, l) if !base.contains_variable(var) => *l.clone() * base.clone().ln(),
        _ => return Err(fail()),
    };
    let (_, slope) = exponent.linear_coefficients(var).ok_or_else(fail)?;
    Ok((exponent - rhs.clone().ln()) / (c.clone() * slope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn x() -> Expr {
        Expr::var("x")
    }

    /// d/dx of the antiderivative must reproduce the integrand.
    fn check_antiderivative(f: &Expr, vars: &[&str], points: &[Vec<f64>]) {
        let integral = f.integrate("x").unwrap();
        let back = integral.diff("x").simplify_().lambdify(vars).unwrap();
        let f = f.lambdify(vars).unwrap();
        for args in points {
            assert_relative_eq!(back(args), f(args), epsilon = 1e-9, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_polynomial() {
        let p = Expr::parse_expression("a*x^2 + b*x + c").unwrap();
        let vars = ["x", "a", "b", "c"];
        let integral = p.integrate("x").unwrap().lambdify(&vars).unwrap();
        // a/3 x^3 + b/2 x^2 + c x at x = 2
        assert_relative_eq!(integral(&[2.0, 3.0, 2.0, 1.0]), 8.0 + 4.0 + 2.0, epsilon = 1e-12);
        assert_eq!(
            p.polynomial_coefficients("x").unwrap(),
            vec![Expr::var("c"), Expr::var("b"), Expr::var("a")]
        );
    }

    #[test]
    fn test_constant_integrand() {
        let f = Expr::var("k");
        assert_eq!(f.integrate("x").unwrap(), Expr::var("k") * x());
    }

    #[test]
    fn test_binding_and_pade() {
        let binding = Expr::parse_expression("Bmax*x/(Kd + x) + NS*x + baseline").unwrap();
        check_antiderivative(
            &binding,
            &["x", "Bmax", "Kd", "NS", "baseline"],
            &[vec![0.5, 2.0, 1.5, 0.1, 0.3], vec![7.0, 1.0, 0.2, 0.0, -1.0]],
        );
        let pade = Expr::parse_expression("(A0 + A1*x)/(1 + B1*x)").unwrap();
        check_antiderivative(
            &pade,
            &["x", "A0", "A1", "B1"],
            &[vec![0.5, 1.0, 2.0, 0.5], vec![3.0, -1.0, 0.5, 2.0]],
        );
    }

    #[test]
    fn test_logistic_forms() {
        let dose = Expr::parse_expression(
            "baseline + (peak - baseline)/(1 + 10^((pEC50 - x)*HillSlope))",
        )
        .unwrap();
        check_antiderivative(
            &dose,
            &["x", "HillSlope", "baseline", "pEC50", "peak"],
            &[vec![-7.5, 1.0, 0.0, -7.0, 1.0], vec![-6.0, 0.7, 0.2, -6.5, 3.0]],
        );
        let boltzmann =
            Expr::parse_expression("baseline + (peak - baseline)/(1 + exp((pEC50 - x)/HillSlope))")
                .unwrap();
        check_antiderivative(
            &boltzmann,
            &["x", "HillSlope", "baseline", "pEC50", "peak"],
            &[vec![-7.5, 1.0, 0.0, -7.0, 1.0], vec![1.0, 0.4, 0.2, 0.5, 3.0]],
        );
    }

    #[test]
    fn test_gaussian_gives_erf() {
        let gaussian = Expr::parse_expression(
            "exp(-(x - mu)^2/(2*sigma^2))/(sigma*sqrt(2*pi))",
        )
        .unwrap();
        let vars = ["x", "mu", "sigma"];
        check_antiderivative(
            &gaussian,
            &vars,
            &[vec![0.3, 0.0, 1.0], vec![2.5, 2.0, 0.8], vec![-1.0, 1.0, 2.0]],
        );
        // normal CDF shifted by 1/2
        let integral = gaussian.integrate("x").unwrap().lambdify(&vars).unwrap();
        assert_relative_eq!(integral(&[2.0, 2.0, 0.8]), 0.0, epsilon = 1e-12);
        assert_relative_eq!(integral(&[1.96, 0.0, 1.0]), 0.4750021048517795, epsilon = 1e-9);
    }

    #[test]
    fn test_exponentials() {
        let decay = Expr::parse_expression("(Y0 - NS)*exp(-K*x) + NS").unwrap();
        check_antiderivative(&decay, &["x", "K", "NS", "Y0"], &[vec![0.5, 0.3, 0.1, 2.0]]);
        let growth = Expr::parse_expression("x^2*exp(2*x - 1)").unwrap();
        check_antiderivative(&growth, &["x"], &[vec![0.1], vec![1.3]]);
        let power = Expr::parse_expression("2^(3*x)").unwrap();
        check_antiderivative(&power, &["x"], &[vec![0.1], vec![1.3]]);
    }

    #[test]
    fn test_elementary_functions_of_linear_arguments() {
        for text in ["ln(2*x + 1)", "sin(3*x)", "cos(x/2)", "(2*x + 1)^-1", "(2*x + 1)^3"] {
            let f = Expr::parse_expression(text).unwrap();
            check_antiderivative(&f, &["x"], &[vec![0.4], vec![2.0]]);
        }
    }

    #[test]
    fn test_no_closed_form() {
        let sloped = Expr::parse_expression("Bmax*x^HillSlope/(Kd^HillSlope + x^HillSlope)").unwrap();
        assert!(matches!(
            sloped.integrate("x"),
            Err(CurveFitError::UnsupportedClosedForm { .. })
        ));
        let poisson = Expr::parse_expression("mu^x*exp(-mu)/gamma(x + 1)").unwrap();
        assert!(matches!(
            poisson.integrate("x"),
            Err(CurveFitError::UnsupportedClosedForm { .. })
        ));
        let sine_of_square = Expr::parse_expression("sin(x^2)").unwrap();
        assert!(sine_of_square.integrate("x").is_err());
    }

    #[test]
    fn test_quadrature_of_closed_forms() {
        // matches the symbolic antiderivative up to its value at the origin
        let gaussian = Expr::parse_expression("exp(-(x - mu)^2/(2*sigma^2))/(sigma*sqrt(2*pi))")
            .unwrap();
        let vars = ["x", "mu", "sigma"];
        let exact = gaussian.integrate("x").unwrap().lambdify(&vars).unwrap();
        for backend in [Backend::Closure, Backend::Compiled] {
            let numeric = gaussian.quadrature_antiderivative(&vars, "x", backend).unwrap();
            for args in [[1.5, 0.5, 0.8], [-3.2, 0.0, 1.0], [40.0, 2.0, 3.0]] {
                let origin = [0.0, args[1], args[2]];
                assert_relative_eq!(
                    numeric(&args),
                    exact(&args) - exact(&origin),
                    epsilon = 1e-9
                );
            }
        }
        let cubic = Expr::parse_expression("x^3 - 2*x").unwrap();
        let numeric = cubic.quadrature_antiderivative(&["x"], "x", Backend::Closure).unwrap();
        assert_relative_eq!(numeric(&[3.0]), 81.0 / 4.0 - 9.0, epsilon = 1e-10);
        assert_relative_eq!(numeric(&[0.0]), 0.0, epsilon = 1e-12);
        assert!(numeric(&[f64::INFINITY]).is_nan());
    }

    #[test]
    fn test_quadrature_without_closed_form() {
        let sine_of_square = Expr::parse_expression("sin(x^2)").unwrap();
        let fresnel = sine_of_square
            .quadrature_antiderivative(&["x"], "x", Backend::Closure)
            .unwrap();
        // Fresnel S(1) scaled: ∫₀¹ sin(t²) dt
        assert_relative_eq!(fresnel(&[1.0]), 0.3102683017233811, epsilon = 1e-10);
        let h = 1e-5;
        for x in [0.3, 1.7, 4.2] {
            let slope = (fresnel(&[x + h]) - fresnel(&[x - h])) / (2.0 * h);
            assert_relative_eq!(slope, (x * x).sin(), epsilon = 1e-6);
        }
        assert!(matches!(
            sine_of_square.quadrature_antiderivative(&["y"], "x", Backend::Closure),
            Err(CurveFitError::UnknownArgument(_))
        ));
    }

    #[test]
    fn test_quadrature_latex() {
        let f = Expr::parse_expression("x^2*t").unwrap();
        let latex = f.quadrature_latex("x");
        assert!(latex.starts_with("\\int_{0}^{x} "), "{}", latex);
        assert!(latex.ends_with("\\, ds"), "{}", latex);
        assert!(!latex.contains("x^"), "{}", latex);
    }

    #[test]
    fn test_integrate_multi() {
        // ∫∫ x y dx dy = x^2 y^2 / 4
        let f = Expr::var("x") * Expr::var("y");
        let integral = f.integrate_multi(&["x", "y"]).unwrap().lambdify(&["x", "y"]).unwrap();
        assert_relative_eq!(integral(&[2.0, 3.0]), 9.0, epsilon = 1e-12);
    }
}
