//! # Symbolic Expression Simplification Module
//!
//! Rewrites expression trees into smaller equivalent ones. Derivatives and integrals are
//! produced by purely syntactic rules and would grow without bound without this pass.
//!
//! ## Simplification Strategy
//!
//! 1. **Constant Folding**: arithmetic and function nodes whose arguments are all numbers
//!    are evaluated (only when the result is finite)
//! 2. **Algebraic Identities**: `x + 0 = x`, `x * 1 = x`, `0 * x = 0`, `x - x = 0`, `x / x = 1`
//! 3. **Canonical Constants**: numeric factors move to the left of a product and numeric
//!    terms to the left of a sum, so that `(c1 * x) * c2` folds to `(c1 c2) * x`
//! 4. **Power Rules**: `x^a x^b = x^(a+b)`, `(x^a)^n = x^(a n)` for integer `n`,
//!    `exp(ln u) = u`, `ln(exp u) = u`
//!
//! One sweep works bottom-up; `simplify_` repeats sweeps until the tree stops changing.

use crate::symbolic::special_functions;
use crate::symbolic::symbolic_engine::Expr;

const MAX_SWEEPS: usize = 32;

fn folded(value: f64) -> Option<Expr> {
    if value.is_finite() {
        Some(Expr::Const(value))
    } else {
        None
    }
}

fn is_minus_one(expr: &Expr) -> bool {
    matches!(expr, Expr::Const(c) if *c == -1.0)
}

impl Expr {
    //___________________________________SIMPLIFICATION____________________________________

    /// Simplifies the expression to a fixed point.
    pub fn simplify_(&self) -> Expr {
        let mut current = self.clone();
        for _ in 0..MAX_SWEEPS {
            let next = current.simplify_once();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// One bottom-up sweep of the rewrite rules.
    pub fn simplify_once(&self) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => Self::simplify_add(lhs.simplify_once(), rhs.simplify_once()),
            Expr::Sub(lhs, rhs) => Self::simplify_sub(lhs.simplify_once(), rhs.simplify_once()),
            Expr::Mul(lhs, rhs) => Self::simplify_mul(lhs.simplify_once(), rhs.simplify_once()),
            Expr::Div(lhs, rhs) => Self::simplify_div(lhs.simplify_once(), rhs.simplify_once()),
            Expr::Pow(base, exp) => {
                Self::simplify_pow(base.simplify_once(), exp.simplify_once())
            }
            Expr::Exp(expr) => {
                let expr = expr.simplify_once();
                match expr {
                    Expr::Const(c) => folded(c.exp()).unwrap_or(Expr::Exp(expr.boxed())),
                    Expr::Ln(inner) => *inner,
                    _ => Expr::Exp(expr.boxed()),
                }
            }
            Expr::Ln(expr) => {
                let expr = expr.simplify_once();
                match expr {
                    Expr::Const(c) if c > 0.0 => Expr::Const(c.ln()),
                    Expr::Exp(inner) => *inner,
                    _ => Expr::Ln(expr.boxed()),
                }
            }
            Expr::sin(expr) => Self::fold_unary(expr.simplify_once(), f64::sin, Expr::sin),
            Expr::cos(expr) => Self::fold_unary(expr.simplify_once(), f64::cos, Expr::cos),
            Expr::tg(expr) => Self::fold_unary(expr.simplify_once(), f64::tan, Expr::tg),
            Expr::arctg(expr) => Self::fold_unary(expr.simplify_once(), f64::atan, Expr::arctg),
            Expr::erf(expr) => {
                Self::fold_unary(expr.simplify_once(), special_functions::erf, Expr::erf)
            }
            Expr::gamma(expr) => {
                Self::fold_unary(expr.simplify_once(), special_functions::gamma, Expr::gamma)
            }
            Expr::polygamma(n, expr) => {
                let expr = expr.simplify_once();
                match expr {
                    Expr::Const(c) => folded(special_functions::polygamma(*n, c))
                        .unwrap_or(Expr::polygamma(*n, expr.boxed())),
                    _ => Expr::polygamma(*n, expr.boxed()),
                }
            }
        }
    }

    fn fold_unary(arg: Expr, eval: fn(f64) -> f64, node: fn(Box<Expr>) -> Expr) -> Expr {
        match arg {
            Expr::Const(c) => folded(eval(c)).unwrap_or(node(arg.boxed())),
            _ => node(arg.boxed()),
        }
    }

    fn simplify_add(lhs: Expr, rhs: Expr) -> Expr {
        match (&lhs, &rhs) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b),
            _ if lhs.is_zero() => rhs,
            _ if rhs.is_zero() => lhs,
            // x + c = c + x
            (_, Expr::Const(_)) => Expr::Add(rhs.boxed(), lhs.boxed()),
            // a + (c + x) = (a + c) + x
            (Expr::Const(a), Expr::Add(inner_lhs, inner_rhs)) => match inner_lhs.as_ref() {
                Expr::Const(c) => Expr::Add(Expr::Const(a + c).boxed(), inner_rhs.clone()),
                _ => Expr::Add(lhs.boxed(), rhs.boxed()),
            },
            // (c + x) + y = c + (x + y)
            (Expr::Add(inner_lhs, inner_rhs), _) if inner_lhs.as_const().is_some() => Expr::Add(
                inner_lhs.clone(),
                Expr::Add(inner_rhs.clone(), rhs.boxed()).boxed(),
            ),
            // x + (-1 * y) = x - y
            (_, Expr::Mul(factor, rest)) if is_minus_one(factor) => {
                Expr::Sub(lhs.boxed(), rest.clone())
            }
            _ if lhs == rhs => Expr::Mul(Expr::Const(2.0).boxed(), lhs.boxed()),
            _ => Expr::Add(lhs.boxed(), rhs.boxed()),
        }
    }

    fn simplify_sub(lhs: Expr, rhs: Expr) -> Expr {
        match (&lhs, &rhs) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(a - b),
            _ if rhs.is_zero() => lhs,
            _ if lhs.is_zero() => Expr::Mul(Expr::Const(-1.0).boxed(), rhs.boxed()),
            _ if lhs == rhs => Expr::Const(0.0),
            // x - c = (-c) + x
            (_, Expr::Const(c)) => Expr::Add(Expr::Const(-c).boxed(), lhs.boxed()),
            // x - (-1 * y) = x + y
            (_, Expr::Mul(factor, rest)) if is_minus_one(factor) => {
                Expr::Add(lhs.boxed(), rest.clone())
            }
            _ => Expr::Sub(lhs.boxed(), rhs.boxed()),
        }
    }

    fn simplify_mul(lhs: Expr, rhs: Expr) -> Expr {
        match (&lhs, &rhs) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b),
            _ if lhs.is_zero() || rhs.is_zero() => Expr::Const(0.0),
            _ if lhs.is_one() => rhs,
            _ if rhs.is_one() => lhs,
            // x * c = c * x
            (_, Expr::Const(_)) => Expr::Mul(rhs.boxed(), lhs.boxed()),
            // c1 * (c2 * x) = (c1 c2) * x
            (Expr::Const(c1), Expr::Mul(inner_lhs, inner_rhs)) => match inner_lhs.as_ref() {
                Expr::Const(c2) => Expr::Mul(Expr::Const(c1 * c2).boxed(), inner_rhs.clone()),
                _ => Expr::Mul(lhs.boxed(), rhs.boxed()),
            },
            // c1 * (c2 / x) = (c1 c2) / x
            (Expr::Const(c1), Expr::Div(num, den)) => match num.as_ref() {
                Expr::Const(c2) => Expr::Div(Expr::Const(c1 * c2).boxed(), den.clone()),
                _ => Expr::Mul(lhs.boxed(), rhs.boxed()),
            },
            // (c * x) * y = c * (x * y)
            (Expr::Mul(inner_lhs, inner_rhs), _) if inner_lhs.as_const().is_some() => Expr::Mul(
                inner_lhs.clone(),
                Expr::Mul(inner_rhs.clone(), rhs.boxed()).boxed(),
            ),
            // x * (c * y) = c * (x * y)
            (_, Expr::Mul(inner_lhs, inner_rhs)) if inner_lhs.as_const().is_some() => Expr::Mul(
                inner_lhs.clone(),
                Expr::Mul(lhs.boxed(), inner_rhs.clone()).boxed(),
            ),
            // x * (1 / y) = x / y
            (_, Expr::Div(num, den)) if num.is_one() => Expr::Div(lhs.boxed(), den.clone()),
            (Expr::Div(num, den), _) if num.is_one() => Expr::Div(rhs.boxed(), den.clone()),
            // x^a * x^b = x^(a + b)
            (Expr::Pow(base1, exp1), Expr::Pow(base2, exp2)) if base1 == base2 => {
                Expr::Pow(base1.clone(), Expr::Add(exp1.clone(), exp2.clone()).boxed())
            }
            (_, Expr::Pow(base, exp)) if **base == lhs => Expr::Pow(
                base.clone(),
                Expr::Add(Expr::Const(1.0).boxed(), exp.clone()).boxed(),
            ),
            (Expr::Pow(base, exp), _) if **base == rhs => Expr::Pow(
                base.clone(),
                Expr::Add(Expr::Const(1.0).boxed(), exp.clone()).boxed(),
            ),
            (Expr::Exp(a), Expr::Exp(b)) => Expr::Exp(Expr::Add(a.clone(), b.clone()).boxed()),
            _ if lhs == rhs => Expr::Pow(lhs.boxed(), Expr::Const(2.0).boxed()),
            _ => Expr::Mul(lhs.boxed(), rhs.boxed()),
        }
    }

    fn simplify_div(lhs: Expr, rhs: Expr) -> Expr {
        match (&lhs, &rhs) {
            (Expr::Const(a), Expr::Const(b)) if *b != 0.0 => Expr::Const(a / b),
            _ if lhs.is_zero() && !rhs.is_zero() => Expr::Const(0.0),
            _ if rhs.is_one() => lhs,
            _ if lhs == rhs => Expr::Const(1.0),
            // x / c = (1/c) * x
            (_, Expr::Const(c)) if *c != 0.0 => {
                Expr::Mul(Expr::Const(1.0 / c).boxed(), lhs.boxed())
            }
            // (a / b) / c = a / (b c)
            (Expr::Div(num, den), _) => {
                Expr::Div(num.clone(), Expr::Mul(den.clone(), rhs.boxed()).boxed())
            }
            // a / (b / c) = (a c) / b
            (_, Expr::Div(num, den)) => {
                Expr::Div(Expr::Mul(lhs.boxed(), den.clone()).boxed(), num.clone())
            }
            // (c * x) / y = c * (x / y)
            (Expr::Mul(inner_lhs, inner_rhs), _) if inner_lhs.as_const().is_some() => Expr::Mul(
                inner_lhs.clone(),
                Expr::Div(inner_rhs.clone(), rhs.boxed()).boxed(),
            ),
            // x^a / x^b = x^(a - b)
            (Expr::Pow(base1, exp1), Expr::Pow(base2, exp2)) if base1 == base2 => {
                Expr::Pow(base1.clone(), Expr::Sub(exp1.clone(), exp2.clone()).boxed())
            }
            (Expr::Pow(base, exp), _) if **base == rhs => Expr::Pow(
                base.clone(),
                Expr::Sub(exp.clone(), Expr::Const(1.0).boxed()).boxed(),
            ),
            _ => Expr::Div(lhs.boxed(), rhs.boxed()),
        }
    }

    fn simplify_pow(base: Expr, exp: Expr) -> Expr {
        match (&base, &exp) {
            (Expr::Const(b), Expr::Const(e)) => {
                folded(b.powf(*e)).unwrap_or(Expr::Pow(base.boxed(), exp.boxed()))
            }
            _ if exp.is_zero() => Expr::Const(1.0),
            _ if exp.is_one() => base,
            _ if base.is_one() => Expr::Const(1.0),
            // (x^a)^n = x^(a n), n integer
            (Expr::Pow(inner_base, inner_exp), Expr::Const(n)) if n.fract() == 0.0 => Expr::Pow(
                inner_base.clone(),
                Expr::Mul(inner_exp.clone(), exp.boxed()).boxed(),
            ),
            // exp(u)^v = exp(u v)
            (Expr::Exp(inner), _) => Expr::Exp(Expr::Mul(inner.clone(), exp.boxed()).boxed()),
            _ => Expr::Pow(base.boxed(), exp.boxed()),
        }
    }
}
