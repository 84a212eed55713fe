//! LAMBDIFICATION - converting symbolic expressions to executable functions.
//!
//! Two backends produce the same `Fn(&[f64]) -> f64` contract:
//! - [`Backend::Closure`] builds a tree of nested boxed closures, one per node
//! - [`Backend::Compiled`] lowers the tree into a [`Lambda`] program with symbol names
//!   resolved to argument indices, evaluated by a small interpreter
//!
//! Positional arguments follow the order of the `vars` slice. A free symbol missing from
//! `vars` is reported as [`CurveFitError::UnknownArgument`] when the function is built,
//! never while it is evaluated.
use crate::error::{CurveFitError, Result};
use crate::symbolic::special_functions;
use crate::symbolic::symbolic_engine::Expr;
use strum_macros::{Display, EnumIter};

/// Executable form of an expression.
pub type LambdifiedFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// How an expression is turned into an executable function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter)]
pub enum Backend {
    /// nested closures
    #[default]
    Closure,
    /// index-resolved [`Lambda`] program
    Compiled,
}

fn position_of(vars: &[&str], name: &str) -> Result<usize> {
    vars.iter()
        .position(|&v| v == name)
        .ok_or_else(|| CurveFitError::UnknownArgument(name.to_string()))
}

impl Expr {
    /// Executable function of the expression with the given backend.
    pub fn lambdify_with(&self, vars: &[&str], backend: Backend) -> Result<LambdifiedFn> {
        match backend {
            Backend::Closure => self.lambdify(vars),
            Backend::Compiled => {
                let compiled = self.compile(vars)?;
                Ok(Box::new(compiled.as_closure()))
            }
        }
    }

    /// Closure-tree backend.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::var("x");
    /// let f = x.pow(Expr::Const(2.0)).lambdify(&["x"])?;
    /// assert_eq!(f(&[3.0]), 9.0);
    /// ```
    pub fn lambdify(&self, vars: &[&str]) -> Result<LambdifiedFn> {
        let func: LambdifiedFn = match self {
            Expr::Var(name) => {
                let index = position_of(vars, name)?;
                Box::new(move |args| args[index])
            }
            Expr::Const(val) => {
                let val = *val;
                Box::new(move |_| val)
            }
            Expr::Add(lhs, rhs) => {
                let lf = lhs.lambdify(vars)?;
                let rf = rhs.lambdify(vars)?;
                Box::new(move |args| lf(args) + rf(args))
            }
            Expr::Sub(lhs, rhs) => {
                let lf = lhs.lambdify(vars)?;
                let rf = rhs.lambdify(vars)?;
                Box::new(move |args| lf(args) - rf(args))
            }
            Expr::Mul(lhs, rhs) => {
                let lf = lhs.lambdify(vars)?;
                let rf = rhs.lambdify(vars)?;
                Box::new(move |args| lf(args) * rf(args))
            }
            Expr::Div(lhs, rhs) => {
                let lf = lhs.lambdify(vars)?;
                let rf = rhs.lambdify(vars)?;
                Box::new(move |args| lf(args) / rf(args))
            }
            Expr::Pow(b, e) => {
                let bf = b.lambdify(vars)?;
                match e.as_ref() {
                    Expr::Const(n) if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => {
                        let n = *n as i32;
                        Box::new(move |args| bf(args).powi(n))
                    }
                    _ => {
                        let ef = e.lambdify(vars)?;
                        Box::new(move |args| bf(args).powf(ef(args)))
                    }
                }
            }
            Expr::Exp(e) => {
                let f = e.lambdify(vars)?;
                Box::new(move |args| f(args).exp())
            }
            Expr::Ln(e) => {
                let f = e.lambdify(vars)?;
                Box::new(move |args| f(args).ln())
            }
            Expr::sin(e) => {
                let f = e.lambdify(vars)?;
                Box::new(move |args| f(args).sin())
            }
            Expr::cos(e) => {
                let f = e.lambdify(vars)?;
                Box::new(move |args| f(args).cos())
            }
            Expr::tg(e) => {
                let f = e.lambdify(vars)?;
                Box::new(move |args| f(args).tan())
            }
            Expr::arctg(e) => {
                let f = e.lambdify(vars)?;
                Box::new(move |args| f(args).atan())
            }
            Expr::erf(e) => {
                let f = e.lambdify(vars)?;
                Box::new(move |args| special_functions::erf(f(args)))
            }
            Expr::gamma(e) => {
                let f = e.lambdify(vars)?;
                Box::new(move |args| special_functions::gamma(f(args)))
            }
            Expr::polygamma(n, e) => {
                let n = *n;
                let f = e.lambdify(vars)?;
                Box::new(move |args| special_functions::polygamma(n, f(args)))
            }
        };
        Ok(func)
    } // end of lambdify

    /// Direct evaluation without keeping the closure.
    pub fn eval_expression(&self, vars: &[&str], values: &[f64]) -> Result<f64> {
        if vars.len() != values.len() {
            return Err(CurveFitError::ArgumentCount {
                expected: vars.len(),
                found: values.len(),
            });
        }
        Ok(self.compile(vars)?.eval(values))
    }

    /// Lowers the tree into an index-resolved program.
    pub fn compile(&self, vars: &[&str]) -> Result<Lambda> {
        let lambda = match self {
            Expr::Var(name) => Lambda::Var(position_of(vars, name)?),
            Expr::Const(v) => Lambda::Const(*v),
            Expr::Add(a, b) => Lambda::Add(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Sub(a, b) => Lambda::Sub(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Mul(a, b) => Lambda::Mul(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Div(a, b) => Lambda::Div(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Pow(a, b) => match b.as_ref() {
                Expr::Const(n) if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => {
                    Lambda::Powi(Box::new(a.compile(vars)?), *n as i32)
                }
                _ => Lambda::Pow(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            },
            Expr::Exp(e) => Lambda::Exp(Box::new(e.compile(vars)?)),
            Expr::Ln(e) => Lambda::Ln(Box::new(e.compile(vars)?)),
            Expr::sin(e) => Lambda::Sin(Box::new(e.compile(vars)?)),
            Expr::cos(e) => Lambda::Cos(Box::new(e.compile(vars)?)),
            Expr::tg(e) => Lambda::Tg(Box::new(e.compile(vars)?)),
            Expr::arctg(e) => Lambda::ArcTg(Box::new(e.compile(vars)?)),
            Expr::erf(e) => Lambda::Erf(Box::new(e.compile(vars)?)),
            Expr::gamma(e) => Lambda::Gamma(Box::new(e.compile(vars)?)),
            Expr::polygamma(n, e) => Lambda::Polygamma(*n, Box::new(e.compile(vars)?)),
        };
        Ok(lambda)
    }
}

#[derive(Clone, Debug)]
pub enum Lambda {
    Var(usize),
    Const(f64),
    Add(Box<Lambda>, Box<Lambda>),
    Sub(Box<Lambda>, Box<Lambda>),
    Mul(Box<Lambda>, Box<Lambda>),
    Div(Box<Lambda>, Box<Lambda>),
    Pow(Box<Lambda>, Box<Lambda>),
    /// integer power
    Powi(Box<Lambda>, i32),
    Exp(Box<Lambda>),
    Ln(Box<Lambda>),
    Sin(Box<Lambda>),
    Cos(Box<Lambda>),
    Tg(Box<Lambda>),
    ArcTg(Box<Lambda>),
    Erf(Box<Lambda>),
    Gamma(Box<Lambda>),
    Polygamma(u32, Box<Lambda>),
}

impl Lambda {
    #[inline(always)]
    pub fn eval(&self, args: &[f64]) -> f64 {
        match self {
            Lambda::Var(i) => args[*i],
            Lambda::Const(v) => *v,
            Lambda::Add(a, b) => a.eval(args) + b.eval(args),
            Lambda::Sub(a, b) => a.eval(args) - b.eval(args),
            Lambda::Mul(a, b) => a.eval(args) * b.eval(args),
            Lambda::Div(a, b) => a.eval(args) / b.eval(args),
            Lambda::Pow(a, b) => a.eval(args).powf(b.eval(args)),
            Lambda::Powi(a, n) => a.eval(args).powi(*n),
            Lambda::Exp(e) => e.eval(args).exp(),
            Lambda::Ln(e) => e.eval(args).ln(),
            Lambda::Sin(e) => e.eval(args).sin(),
            Lambda::Cos(e) => e.eval(args).cos(),
            Lambda::Tg(e) => e.eval(args).tan(),
            Lambda::ArcTg(e) => e.eval(args).atan(),
            Lambda::Erf(e) => special_functions::erf(e.eval(args)),
            Lambda::Gamma(e) => special_functions::gamma(e.eval(args)),
            Lambda::Polygamma(n, e) => special_functions::polygamma(*n, e.eval(args)),
        }
    }

    pub fn as_closure(self) -> impl Fn(&[f64]) -> f64 + Send + Sync {
        move |args| self.eval(args)
    }
}
