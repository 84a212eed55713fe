//! # Symbolic Engine Module
//!
//! Expression trees for the fitting models.
//!
//! ## Purpose
//!
//! Every model of the catalog, its derivatives and its integral are represented by one
//! type, [`Expr`], a boxed abstract syntax tree over named symbols and `f64` constants.
//! The engine allows users to:
//! - build expressions with ordinary operators: `a * x.clone().pow(Expr::Const(2.0)) + b`
//! - parse them from text (see `parse_expr`)
//! - differentiate, simplify and integrate them (see the sibling modules)
//! - turn them into executable Rust closures (see `symbolic_lambdify`)
//! - render them as plain text (`Display`) and as LaTeX ([`Expr::to_latex`])
//!
//! ## Function nodes
//!
//! Besides `exp`, `ln` and the trigonometric nodes the tree carries the special
//! functions the distribution models need: `erf`, `gamma` and `polygamma(n, _)`.
//! Derivatives of `gamma` produce `polygamma(0, _)` nodes, and each further derivative
//! raises the polygamma order, so the tree is closed under differentiation.
//!
//! Trigonometric nodes keep the mathematical names `tg` and `arctg`.

use std::collections::BTreeSet;
use std::f64;
use std::fmt;

/// Symbolic expression tree.
///
/// Constants are plain `f64`, symbols are identified by name only: whether a name is an
/// independent variable or a fit constant is decided one level up, by
/// [`crate::symbolic::symbols::SymbolicExpression`].
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Named symbol
    Var(String),
    /// Numerical constant
    Const(f64),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    /// base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    Exp(Box<Expr>),
    /// Natural logarithm
    Ln(Box<Expr>),
    sin(Box<Expr>),
    cos(Box<Expr>),
    /// Tangent
    tg(Box<Expr>),
    /// Arctangent
    arctg(Box<Expr>),
    /// Gauss error function
    erf(Box<Expr>),
    /// Euler gamma function
    gamma(Box<Expr>),
    /// n-th derivative of the digamma function, `polygamma(0, x)` is digamma itself
    polygamma(u32, Box<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => write!(f, "{}", val),
            Expr::Add(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            Expr::Sub(lhs, rhs) => write!(f, "({} - {})", lhs, rhs),
            Expr::Mul(lhs, rhs) => write!(f, "({} * {})", lhs, rhs),
            Expr::Div(lhs, rhs) => write!(f, "({} / {})", lhs, rhs),
            Expr::Pow(base, exp) => write!(f, "({} ^ {})", base, exp),
            Expr::Exp(expr) => write!(f, "exp({})", expr),
            Expr::Ln(expr) => write!(f, "ln({})", expr),
            Expr::sin(expr) => write!(f, "sin({})", expr),
            Expr::cos(expr) => write!(f, "cos({})", expr),
            Expr::tg(expr) => write!(f, "tg({})", expr),
            Expr::arctg(expr) => write!(f, "arctg({})", expr),
            Expr::erf(expr) => write!(f, "erf({})", expr),
            Expr::gamma(expr) => write!(f, "gamma({})", expr),
            Expr::polygamma(n, expr) => write!(f, "polygamma({}, {})", n, expr),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(self))
    }
}

impl Expr {
    /// BASIC FEATURES

    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Symbol from its name
    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    pub fn exp(self) -> Expr {
        Expr::Exp(self.boxed())
    }

    pub fn ln(self) -> Expr {
        Expr::Ln(self.boxed())
    }

    /// Decimal logarithm, stored as `ln(u) / ln(10)`
    pub fn log10(self) -> Expr {
        Expr::Div(self.ln().boxed(), Expr::Const(f64::consts::LN_10).boxed())
    }

    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    pub fn sqrt(self) -> Expr {
        self.pow(Expr::Const(0.5))
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(c) if *c == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Const(c) if *c == 1.0)
    }

    /// Numerical value when the node is a constant
    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(c) => Some(*c),
            _ => None,
        }
    }

    /// Rebuilds the node with `f` applied to every direct child.
    pub fn map_children<F>(&self, mut f: F) -> Expr
    where
        F: FnMut(&Expr) -> Expr,
    {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => Expr::Add(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Sub(lhs, rhs) => Expr::Sub(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Mul(lhs, rhs) => Expr::Mul(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Div(lhs, rhs) => Expr::Div(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Pow(base, exp) => Expr::Pow(f(base).boxed(), f(exp).boxed()),
            Expr::Exp(expr) => Expr::Exp(f(expr).boxed()),
            Expr::Ln(expr) => Expr::Ln(f(expr).boxed()),
            Expr::sin(expr) => Expr::sin(f(expr).boxed()),
            Expr::cos(expr) => Expr::cos(f(expr).boxed()),
            Expr::tg(expr) => Expr::tg(f(expr).boxed()),
            Expr::arctg(expr) => Expr::arctg(f(expr).boxed()),
            Expr::erf(expr) => Expr::erf(f(expr).boxed()),
            Expr::gamma(expr) => Expr::gamma(f(expr).boxed()),
            Expr::polygamma(n, expr) => Expr::polygamma(*n, f(expr).boxed()),
        }
    }

    /// Direct children of the node, left to right.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Var(_) | Expr::Const(_) => Vec::new(),
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => vec![lhs.as_ref(), rhs.as_ref()],
            Expr::Exp(expr)
            | Expr::Ln(expr)
            | Expr::sin(expr)
            | Expr::cos(expr)
            | Expr::tg(expr)
            | Expr::arctg(expr)
            | Expr::erf(expr)
            | Expr::gamma(expr)
            | Expr::polygamma(_, expr) => vec![expr.as_ref()],
        }
    }

    /// Replaces every occurrence of the symbol `var` by `value`.
    pub fn substitute_variable(&self, var: &str, value: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => value.clone(),
            _ => self.map_children(|child| child.substitute_variable(var, value)),
        }
    }

    pub fn rename_variable(&self, old_var: &str, new_var: &str) -> Expr {
        self.substitute_variable(old_var, &Expr::var(new_var))
    }

    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            Expr::Const(_) => false,
            _ => self
                .children()
                .into_iter()
                .any(|child| child.contains_variable(var_name)),
        }
    }

    /// Set of all symbol names occurring in the expression.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut acc = BTreeSet::new();
        self.collect_symbols(&mut acc);
        acc
    }

    fn collect_symbols(&self, acc: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                acc.insert(name.clone());
            }
            _ => {
                for child in self.children() {
                    child.collect_symbols(acc);
                }
            }
        }
    }

    /// Sorted, deduplicated symbol names.
    pub fn all_arguments_are_variables(&self) -> Vec<String> {
        self.free_symbols().into_iter().collect()
    }

    /// Number of nodes in the tree
    pub fn size(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(|child| child.size())
            .sum::<usize>()
    }

    /// LaTeX rendering, used by reports and plotting front ends.
    pub fn to_latex(&self) -> String {
        match self {
            Expr::Var(name) => latex_symbol(name),
            Expr::Const(val) => latex_number(*val),
            Expr::Add(lhs, rhs) => format!("{} + {}", lhs.to_latex(), rhs.to_latex()),
            Expr::Sub(lhs, rhs) => format!("{} - {}", lhs.to_latex(), rhs.latex_wrapped_sum()),
            Expr::Mul(lhs, rhs) => match lhs.as_ref() {
                Expr::Const(c) if *c == -1.0 => format!("-{}", rhs.latex_wrapped_sum()),
                _ => format!(
                    "{} \\cdot {}",
                    lhs.latex_wrapped_sum(),
                    rhs.latex_wrapped_sum()
                ),
            },
            Expr::Div(lhs, rhs) => format!("\\frac{{{}}}{{{}}}", lhs.to_latex(), rhs.to_latex()),
            Expr::Pow(base, exp) => {
                if let Expr::Const(half) = exp.as_ref() {
                    if *half == 0.5 {
                        return format!("\\sqrt{{{}}}", base.to_latex());
                    }
                }
                let base_tex = match base.as_ref() {
                    Expr::Var(_) => base.to_latex(),
                    Expr::Const(c) if *c >= 0.0 => base.to_latex(),
                    _ => format!("\\left({}\\right)", base.to_latex()),
                };
                format!("{}^{{{}}}", base_tex, exp.to_latex())
            }
            Expr::Exp(expr) => format!("e^{{{}}}", expr.to_latex()),
            Expr::Ln(expr) => format!("\\ln\\left({}\\right)", expr.to_latex()),
            Expr::sin(expr) => format!("\\sin\\left({}\\right)", expr.to_latex()),
            Expr::cos(expr) => format!("\\cos\\left({}\\right)", expr.to_latex()),
            Expr::tg(expr) => format!("\\tan\\left({}\\right)", expr.to_latex()),
            Expr::arctg(expr) => format!("\\arctan\\left({}\\right)", expr.to_latex()),
            Expr::erf(expr) => format!("\\operatorname{{erf}}\\left({}\\right)", expr.to_latex()),
            Expr::gamma(expr) => format!("\\Gamma\\left({}\\right)", expr.to_latex()),
            Expr::polygamma(0, expr) => format!("\\psi\\left({}\\right)", expr.to_latex()),
            Expr::polygamma(n, expr) => {
                format!("\\psi^{{({})}}\\left({}\\right)", n, expr.to_latex())
            }
        }
    }

    fn latex_wrapped_sum(&self) -> String {
        match self {
            Expr::Add(..) | Expr::Sub(..) => format!("\\left({}\\right)", self.to_latex()),
            Expr::Const(c) if *c < 0.0 => format!("\\left({}\\right)", self.to_latex()),
            _ => self.to_latex(),
        }
    }
}

fn latex_symbol(name: &str) -> String {
    match name.split_once('_') {
        Some((head, tail)) if !tail.is_empty() => format!("{}_{{{}}}", head, tail),
        _ => name.to_string(),
    }
}

fn latex_number(val: f64) -> String {
    if val == f64::consts::PI {
        "\\pi".to_string()
    } else {
        format!("{}", val)
    }
}
