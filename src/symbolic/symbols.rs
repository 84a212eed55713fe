//! Symbols with roles and the [`SymbolicExpression`] value object.
//!
//! A [`Symbol`] is a name plus an immutable [`SymbolRole`]: the independent axis is a
//! `Variable`, every fittable parameter is a `Constant`. A [`SymbolicExpression`] wraps one
//! formula together with the roles of its free symbols and fixes the positional argument
//! order used by everything downstream:
//!
//! `args = variables (sorted by name) ++ constants (sorted by name)`
//!
//! Names are compared byte-wise, so upper-case names sort before lower-case ones
//! (`["x", "A0", "A1", "B1"]`, `["x", "Bmax", "Kd"]`).
use crate::error::{CurveFitError, Result};
use crate::symbolic::symbolic_engine::Expr;
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum SymbolRole {
    /// ranges over the data domain
    Variable,
    /// fit parameter
    Constant,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    name: String,
    role: SymbolRole,
}

impl Symbol {
    pub fn new(name: &str, role: SymbolRole) -> Self {
        Symbol {
            name: name.to_string(),
            role,
        }
    }

    pub fn variable(name: &str) -> Self {
        Symbol::new(name, SymbolRole::Variable)
    }

    pub fn constant(name: &str) -> Self {
        Symbol::new(name, SymbolRole::Constant)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> SymbolRole {
        self.role
    }

    pub fn is_constant(&self) -> bool {
        self.role == SymbolRole::Constant
    }

    /// The symbol as an expression leaf
    pub fn expr(&self) -> Expr {
        Expr::Var(self.name.clone())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A named formula whose free symbols all carry a declared role.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolicExpression {
    name: String,
    expression: Expr,
    variables: Vec<Symbol>,
    constants: Vec<Symbol>,
}

impl SymbolicExpression {
    /// Wraps `expression`, taking the role of each free symbol from `declared`.
    ///
    /// Declared symbols that do not occur in the formula are ignored. Fails with
    /// `UndeclaredSymbol` when a free symbol has no declaration and with `ConflictingRole`
    /// when a name is declared with both roles.
    pub fn new(name: &str, expression: Expr, declared: &[Symbol]) -> Result<Self> {
        let mut roles: HashMap<&str, SymbolRole> = HashMap::new();
        for symbol in declared {
            match roles.insert(symbol.name(), symbol.role()) {
                Some(previous) if previous != symbol.role() => {
                    return Err(CurveFitError::ConflictingRole(symbol.name().to_string()));
                }
                _ => {}
            }
        }
        let mut variables = Vec::new();
        let mut constants = Vec::new();
        // free_symbols is a BTreeSet, already in byte order
        for free in expression.free_symbols() {
            match roles.get(free.as_str()) {
                Some(SymbolRole::Variable) => variables.push(Symbol::variable(&free)),
                Some(SymbolRole::Constant) => constants.push(Symbol::constant(&free)),
                None => return Err(CurveFitError::UndeclaredSymbol(free)),
            }
        }
        Ok(SymbolicExpression {
            name: name.to_string(),
            expression,
            variables,
            constants,
        })
    }

    /// Every free symbol listed in `variables` is a variable, every other one a constant.
    pub fn with_variables(name: &str, expression: Expr, variables: &[&str]) -> Result<Self> {
        let declared = expression
            .free_symbols()
            .iter()
            .map(|free| {
                if variables.contains(&free.as_str()) {
                    Symbol::variable(free)
                } else {
                    Symbol::constant(free)
                }
            })
            .collect::<Vec<_>>();
        SymbolicExpression::new(name, expression, &declared)
    }

    /// Parses formula text, see [`Expr::parse_expression`].
    pub fn parse(name: &str, text: &str, declared: &[Symbol]) -> Result<Self> {
        let expression = Expr::parse_expression(text)?;
        SymbolicExpression::new(name, expression, declared)
    }

    /// [`SymbolicExpression::with_variables`] over parsed formula text.
    pub fn parse_with_variables(name: &str, text: &str, variables: &[&str]) -> Result<Self> {
        let expression = Expr::parse_expression(text)?;
        SymbolicExpression::with_variables(name, expression, variables)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    /// Symbols tagged `Variable`, sorted by name.
    pub fn variables(&self) -> &[Symbol] {
        &self.variables
    }

    /// Symbols tagged `Constant`, sorted by name.
    pub fn constants(&self) -> &[Symbol] {
        &self.constants
    }

    /// `variables() ++ constants()`, the positional argument order.
    pub fn args(&self) -> Vec<Symbol> {
        self.variables
            .iter()
            .chain(self.constants.iter())
            .cloned()
            .collect()
    }

    /// Names of `args()` in the same order.
    pub fn names(&self) -> Vec<String> {
        self.arg_names().into_iter().map(str::to_string).collect()
    }

    pub fn arg_names(&self) -> Vec<&str> {
        self.variables
            .iter()
            .chain(self.constants.iter())
            .map(Symbol::name)
            .collect()
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(Symbol::name).collect()
    }

    pub fn to_latex(&self) -> String {
        self.expression.to_latex()
    }
}

impl fmt::Display for SymbolicExpression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}({}) = {}",
            self.name,
            self.arg_names().iter().join(", "),
            self.expression
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian_like() -> Expr {
        let [x, mu, sigma] = ["x", "mu", "sigma"].map(Expr::var);
        (-(x - mu).pow(Expr::Const(2.0)) / (Expr::Const(2.0) * sigma.pow(Expr::Const(2.0)))).exp()
    }

    #[test]
    fn test_args_are_variables_then_constants() {
        let declared = [
            Symbol::constant("sigma"),
            Symbol::constant("mu"),
            Symbol::variable("x"),
        ];
        let expr = SymbolicExpression::new("Gaussian", gaussian_like(), &declared).unwrap();
        assert_eq!(expr.names(), vec!["x", "mu", "sigma"]);
        assert_eq!(expr.variables(), &[Symbol::variable("x")]);
        assert_eq!(
            expr.constants(),
            &[Symbol::constant("mu"), Symbol::constant("sigma")]
        );
        let args = expr.args();
        assert_eq!(args[0].role(), SymbolRole::Variable);
        assert!(args[1..].iter().all(Symbol::is_constant));
        // stable across calls
        assert_eq!(expr.names(), expr.names());
    }

    #[test]
    fn test_byte_order_puts_upper_case_first() {
        let expr = SymbolicExpression::parse(
            "Pade",
            "(A0 + A1*x)/(1 + B1*x)",
            &[
                Symbol::variable("x"),
                Symbol::constant("B1"),
                Symbol::constant("A1"),
                Symbol::constant("A0"),
            ],
        )
        .unwrap();
        assert_eq!(expr.names(), vec!["x", "A0", "A1", "B1"]);
        let expr = SymbolicExpression::with_variables(
            "mixed",
            Expr::parse_expression("b*x + Kd*t").unwrap(),
            &["x", "t"],
        )
        .unwrap();
        assert_eq!(expr.names(), vec!["t", "x", "Kd", "b"]);
    }

    #[test]
    fn test_undeclared_and_conflicting_symbols() {
        let err = SymbolicExpression::new("g", gaussian_like(), &[Symbol::variable("x")]);
        assert_eq!(err, Err(CurveFitError::UndeclaredSymbol("mu".to_string())));
        let err = SymbolicExpression::new(
            "g",
            gaussian_like(),
            &[Symbol::variable("x"), Symbol::constant("x")],
        );
        assert_eq!(err, Err(CurveFitError::ConflictingRole("x".to_string())));
        let err = SymbolicExpression::parse("bad", "x +", &[Symbol::variable("x")]);
        assert!(matches!(err, Err(CurveFitError::Parse { .. })));
    }

    #[test]
    fn test_unused_declarations_are_ignored() {
        let expr = SymbolicExpression::new(
            "line",
            Expr::var("m") * Expr::var("x"),
            &[
                Symbol::variable("x"),
                Symbol::constant("m"),
                Symbol::constant("b"),
            ],
        )
        .unwrap();
        assert_eq!(expr.names(), vec!["x", "m"]);
        assert_eq!(expr.to_string(), "line(x, m) = (m * x)");
    }
}
