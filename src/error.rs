use std::fmt;

/// Errors raised while building expressions, equations and fitting sessions.
///
/// A fit that fails to converge is not an error: it is logged and the session
/// is left with NaN-filled results (see [`crate::numerical::goodness_of_fit::Goodness::fit`]).
#[derive(Debug, Clone, PartialEq)]
pub enum CurveFitError {
    /// Formula text could not be parsed.
    Parse {
        input: String,
        position: usize,
        message: String,
    },
    /// A free symbol of a formula has no declared role.
    UndeclaredSymbol(String),
    /// The same symbol name was declared both as a variable and as a constant.
    ConflictingRole(String),
    /// The integrator found no closed form for the integrand.
    UnsupportedClosedForm { integrand: String, var: String },
    /// An expression has no variable to differentiate or integrate against.
    NoVariable(String),
    /// A numeric function was compiled against an argument list missing a free symbol.
    UnknownArgument(String),
    /// A numeric function was called with the wrong number of positional arguments.
    ArgumentCount { expected: usize, found: usize },
    /// Observed data sequences do not have matching lengths.
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// A solver option or a statistical parameter is out of range.
    InvalidOption(String),
    /// Fit options could not be read from TOML.
    Config(String),
}

impl fmt::Display for CurveFitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CurveFitError::Parse {
                input,
                position,
                message,
            } => write!(
                f,
                "cannot parse '{}' at position {}: {}",
                input, position, message
            ),
            CurveFitError::UndeclaredSymbol(name) => {
                write!(f, "symbol '{}' has no declared role", name)
            }
            CurveFitError::ConflictingRole(name) => write!(
                f,
                "symbol '{}' is declared both as a variable and as a constant",
                name
            ),
            CurveFitError::UnsupportedClosedForm { integrand, var } => write!(
                f,
                "no closed form for the integral of {} with respect to {}",
                integrand, var
            ),
            CurveFitError::NoVariable(name) => {
                write!(f, "expression '{}' has no variable", name)
            }
            CurveFitError::UnknownArgument(name) => {
                write!(f, "symbol '{}' is not in the argument list", name)
            }
            CurveFitError::ArgumentCount { expected, found } => write!(
                f,
                "expected {} positional arguments, found {}",
                expected, found
            ),
            CurveFitError::ShapeMismatch {
                what,
                expected,
                found,
            } => write!(
                f,
                "{} must have length {}, found {}",
                what, expected, found
            ),
            CurveFitError::InvalidOption(msg) => write!(f, "invalid option: {}", msg),
            CurveFitError::Config(msg) => write!(f, "invalid fit configuration: {}", msg),
        }
    }
}

impl std::error::Error for CurveFitError {}

pub type Result<T> = std::result::Result<T, CurveFitError>;
