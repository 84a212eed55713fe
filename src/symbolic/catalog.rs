//! Named model equations.
//!
//! Every entry uses `x` as the independent variable; every other symbol is a fit parameter.
//!
//! | name                        | formula                                                   |
//! |-----------------------------|-----------------------------------------------------------|
//! | VariableSlopeDoseResponse   | `baseline + (peak - baseline)/(1 + 10^((pEC50 - x) HillSlope))` |
//! | BoltzmanSigmoidal           | `baseline + (peak - baseline)/(1 + exp((pEC50 - x)/HillSlope))` |
//! | OneSiteTotalBinding         | `Bmax x/(Kd + x) + NS x + baseline`                       |
//! | OneSiteSpecificBinding      | `Bmax x/(Kd + x)`                                         |
//! | SlopedSpecificBinding       | `Bmax x^HillSlope/(Kd^HillSlope + x^HillSlope)`           |
//! | PadeApproximant             | `(A0 + A1 x)/(1 + B1 x)`                                  |
//! | DissociationKinetics        | `(Y0 - NS) exp(-K x) + NS`                                |
//! | ExponentialGrowth           | `Y0 exp(K x)`                                             |
//! | Parabola                    | `a x^2 + b x + c`                                         |
//! | Gaussian                    | `exp(-(x - mu)^2/(2 sigma^2))/(sigma sqrt(2 pi))`         |
//! | Poisson                     | `mu^x exp(-mu)/x!`                                        |
use crate::error::Result;
use crate::symbolic::symbols::SymbolicExpression;
use strum_macros::{Display, EnumIter};

/// The independent variable shared by the whole catalog.
pub const VARIABLE: &str = "x";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum NamedEquation {
    VariableSlopeDoseResponse,
    BoltzmanSigmoidal,
    OneSiteTotalBinding,
    OneSiteSpecificBinding,
    SlopedSpecificBinding,
    PadeApproximant,
    DissociationKinetics,
    ExponentialGrowth,
    Parabola,
    Gaussian,
    Poisson,
}

impl NamedEquation {
    /// Formula text in the syntax accepted by `Expr::parse_expression`.
    pub fn formula(&self) -> &'static str {
        match self {
            NamedEquation::VariableSlopeDoseResponse => {
                "baseline + (peak - baseline)/(1 + 10^((pEC50 - x)*HillSlope))"
            }
            NamedEquation::BoltzmanSigmoidal => {
                "baseline + (peak - baseline)/(1 + exp((pEC50 - x)/HillSlope))"
            }
            NamedEquation::OneSiteTotalBinding => "Bmax*x/(Kd + x) + NS*x + baseline",
            NamedEquation::OneSiteSpecificBinding => "Bmax*x/(Kd + x)",
            NamedEquation::SlopedSpecificBinding => {
                "Bmax*x^HillSlope/(Kd^HillSlope + x^HillSlope)"
            }
            NamedEquation::PadeApproximant => "(A0 + A1*x)/(1 + B1*x)",
            NamedEquation::DissociationKinetics => "(Y0 - NS)*exp(-K*x) + NS",
            NamedEquation::ExponentialGrowth => "Y0*exp(K*x)",
            NamedEquation::Parabola => "a*x^2 + b*x + c",
            NamedEquation::Gaussian => "exp(-(x - mu)^2/(2*sigma^2))/(sigma*sqrt(2*pi))",
            NamedEquation::Poisson => "mu^x*exp(-mu)/factorial(x)",
        }
    }

    /// The formula with `x` declared as variable and every other symbol as constant.
    pub fn expression(&self) -> Result<SymbolicExpression> {
        SymbolicExpression::parse_with_variables(&self.to_string(), self.formula(), &[VARIABLE])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_names() {
        let cases: [(NamedEquation, &[&str]); 5] = [
            (NamedEquation::Gaussian, &["x", "mu", "sigma"]),
            (NamedEquation::Poisson, &["x", "mu"]),
            (NamedEquation::Parabola, &["x", "a", "b", "c"]),
            (NamedEquation::PadeApproximant, &["x", "A0", "A1", "B1"]),
            (NamedEquation::OneSiteSpecificBinding, &["x", "Bmax", "Kd"]),
        ];
        for (equation, names) in cases {
            assert_eq!(equation.expression().unwrap().names(), names);
        }
    }

    #[test]
    fn test_every_entry_has_one_variable_first() {
        for equation in NamedEquation::iter() {
            let expr = equation.expression().unwrap();
            assert_eq!(expr.variable_names(), vec![VARIABLE], "{}", equation);
            assert_eq!(expr.args()[0].name(), VARIABLE);
            let constants: Vec<&str> = expr.constants().iter().map(|s| s.name()).collect();
            let mut sorted = constants.clone();
            sorted.sort();
            assert_eq!(constants, sorted);
            assert_eq!(expr.name(), equation.to_string());
        }
    }

    #[test]
    fn test_dose_response_parameters() {
        let expr = NamedEquation::VariableSlopeDoseResponse.expression().unwrap();
        assert_eq!(
            expr.names(),
            vec!["x", "HillSlope", "baseline", "pEC50", "peak"]
        );
    }
}
