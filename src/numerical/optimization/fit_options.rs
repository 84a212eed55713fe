//! Options of a curve fit.
//!
//! ```toml
//! initial_guess = [1.0, 0.5]
//! ftol = 1e-10
//! xtol = 1e-10
//! gtol = 0.0
//! patience = 100
//! initial_damping = 1e-3
//! scale_diag = true
//! absolute_sigma = false
//! ```
//! Every key is optional; unknown keys are rejected.
use crate::error::{CurveFitError, Result};
use crate::numerical::optimization::LM_optimization::LevenbergMarquardt;
use toml::{Table, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Starting parameters; all ones when `None`.
    pub initial_guess: Option<Vec<f64>>,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Evaluation budget factor: at most `patience·(k+1)` residual evaluations.
    pub patience: usize,
    pub initial_damping: f64,
    pub scale_diag: bool,
    /// When `false` the covariance is scaled by the reduced chi-square
    /// `Σ(rᵢ/σᵢ)² / (n - k)`; when `true` `yerror` is taken as absolute.
    pub absolute_sigma: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            initial_guess: None,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            patience: 200,
            initial_damping: 1.0e-3,
            scale_diag: true,
            absolute_sigma: false,
        }
    }
}

fn as_float(key: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Integer(i) => Ok(*i as f64),
        other => Err(CurveFitError::Config(format!(
            "'{}' must be a number, found {}",
            key,
            other.type_str()
        ))),
    }
}

fn as_bool(key: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| CurveFitError::Config(format!("'{}' must be a boolean", key)))
}

impl FitOptions {
    pub fn new() -> Self {
        FitOptions::default()
    }

    #[must_use]
    pub fn with_initial_guess(self, initial_guess: Vec<f64>) -> Self {
        Self {
            initial_guess: Some(initial_guess),
            ..self
        }
    }

    #[must_use]
    pub fn with_ftol(self, ftol: f64) -> Self {
        Self { ftol, ..self }
    }

    #[must_use]
    pub fn with_xtol(self, xtol: f64) -> Self {
        Self { xtol, ..self }
    }

    #[must_use]
    pub fn with_gtol(self, gtol: f64) -> Self {
        Self { gtol, ..self }
    }

    #[must_use]
    pub fn with_patience(self, patience: usize) -> Self {
        Self { patience, ..self }
    }

    #[must_use]
    pub fn with_initial_damping(self, initial_damping: f64) -> Self {
        Self {
            initial_damping,
            ..self
        }
    }

    #[must_use]
    pub fn with_scale_diag(self, scale_diag: bool) -> Self {
        Self { scale_diag, ..self }
    }

    #[must_use]
    pub fn with_absolute_sigma(self, absolute_sigma: bool) -> Self {
        Self {
            absolute_sigma,
            ..self
        }
    }

    /// Checks every option; `k` is the number of fit parameters.
    pub fn validate(&self, k: usize) -> Result<()> {
        for (name, tol) in [("ftol", self.ftol), ("xtol", self.xtol), ("gtol", self.gtol)] {
            if !(tol >= 0.0 && tol.is_finite()) {
                return Err(CurveFitError::InvalidOption(format!(
                    "{} must be a finite number >= 0, got {}",
                    name, tol
                )));
            }
        }
        if self.patience == 0 {
            return Err(CurveFitError::InvalidOption("patience must be > 0".to_string()));
        }
        if !(self.initial_damping > 0.0 && self.initial_damping.is_finite()) {
            return Err(CurveFitError::InvalidOption(format!(
                "initial_damping must be > 0, got {}",
                self.initial_damping
            )));
        }
        if let Some(guess) = &self.initial_guess {
            if guess.len() != k {
                return Err(CurveFitError::ShapeMismatch {
                    what: "initial_guess",
                    expected: k,
                    found: guess.len(),
                });
            }
            if guess.iter().any(|g| !g.is_finite()) {
                return Err(CurveFitError::InvalidOption(
                    "initial_guess must be finite".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Starting point for `k` parameters.
    pub fn starting_point(&self, k: usize) -> Vec<f64> {
        self.initial_guess.clone().unwrap_or_else(|| vec![1.0; k])
    }

    /// The solver configured by these options. Call [`FitOptions::validate`] first.
    pub fn solver(&self) -> LevenbergMarquardt {
        LevenbergMarquardt::new()
            .with_ftol(self.ftol)
            .with_xtol(self.xtol)
            .with_gtol(self.gtol)
            .with_patience(self.patience)
            .with_initial_damping(self.initial_damping)
            .with_scale_diag(self.scale_diag)
    }

    /// Reads options from a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table: Table =
            toml::from_str(text).map_err(|e| CurveFitError::Config(e.to_string()))?;
        let mut options = FitOptions::default();
        for (key, value) in table.iter() {
            match key.as_str() {
                "initial_guess" => {
                    let array = value.as_array().ok_or_else(|| {
                        CurveFitError::Config("'initial_guess' must be an array".to_string())
                    })?;
                    let guess = array
                        .iter()
                        .map(|v| as_float(key, v))
                        .collect::<Result<Vec<f64>>>()?;
                    options.initial_guess = Some(guess);
                }
                "ftol" => options.ftol = as_float(key, value)?,
                "xtol" => options.xtol = as_float(key, value)?,
                "gtol" => options.gtol = as_float(key, value)?,
                "initial_damping" => options.initial_damping = as_float(key, value)?,
                "patience" => {
                    options.patience = value
                        .as_integer()
                        .and_then(|p| usize::try_from(p).ok())
                        .ok_or_else(|| {
                            CurveFitError::Config(
                                "'patience' must be a non-negative integer".to_string(),
                            )
                        })?;
                }
                "scale_diag" => options.scale_diag = as_bool(key, value)?,
                "absolute_sigma" => options.absolute_sigma = as_bool(key, value)?,
                unknown => {
                    return Err(CurveFitError::Config(format!("unknown key '{}'", unknown)));
                }
            }
        }
        Ok(options)
    }
}
