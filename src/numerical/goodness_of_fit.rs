//! Goodness of fit of one function against one dataset.
//!
//! A [`Goodness`] session owns `xdata`, `ydata` and the optional `yerror` (standard
//! deviations of `y`). [`Goodness::fit`] runs a weighted Levenberg-Marquardt fit and
//! stores `best_fit` and `covariance`. When the fit does not converge a warning naming
//! the function is logged and both are filled with NaN, so every statistic below stays
//! defined and propagates NaN.
//!
//! The statistics live in the [`Statistics`] trait, implemented by the session itself
//! and by [`FitView`], which evaluates the same fitted parameters against another
//! function (e.g. the derivative or integral of the fitted equation) without refitting.
//!
//! | statistic | definition                      |
//! |-----------|---------------------------------|
//! | ssr       | Σ (y - f(x))²                   |
//! | sse       | Σ (y - ȳ)²                      |
//! | rmse      | √(ssr / n)                      |
//! | syx       | √(ssr / (n - k))                |
//! | rsq       | 1 - ssr / sse                   |
//! | rsq_adj   | (1 - rsq) (n - 1) / (k - 1)     |
use crate::Utils::report_table::table_of;
use crate::error::{CurveFitError, Result};
use crate::numerical::fit_functions::FitFunction;
use crate::numerical::fit_utils::ci_x;
use crate::numerical::optimization::LM_optimization::TerminationReason;
use crate::numerical::optimization::curve_fit::curve_fit;
use crate::numerical::optimization::fit_options::FitOptions;
use itertools::Itertools;
use log::{debug, info, warn};
use nalgebra::DMatrix;

/// Keys of [`FitReport::entries`], in order.
pub const REPORT_KEYS: [&str; 10] = [
    "Variables",
    "Fit",
    "StDev",
    "SSR",
    "SyX",
    "SSE",
    "RMSE",
    "RSQ",
    "RSQ (Adjusted)",
    "Equation",
];

/// Summary of a fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub variables: Vec<String>,
    pub fit: Vec<f64>,
    pub stdev: Vec<f64>,
    pub ssr: f64,
    pub syx: f64,
    pub sse: f64,
    pub rmse: f64,
    pub rsq: f64,
    pub rsq_adj: f64,
    pub equation: String,
}

fn list(values: &[f64]) -> String {
    format!("[{}]", values.iter().join(", "))
}

impl FitReport {
    /// `(key, value)` pairs keyed by [`REPORT_KEYS`].
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let values = [
            format!("[{}]", self.variables.join(", ")),
            list(&self.fit),
            list(&self.stdev),
            self.ssr.to_string(),
            self.syx.to_string(),
            self.sse.to_string(),
            self.rmse.to_string(),
            self.rsq.to_string(),
            self.rsq_adj.to_string(),
            self.equation.clone(),
        ];
        REPORT_KEYS.into_iter().zip(values).collect()
    }

    pub fn to_table(&self) -> String {
        table_of(self.entries())
    }
}

/// Fit-quality statistics of fitted parameters against a function and a dataset.
pub trait Statistics {
    fn function(&self) -> &dyn FitFunction;
    fn xdata(&self) -> &[f64];
    fn ydata(&self) -> &[f64];
    fn best_fit(&self) -> &[f64];
    fn covariance(&self) -> &DMatrix<f64>;

    /// Parameter names, in the order of `best_fit`.
    fn parameters(&self) -> Vec<String> {
        self.function().parameter_names()
    }

    /// Standard deviations of the parameters, `√diag(covariance)`.
    fn std(&self) -> Vec<f64> {
        self.covariance().diagonal().iter().map(|c| c.sqrt()).collect()
    }

    /// The function at `xdata` with `best_fit`.
    fn expected(&self) -> Vec<f64> {
        self.expect(self.xdata())
    }

    /// The function at arbitrary `x` with `best_fit`.
    fn expect(&self, x: &[f64]) -> Vec<f64> {
        self.function().eval_many(x, self.best_fit())
    }

    fn residuals(&self) -> Vec<f64> {
        self.ydata()
            .iter()
            .zip(self.expected())
            .map(|(y, e)| y - e)
            .collect()
    }

    /// Sum of squared residuals.
    fn ssr(&self) -> f64 {
        self.residuals().iter().map(|r| r * r).sum()
    }

    /// Distance of each `y` from the mean of `ydata`.
    fn dfm(&self) -> Vec<f64> {
        let y = self.ydata();
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        y.iter().map(|v| v - mean).collect()
    }

    /// Total sum of squares.
    fn sse(&self) -> f64 {
        self.dfm().iter().map(|d| d * d).sum()
    }

    /// Number of observations, `n`.
    fn dof(&self) -> usize {
        self.ydata().len()
    }

    /// Number of parameters.
    fn k(&self) -> usize {
        self.function().k()
    }

    fn rmse(&self) -> f64 {
        (self.ssr() / self.dof() as f64).sqrt()
    }

    /// RMSE with `n - k` degrees of freedom; infinite or NaN when `n <= k`.
    fn syx(&self) -> f64 {
        (self.ssr() / (self.dof() as f64 - self.k() as f64)).sqrt()
    }

    fn rsq(&self) -> f64 {
        1.0 - self.ssr() / self.sse()
    }

    /// `(1 - rsq)·(n - 1)/(k - 1)`.
    fn rsq_adj(&self) -> f64 {
        (1.0 - self.rsq()) * (self.dof() as f64 - 1.0) / (self.k() as f64 - 1.0)
    }

    fn report(&self) -> FitReport {
        FitReport {
            variables: self.parameters(),
            fit: self.best_fit().to_vec(),
            stdev: self.std(),
            ssr: self.ssr(),
            syx: self.syx(),
            sse: self.sse(),
            rmse: self.rmse(),
            rsq: self.rsq(),
            rsq_adj: self.rsq_adj(),
            equation: self.function().name().to_string(),
        }
    }

    /// Curves `f(x; best_fit - c)` and `f(x; best_fit + c)` with `c = ci_x(std, p)`
    /// per parameter.
    fn confidence_band(&self, x: &[f64], p: f64) -> Result<(Vec<f64>, Vec<f64>)> {
        let half_widths = self
            .std()
            .into_iter()
            .map(|s| ci_x(s, p))
            .collect::<Result<Vec<f64>>>()?;
        let best = self.best_fit();
        let lower: Vec<f64> = best.iter().zip(&half_widths).map(|(b, c)| b - c).collect();
        let upper: Vec<f64> = best.iter().zip(&half_widths).map(|(b, c)| b + c).collect();
        let function = self.function();
        Ok((function.eval_many(x, &lower), function.eval_many(x, &upper)))
    }
}

/// One fitting session.
pub struct Goodness<F: FitFunction> {
    function: F,
    xdata: Vec<f64>,
    ydata: Vec<f64>,
    yerror: Option<Vec<f64>>,
    best_fit: Vec<f64>,
    covariance: DMatrix<f64>,
    fitted: bool,
    termination: Option<TerminationReason>,
}

fn nan_result(k: usize) -> (Vec<f64>, DMatrix<f64>) {
    (vec![f64::NAN; k], DMatrix::from_element(k, k, f64::NAN))
}

impl<F: FitFunction> Goodness<F> {
    /// `xdata`, `ydata` and `yerror` must have equal lengths.
    pub fn new(function: F, xdata: Vec<f64>, ydata: Vec<f64>, yerror: Option<Vec<f64>>) -> Result<Self> {
        let n = xdata.len();
        if ydata.len() != n {
            return Err(CurveFitError::ShapeMismatch {
                what: "ydata",
                expected: n,
                found: ydata.len(),
            });
        }
        if let Some(e) = &yerror {
            if e.len() != n {
                return Err(CurveFitError::ShapeMismatch {
                    what: "yerror",
                    expected: n,
                    found: e.len(),
                });
            }
        }
        let (best_fit, covariance) = nan_result(function.k());
        Ok(Goodness {
            function,
            xdata,
            ydata,
            yerror,
            best_fit,
            covariance,
            fitted: false,
            termination: None,
        })
    }

    /// Session with a known result, e.g. from an earlier fit.
    pub fn with_fit(mut self, best_fit: Vec<f64>, covariance: DMatrix<f64>) -> Result<Self> {
        let k = self.function.k();
        if best_fit.len() != k {
            return Err(CurveFitError::ShapeMismatch {
                what: "best_fit",
                expected: k,
                found: best_fit.len(),
            });
        }
        if covariance.shape() != (k, k) {
            return Err(CurveFitError::ShapeMismatch {
                what: "covariance",
                expected: k * k,
                found: covariance.len(),
            });
        }
        self.best_fit = best_fit;
        self.covariance = covariance;
        self.fitted = true;
        Ok(self)
    }

    /// Fits with default options.
    pub fn fit(&mut self) -> Result<()> {
        self.fit_with(&FitOptions::default())
    }

    /// Fits with `options`. Invalid options are an error and leave the session
    /// untouched; a fit that fails to converge is not.
    pub fn fit_with(&mut self, options: &FitOptions) -> Result<()> {
        let k = self.function.k();
        options.validate(k)?;
        info!(
            "fitting {} ({} parameters) to {} points",
            self.function.name(),
            k,
            self.xdata.len()
        );
        match curve_fit(
            &self.function,
            &self.xdata,
            &self.ydata,
            self.yerror.as_deref(),
            options,
        ) {
            Ok(fit) => {
                debug!("{} best fit: {:?}", self.function.name(), fit.best_fit);
                self.best_fit = fit.best_fit;
                self.covariance = fit.covariance;
                self.termination = Some(fit.report.termination);
            }
            Err(reason) => {
                warn!("Data Failed to be Fit using: {}", self.function.name());
                debug!("termination: {:?}", reason);
                let (best_fit, covariance) = nan_result(k);
                self.best_fit = best_fit;
                self.covariance = covariance;
                self.termination = Some(reason);
            }
        }
        self.fitted = true;
        Ok(())
    }

    /// `true` after [`Goodness::fit`] (converged or not) or [`Goodness::with_fit`].
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Why the last fit stopped; `None` before any fit.
    pub fn termination(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    pub fn yerror(&self) -> Option<&[f64]> {
        self.yerror.as_deref()
    }

    pub fn fit_function(&self) -> &F {
        &self.function
    }

    /// The fitted parameters evaluated against `function` instead of the fitted one.
    /// `function` must take the same number of parameters.
    pub fn view<G: FitFunction>(&self, function: G) -> Result<FitView<'_, G>> {
        let k = self.function.k();
        if function.k() != k {
            return Err(CurveFitError::ShapeMismatch {
                what: "parameters",
                expected: k,
                found: function.k(),
            });
        }
        Ok(FitView {
            function,
            xdata: &self.xdata,
            ydata: &self.ydata,
            best_fit: &self.best_fit,
            covariance: &self.covariance,
        })
    }
}

impl<F: FitFunction> Statistics for Goodness<F> {
    fn function(&self) -> &dyn FitFunction {
        &self.function
    }
    fn xdata(&self) -> &[f64] {
        &self.xdata
    }
    fn ydata(&self) -> &[f64] {
        &self.ydata
    }
    /// NaN before the first fit.
    fn best_fit(&self) -> &[f64] {
        &self.best_fit
    }
    fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }
}

/// Read-only statistics of a session's result against another function.
pub struct FitView<'a, G: FitFunction> {
    function: G,
    xdata: &'a [f64],
    ydata: &'a [f64],
    best_fit: &'a [f64],
    covariance: &'a DMatrix<f64>,
}

impl<G: FitFunction> Statistics for FitView<'_, G> {
    fn function(&self) -> &dyn FitFunction {
        &self.function
    }
    fn xdata(&self) -> &[f64] {
        self.xdata
    }
    fn ydata(&self) -> &[f64] {
        self.ydata
    }
    fn best_fit(&self) -> &[f64] {
        self.best_fit
    }
    fn covariance(&self) -> &DMatrix<f64> {
        self.covariance
    }
}
