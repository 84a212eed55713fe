//! Fitting many independent sessions in parallel.
//!
//! Every session owns its data, so sessions are fitted on the rayon pool without any
//! locking. A session that fails to converge ends in its NaN state and the batch
//! carries on.
use crate::error::Result;
use crate::numerical::fit_functions::FitFunction;
use crate::numerical::goodness_of_fit::{FitReport, Goodness, Statistics};
use crate::numerical::optimization::fit_options::FitOptions;
use crate::symbolic::equation::Equation;
use log::info;
use rayon::prelude::*; //parallel processing library

/// Fits every session with the same options; one result per session, in order.
pub fn fit_many<F: FitFunction>(sessions: &mut [Goodness<F>], options: &FitOptions) -> Vec<Result<()>> {
    let results: Vec<Result<()>> = sessions
        .par_iter_mut()
        .map(|session| session.fit_with(options))
        .collect();
    let failed = sessions
        .iter()
        .filter(|s| s.termination().is_some_and(|t| !t.was_successful()))
        .count();
    info!("fitted {} sessions, {} did not converge", sessions.len(), failed);
    results
}

/// Fits each equation to the same dataset and reports on it.
///
/// Errors (mismatched data lengths, invalid options) are returned per equation;
/// non-converged fits give a NaN report.
pub fn fit_equations(
    equations: &[Equation],
    xdata: &[f64],
    ydata: &[f64],
    yerror: Option<&[f64]>,
    options: &FitOptions,
) -> Vec<Result<FitReport>> {
    equations
        .par_iter()
        .map(|equation| -> Result<FitReport> {
            let mut session = Goodness::new(
                equation.equation(),
                xdata.to_vec(),
                ydata.to_vec(),
                yerror.map(|e| e.to_vec()),
            )?;
            session.fit_with(options)?;
            Ok(session.report())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CurveFitError;
    use crate::numerical::fit_functions::{ClosureFunction, line_function};
    use crate::symbolic::catalog::NamedEquation;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_many_continues_past_failures() {
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let session = |f: Box<dyn FitFunction>, y: Vec<f64>| {
            Goodness::new(f, x.clone(), y, None).unwrap()
        };
        let broken = ClosureFunction::new("broken", &["a", "b"], |_, _| f64::NAN);
        let mut sessions = vec![
            session(Box::new(line_function()), vec![1.0, 3.0, 5.0, 7.0]),
            session(Box::new(broken), vec![1.0, 3.0, 5.0, 7.0]),
            session(Box::new(line_function()), vec![0.0, -1.0, -2.0, -3.0]),
        ];
        let results = fit_many(&mut sessions, &FitOptions::default());
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_relative_eq!(sessions[0].best_fit()[0], 2.0, epsilon = 1e-8);
        assert!(sessions[1].best_fit().iter().all(|p| p.is_nan()));
        assert_relative_eq!(sessions[2].best_fit()[0], -1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_fit_many_reports_invalid_options() {
        let mut sessions = vec![
            Goodness::new(line_function(), vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0], None).unwrap(),
        ];
        let options = FitOptions::default().with_initial_guess(vec![1.0, 1.0, 1.0]);
        let results = fit_many(&mut sessions, &options);
        assert!(matches!(results[0], Err(CurveFitError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_fit_equations() {
        let equations: Vec<Equation> = [NamedEquation::Parabola, NamedEquation::ExponentialGrowth]
            .into_iter()
            .map(|named| Equation::from_named(named).unwrap())
            .collect();
        let x: Vec<f64> = (0..8).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|x| 0.5 * x * x - x + 2.0).collect();
        let reports = fit_equations(&equations, &x, &y, None, &FitOptions::default());
        assert_eq!(reports.len(), 2);
        let parabola = reports[0].as_ref().unwrap();
        assert_eq!(parabola.equation, "Parabola");
        assert_relative_eq!(parabola.fit[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(parabola.fit[1], -1.0, epsilon = 1e-6);
        assert_relative_eq!(parabola.fit[2], 2.0, epsilon = 1e-6);
        assert!(reports[1].is_ok());

        let short = fit_equations(&equations, &x, &y[..3], None, &FitOptions::default());
        assert!(short.iter().all(|r| r.is_err()));
    }
}
