/// Levenberg-Marquardt least squares and weighted curve fitting
///  Example#1
/// ```
/// use curve_fitting::numerical::fit_functions::line_function;
/// use curve_fitting::numerical::optimization::curve_fit::curve_fit;
/// use curve_fitting::numerical::optimization::fit_options::FitOptions;
/// let x = [0.0, 1.0, 2.0, 3.0, 4.0];
/// let y = [-1.0, 1.0, 3.0, 5.0, 7.0];
/// let fit = curve_fit(&line_function(), &x, &y, None, &FitOptions::default()).unwrap();
/// assert!((fit.best_fit[0] - 2.0).abs() < 1e-8);
/// ```
pub mod optimization;
/// functions that can be fitted: compiled equations and named closures
pub mod fit_functions;
/// goodness of fit of one function against one dataset
///  Example#2
/// ```
/// use curve_fitting::numerical::fit_functions::line_function;
/// use curve_fitting::numerical::goodness_of_fit::{Goodness, Statistics};
/// let mut good = Goodness::new(
///     line_function(),
///     vec![0.0, 1.0, 2.0, 3.0, 4.0],
///     vec![-1.0, 1.0, 3.0, 5.0, 7.0],
///     None,
/// )
/// .unwrap();
/// good.fit().unwrap();
/// println!("{}", good.report().to_table());
/// ```
pub mod goodness_of_fit;
/// confidence intervals, error weights and linear regression
pub mod fit_utils;
/// fitting many independent sessions in parallel
pub mod batch;
