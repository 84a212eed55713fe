#[allow(non_snake_case)]
/// main function to solve nonlinear least squares problems with the Levenberg-Marquardt algorithm
pub mod problem_LM;
#[allow(non_snake_case)]
///here is main loop of the Levenberg-Marquardt algorithm
pub mod LM_optimization;
/// weighted fit of a function of one variable to data, with parameter covariance
pub mod curve_fit;
/// solver options of a fit, also readable from TOML
pub mod fit_options;
