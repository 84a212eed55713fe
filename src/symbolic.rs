/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```
/// use curve_fitting::symbolic::symbolic_engine::Expr;
/// let parsed = Expr::parse_expression("Bmax*x/(Kd + x)").unwrap();
/// let f = parsed.lambdify(&["x", "Bmax", "Kd"]).unwrap();
/// assert_eq!(f(&[1.0, 4.0, 1.0]), 2.0);
/// ```
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// 1) the expression tree with operator overloading, display and LaTeX rendering
/// 2) differentiation, simplification and indefinite integration
/// 3) turns a symbolic expression into a Rust function
///# Example
/// ```
/// use curve_fitting::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("a*x^2 + b*x + c").unwrap();
/// let df_dx = f.diff("x").simplify_();
/// let F = f.integrate("x").unwrap();
/// let slope = df_dx.lambdify(&["x", "a", "b"]).unwrap();
/// assert_eq!(slope(&[1.0, 3.0, 2.0]), 8.0);
/// println!("df/dx = {}, F = {}", df_dx, F);
/// ```
pub mod symbolic_engine;
pub mod symbolic_engine_derivatives;
pub mod symbolic_integration;
pub mod symbolic_lambdify;
pub mod symbolic_simplify;
/// erf, gamma, polygamma and the normal quantile on f64
pub mod special_functions;
///________________________________________________________________________________________________________________________________________________
/// symbols tagged as variables or constants and the expression wrapper fixing argument order
pub mod symbols;
/// named model equations (dose-response, binding, kinetics, distributions)
pub mod catalog;
/// equation, derivatives and integral of one expression compiled to Rust functions
///# Example
/// ```
/// use curve_fitting::symbolic::catalog::NamedEquation;
/// use curve_fitting::symbolic::equation::Equation;
/// let eq = Equation::from_named(NamedEquation::Parabola).unwrap();
/// // x, a, b, c
/// let value = eq.integral().call(&[1.0, 3.0, 0.0, 0.0]).unwrap();
/// assert!((value - 1.0).abs() < 1e-12);
/// ```
pub mod equation;
