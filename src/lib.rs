// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Fitting of parametric equations to observed (x, y) data.
//!
//! - [`symbolic`] holds the expression engine: symbols tagged as variables or
//!   constants, a catalog of named models, and [`symbolic::equation::Equation`],
//!   which turns one model into its function, first and second derivatives and
//!   integral (closed form, or Gauss-Legendre quadrature) as plain Rust functions.
//! - [`numerical`] holds the Levenberg-Marquardt solver and
//!   [`numerical::goodness_of_fit::Goodness`], which fits a function to data and
//!   reports goodness-of-fit statistics.
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
pub mod Utils;
pub mod error;
pub mod numerical;
pub mod symbolic;

pub use error::{CurveFitError, Result};
