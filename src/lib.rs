//! # modelfit
//!
//! `modelfit` is a curve-fitting library built on the Levenberg-Marquardt
//! solver of the `levenberg-marquardt` crate. It adds what that solver leaves
//! to the caller:
//! - Named parameters with bounds, fixed values and algebraic constraints
//! - Models that carry their own parameter names, hints and starting guesses
//! - Composite models with a shared parameter namespace
//! - Standard errors, correlations and profile-likelihood confidence intervals
//!
//! ## Basic Usage
//!
//! ```
//! use modelfit::models::gaussian_model;
//! use modelfit::Model;
//! use ndarray::Array1;
//!
//! let x = Array1::linspace(-5.0, 5.0, 101);
//! let y = modelfit::lineshapes::gaussian(&x, 3.0, 0.4, 0.8);
//!
//! let model = gaussian_model();
//! let params = model.guess(&x, &y).unwrap();
//! let result = model.fit(&y, &params, &x).unwrap();
//!
//! assert!(result.success());
//! assert!((result.params().value("center").unwrap() - 0.4).abs() < 1e-6);
//! ```

pub mod config;
pub mod error;
pub mod lineshapes;
pub mod minimizer;
pub mod model;
pub mod models;
pub mod parameters;
pub mod uncertainty;
pub mod utils;

// Re-exports for convenience
pub use config::{FitConfig, NanPolicy};
pub use error::{FitError, Result};
pub use minimizer::{Minimizer, MinimizerResult, Objective};
pub use model::{add, fit_model, CompositeModel, FuncModel, Model, ModelResult, Operator, ParamHint};
pub use parameters::{Parameter, Parameters};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
