//! # Parameter System
//!
//! Named fit parameters with bounds and algebraic constraints, modelled on
//! lmfit's `Parameters`.
//!
//! ## Key Features
//!
//! - **Named Parameters**: parameters are addressed by name and kept in insertion order
//! - **Bounds**: min/max limits, enforced by clamping and by the MINUIT transform during fits
//! - **Constraint Expressions**: a parameter can be computed from others, e.g. `fwhm = 2.3548200*sigma`
//! - **Serialization Support**: save and load parameter sets as JSON
//!
//! ## Example Usage
//!
//! ```rust
//! use modelfit::parameters::Parameters;
//!
//! let mut params = Parameters::new();
//! params.add("amplitude", 3.0).unwrap().set_bounds(0.0, 10.0).unwrap();
//! params.add("decay", 0.5).unwrap().set_min(0.0).unwrap();
//! params.add("offset", 1.0).unwrap().set_vary(false);
//! params
//!     .add("half_life", 0.0)
//!     .unwrap()
//!     .set_expr(Some("ln(2) / decay"))
//!     .unwrap();
//!
//! params.update_constraints().unwrap();
//! assert!((params.value("half_life").unwrap() - 2f64.ln() / 0.5).abs() < 1e-12);
//! assert_eq!(params.varying_names(), vec!["amplitude", "decay"]);
//! ```

pub mod bounds;
pub mod expression;
pub mod parameter;
pub mod parameters;

pub use bounds::{Bounds, BoundsError, BoundsKind, BoundsTransform};
pub use expression::{EvaluationContext, Expression, ExpressionError};
pub use parameter::{Parameter, ParameterError};
pub use parameters::Parameters;
