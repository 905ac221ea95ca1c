//! # Uncertainty Calculation
//!
//! Parameter uncertainties after a fit:
//!
//! - covariance matrix estimation from the Jacobian at the best fit
//! - standard errors and correlations, mapped back to named parameters
//! - propagation to constrained parameters and to model predictions
//! - profile-likelihood confidence intervals based on the F-test
//!
//! The approach follows lmfit-py.

pub mod confidence;
pub mod covariance;

pub use confidence::{
    conf_interval, f_test_probability, sigma_to_probability, ConfidenceInterval,
    ParameterInterval,
};
pub use covariance::{
    correlation_matrix, covariance_from_jacobian, propagate, standard_errors, to_external,
};
