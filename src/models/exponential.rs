//! Exponential decay and power-law models.

use super::params_with_values;
use crate::lineshapes::{self, TINY};
use crate::model::FuncModel;
use crate::utils::polyfit;
use tracing::warn;

/// `amplitude * exp(-x / decay)`
///
/// The guess fits a line to `ln|y|`: the intercept gives the amplitude and
/// the slope `-1 / decay`.
pub fn exponential_model() -> FuncModel {
    FuncModel::new("exponential", &[("amplitude", 1.0), ("decay", 1.0)], |x, p| {
        lineshapes::exponential(x, p[0], p[1])
    })
    .with_guess(|model, x, y| {
        let log_y = y.mapv(|v| (v.abs() + TINY).ln());
        let coefs = polyfit(x, &log_y, 1)?;
        let decay = if coefs[1].abs() > 1.0e-10 {
            -1.0 / coefs[1]
        } else {
            warn!("flat data; starting exponential decay at 1");
            1.0
        };
        params_with_values(model, &[("amplitude", coefs[0].exp()), ("decay", decay)])
    })
}

/// `amplitude * x^exponent`
///
/// The guess fits a line to `ln|y|` against `ln|x|`.
pub fn power_law_model() -> FuncModel {
    FuncModel::new("powerlaw", &[("amplitude", 1.0), ("exponent", 1.0)], |x, p| {
        lineshapes::powerlaw(x, p[0], p[1])
    })
    .with_guess(|model, x, y| {
        let log_x = x.mapv(|v| (v.abs() + TINY).ln());
        let log_y = y.mapv(|v| (v.abs() + TINY).ln());
        let coefs = polyfit(&log_x, &log_y, 1)?;
        params_with_values(model, &[("amplitude", coefs[0].exp()), ("exponent", coefs[1])])
    })
}
