//! Constant, linear, quadratic and general polynomial models.
//!
//! Starting values come from a least-squares polynomial fit of the data.

use super::params_with_values;
use crate::error::{FitError, Result};
use crate::lineshapes;
use crate::model::FuncModel;
use crate::utils::polyfit;
use ndarray::Array1;

/// Highest degree accepted by [`polynomial_model`].
pub const MAX_POLYNOMIAL_DEGREE: usize = 7;

/// `c`
pub fn constant_model() -> FuncModel {
    FuncModel::new("constant", &[("c", 0.0)], |x, p| Array1::from_elem(x.len(), p[0]))
        .with_guess(|model, _x, y| {
            params_with_values(model, &[("c", y.mean().unwrap_or(0.0))])
        })
}

/// `slope * x + intercept`
pub fn linear_model() -> FuncModel {
    FuncModel::new("linear", &[("slope", 1.0), ("intercept", 0.0)], |x, p| {
        lineshapes::linear(x, p[0], p[1])
    })
    .with_guess(|model, x, y| {
        let coefs = polyfit(x, y, 1)?;
        params_with_values(model, &[("intercept", coefs[0]), ("slope", coefs[1])])
    })
}

/// `a x^2 + b x + c`
pub fn quadratic_model() -> FuncModel {
    FuncModel::new("parabolic", &[("a", 0.0), ("b", 0.0), ("c", 0.0)], |x, p| {
        lineshapes::parabolic(x, p[0], p[1], p[2])
    })
    .with_guess(|model, x, y| {
        let coefs = polyfit(x, y, 2)?;
        params_with_values(model, &[("c", coefs[0]), ("b", coefs[1]), ("a", coefs[2])])
    })
}

/// `c0 + c1 x + ... + cN x^N` for `N = degree`.
///
/// # Errors
///
/// Returns [`FitError::InvalidInput`] when `degree` exceeds
/// [`MAX_POLYNOMIAL_DEGREE`].
pub fn polynomial_model(degree: usize) -> Result<FuncModel> {
    if degree > MAX_POLYNOMIAL_DEGREE {
        return Err(FitError::InvalidInput(format!(
            "polynomial degree must be at most {MAX_POLYNOMIAL_DEGREE}, got {degree}"
        )));
    }

    let names = (0..=degree).map(|i| format!("c{i}")).collect::<Vec<String>>();
    let args = names
        .iter()
        .map(|name| (name.as_str(), 0.0))
        .collect::<Vec<(&str, f64)>>();

    let model = FuncModel::new("polynomial", &args, |x, p| lineshapes::polynomial(x, p))
        .with_guess(move |model, x, y| {
            let coefs = polyfit(x, y, degree)?;
            let values = names
                .iter()
                .zip(coefs)
                .map(|(name, c)| (name.as_str(), c))
                .collect::<Vec<(&str, f64)>>();
            params_with_values(model, &values)
        });
    Ok(model)
}
