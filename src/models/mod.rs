//! Built-in models for common fitting problems.
//!
//! Each factory returns a [`FuncModel`] wired to a function from
//! [`lineshapes`](crate::lineshapes), with parameter hints and a
//! starting-value heuristic, so `model.guess(&x, &y)` gives a usable
//! starting point for [`Model::fit`](crate::Model::fit).

use crate::error::{FitError, Result};
use crate::model::{FuncModel, Model};
use crate::parameters::Parameters;
use ndarray::Array1;

mod exponential;
mod peak;
mod polynomial;
mod step;

pub use exponential::{exponential_model, power_law_model};
pub use peak::{
    gaussian_model, lorentzian_model, moffat_model, pseudo_voigt_model, skewed_gaussian_model,
};
pub use polynomial::{
    constant_model, linear_model, polynomial_model, quadratic_model, MAX_POLYNOMIAL_DEGREE,
};
pub use step::{rectangle_model, step_model};

/// Make parameters from the model's hints with starting values given by
/// unprefixed name.
pub(crate) fn params_with_values(model: &FuncModel, values: &[(&str, f64)]) -> Result<Parameters> {
    let names = values
        .iter()
        .map(|&(name, value)| (model.full_name(name), value))
        .collect::<Vec<(String, f64)>>();
    let overrides = names
        .iter()
        .map(|(name, value)| (name.as_str(), *value))
        .collect::<Vec<(&str, f64)>>();
    model.make_params_with(&overrides)
}

pub(crate) fn min_max(values: &Array1<f64>) -> Result<(f64, f64)> {
    if values.is_empty() {
        return Err(FitError::InvalidInput(
            "cannot guess starting values from empty data".to_string(),
        ));
    }
    Ok(values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v))))
}

/// Estimate amplitude, center and sigma of a single peak.
///
/// The center starts at the extremum of `y` and moves to the mean abscissa
/// of the points beyond half maximum when there are more than two of them;
/// sigma is half the span of those points, or a sixth of the `x` range
/// otherwise. The amplitude is `3 (max - min) sigma ampscale`, negated for
/// a dip when `negative` is set.
///
/// # Examples
///
/// ```
/// use modelfit::lineshapes::gaussian;
/// use modelfit::models::{gaussian_model, guess_from_peak};
/// use ndarray::Array1;
///
/// let x = Array1::linspace(-5.0, 5.0, 101);
/// let y = gaussian(&x, 2.0, 0.5, 1.0);
/// let params = guess_from_peak(&gaussian_model(), &x, &y, false, 1.0, 1.0).unwrap();
/// assert!((params.value("center").unwrap() - 0.5).abs() < 0.1);
/// ```
pub fn guess_from_peak(
    model: &FuncModel,
    x: &Array1<f64>,
    y: &Array1<f64>,
    negative: bool,
    ampscale: f64,
    sigscale: f64,
) -> Result<Parameters> {
    if x.len() != y.len() {
        return Err(FitError::DimensionMismatch(format!(
            "x has {} points, data has {}",
            x.len(),
            y.len()
        )));
    }
    let (ymin, ymax) = min_max(y)?;
    let (xmin, xmax) = min_max(x)?;

    let extremum = if negative { ymin } else { ymax };
    let mut center = x
        .iter()
        .zip(y)
        .find(|&(_, &v)| v == extremum)
        .map_or(0.5 * (xmin + xmax), |(&xv, _)| xv);
    let mut sigma = (xmax - xmin) / 6.0;
    let height = if negative { -(ymax - ymin) * 3.0 } else { (ymax - ymin) * 3.0 };

    let half = 0.5 * (ymax + ymin);
    let beyond_half = x
        .iter()
        .zip(y)
        .filter(|&(_, &v)| if negative { v < half } else { v > half })
        .map(|(&xv, _)| xv)
        .collect::<Array1<f64>>();
    if beyond_half.len() > 2 {
        let (lo, hi) = min_max(&beyond_half)?;
        sigma = (hi - lo) / 2.0;
        center = beyond_half.mean().unwrap_or(center);
    }

    let amplitude = height * sigma * ampscale;
    let mut params = params_with_values(
        model,
        &[
            ("amplitude", amplitude),
            ("center", center),
            ("sigma", sigma * sigscale),
        ],
    )?;
    if let Some(sigma) = params.get_mut(&model.full_name("sigma")) {
        sigma.set_min(0.0)?;
    }
    params.update_constraints()?;
    Ok(params)
}
