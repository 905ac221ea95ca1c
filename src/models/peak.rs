//! Peak models: Gaussian, Lorentzian, pseudo-Voigt, Moffat, skewed Gaussian.
//!
//! Every peak carries `amplitude`, `center` and `sigma`, with `sigma`
//! bounded below by zero and derived `fwhm`/`height` parameters.

use super::guess_from_peak;
use crate::lineshapes;
use crate::model::{FuncModel, ParamHint};
use ndarray::Array1;

fn peak(
    name: &str,
    args: &[(&str, f64)],
    fwhm: &str,
    height: &str,
    func: impl Fn(&Array1<f64>, &[f64]) -> Array1<f64> + Send + Sync + 'static,
) -> FuncModel {
    FuncModel::new(name, args, func)
        .with_builtin_hint("sigma", ParamHint::new().with_min(0.0))
        .with_builtin_hint("fwhm", ParamHint::new().with_expr(fwhm))
        .with_builtin_hint("height", ParamHint::new().with_expr(height))
}

/// Gaussian peak, see [`lineshapes::gaussian`].
///
/// # Examples
///
/// ```
/// use modelfit::models::gaussian_model;
/// use modelfit::Model;
///
/// let params = gaussian_model().make_params().unwrap();
/// assert!((params.value("fwhm").unwrap() - 2.35482).abs() < 1e-9);
/// ```
pub fn gaussian_model() -> FuncModel {
    peak(
        "gaussian",
        &[("amplitude", 1.0), ("center", 0.0), ("sigma", 1.0)],
        "2.3548200*sigma",
        "0.3989423*amplitude/max(1e-15, sigma)",
        |x, p| lineshapes::gaussian(x, p[0], p[1], p[2]),
    )
    .with_guess(|model, x, y| guess_from_peak(model, x, y, false, 1.0, 1.0))
}

/// Lorentzian peak, see [`lineshapes::lorentzian`].
pub fn lorentzian_model() -> FuncModel {
    peak(
        "lorentzian",
        &[("amplitude", 1.0), ("center", 0.0), ("sigma", 1.0)],
        "2.0*sigma",
        "0.3183099*amplitude/max(1e-15, sigma)",
        |x, p| lineshapes::lorentzian(x, p[0], p[1], p[2]),
    )
    .with_guess(|model, x, y| guess_from_peak(model, x, y, false, 1.25, 1.0))
}

/// Pseudo-Voigt peak with the Lorentzian share in `fraction`, held in `[0, 1]`.
pub fn pseudo_voigt_model() -> FuncModel {
    peak(
        "pseudo_voigt",
        &[("amplitude", 1.0), ("center", 0.0), ("sigma", 1.0), ("fraction", 0.5)],
        "2.0*sigma",
        "((1-fraction)*amplitude)/max(1e-15, sigma*sqrt(pi/ln(2))) + (fraction*amplitude)/max(1e-15, pi*sigma)",
        |x, p| lineshapes::pseudo_voigt(x, p[0], p[1], p[2], p[3]),
    )
    .with_builtin_hint("fraction", ParamHint::new().with_min(0.0).with_max(1.0))
    .with_guess(|model, x, y| {
        let mut params = guess_from_peak(model, x, y, false, 1.25, 1.0)?;
        params.set_value(&model.full_name("fraction"), 0.5)?;
        params.update_constraints()?;
        Ok(params)
    })
}

/// Moffat profile; `height` equals `amplitude`.
pub fn moffat_model() -> FuncModel {
    peak(
        "moffat",
        &[("amplitude", 1.0), ("center", 0.0), ("sigma", 1.0), ("beta", 1.0)],
        "2*sigma*sqrt(2**(1/max(1e-3, beta)) - 1)",
        "amplitude",
        |x, p| lineshapes::moffat(x, p[0], p[1], p[2], p[3]),
    )
    .with_guess(|model, x, y| guess_from_peak(model, x, y, false, 0.5, 1.0))
}

/// Gaussian with an error-function skew `gamma`.
pub fn skewed_gaussian_model() -> FuncModel {
    FuncModel::new(
        "skewed_gaussian",
        &[("amplitude", 1.0), ("center", 0.0), ("sigma", 1.0), ("gamma", 0.0)],
        |x, p| lineshapes::skewed_gaussian(x, p[0], p[1], p[2], p[3]),
    )
    .with_builtin_hint("sigma", ParamHint::new().with_min(0.0))
    .with_guess(|model, x, y| guess_from_peak(model, x, y, false, 1.0, 1.0))
}
