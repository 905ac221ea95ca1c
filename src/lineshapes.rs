//! Closed-form line shapes evaluated over an array of abscissae.
//!
//! Peak functions are normalized to unit area times `amplitude`. Width
//! parameters are guarded with [`TINY`] so a zero width never divides by zero.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;
use std::f64::consts::{LN_2, PI, SQRT_2};
use std::fmt;

/// Smallest width used in place of zero.
pub const TINY: f64 = 1.0e-15;

const SQRT_2PI: f64 = 2.506_628_274_631_000_7;

fn guard(width: f64) -> f64 {
    width.max(TINY)
}

/// Keep the magnitude above `TINY` while preserving the sign.
fn not_zero(value: f64) -> f64 {
    if value.abs() < TINY {
        TINY.copysign(value)
    } else {
        value
    }
}

/// Gaussian: `amplitude / (sqrt(2 pi) sigma) * exp(-(x - center)^2 / (2 sigma^2))`
///
/// # Examples
///
/// ```
/// use modelfit::lineshapes::gaussian;
/// use ndarray::array;
///
/// let y = gaussian(&array![0.0], 1.0, 0.0, 1.0);
/// assert!((y[0] - 0.3989422804).abs() < 1e-9);
/// ```
pub fn gaussian(x: &Array1<f64>, amplitude: f64, center: f64, sigma: f64) -> Array1<f64> {
    let sigma = guard(sigma);
    let norm = amplitude / (SQRT_2PI * sigma);
    x.mapv(|v| norm * (-(v - center).powi(2) / (2.0 * sigma * sigma)).exp())
}

/// Lorentzian: `amplitude / pi * sigma / ((x - center)^2 + sigma^2)`
pub fn lorentzian(x: &Array1<f64>, amplitude: f64, center: f64, sigma: f64) -> Array1<f64> {
    let sigma = guard(sigma);
    x.mapv(|v| amplitude / (1.0 + ((v - center) / sigma).powi(2)) / (PI * sigma))
}

/// Weighted sum of a Gaussian and a Lorentzian with the same FWHM.
///
/// `fraction` is the Lorentzian share; the Gaussian uses
/// `sigma_g = sigma / sqrt(2 ln 2)`.
pub fn pseudo_voigt(
    x: &Array1<f64>,
    amplitude: f64,
    center: f64,
    sigma: f64,
    fraction: f64,
) -> Array1<f64> {
    let sigma_g = sigma / (2.0 * LN_2).sqrt();
    let g = gaussian(x, amplitude, center, sigma_g);
    let l = lorentzian(x, amplitude, center, sigma);
    g * (1.0 - fraction) + l * fraction
}

/// Moffat: `amplitude / (((x - center) / sigma)^2 + 1)^beta`
pub fn moffat(x: &Array1<f64>, amplitude: f64, center: f64, sigma: f64, beta: f64) -> Array1<f64> {
    let sigma = guard(sigma);
    x.mapv(|v| amplitude / (((v - center) / sigma).powi(2) + 1.0).powf(beta))
}

/// Gaussian multiplied by `1 + erf(gamma (x - center) / (sqrt(2) sigma))`.
pub fn skewed_gaussian(
    x: &Array1<f64>,
    amplitude: f64,
    center: f64,
    sigma: f64,
    gamma: f64,
) -> Array1<f64> {
    let width = guard(SQRT_2 * sigma);
    let g = gaussian(x, amplitude, center, sigma);
    let asym = x.mapv(|v| 1.0 + erf(gamma * (v - center) / width));
    g * asym
}

/// Exponential decay: `amplitude * exp(-x / decay)`
pub fn exponential(x: &Array1<f64>, amplitude: f64, decay: f64) -> Array1<f64> {
    let decay = not_zero(decay);
    x.mapv(|v| amplitude * (-v / decay).exp())
}

/// Power law: `amplitude * x^exponent`
pub fn powerlaw(x: &Array1<f64>, amplitude: f64, exponent: f64) -> Array1<f64> {
    x.mapv(|v| amplitude * v.powf(exponent))
}

pub fn linear(x: &Array1<f64>, slope: f64, intercept: f64) -> Array1<f64> {
    x.mapv(|v| slope * v + intercept)
}

pub fn parabolic(x: &Array1<f64>, a: f64, b: f64, c: f64) -> Array1<f64> {
    x.mapv(|v| (a * v + b) * v + c)
}

/// Polynomial with coefficients in ascending order: `c0 + c1 x + c2 x^2 + ...`
pub fn polynomial(x: &Array1<f64>, coefs: &[f64]) -> Array1<f64> {
    x.mapv(|v| coefs.iter().rev().fold(0.0, |acc, &c| acc * v + c))
}

/// Shape of the edge of a step or rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepForm {
    /// Linear ramp clipped to `[0, 1]`
    #[default]
    Linear,

    /// `0.5 + atan(t) / pi`
    Arctan,

    /// `0.5 (1 + erf(t))`
    Erf,

    /// `1 - 1 / (1 + exp(t))`
    Logistic,
}

impl fmt::Display for StepForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepForm::Linear => "linear",
            StepForm::Arctan => "arctan",
            StepForm::Erf => "erf",
            StepForm::Logistic => "logistic",
        };
        f.write_str(name)
    }
}

/// Rising edge from 0 to 1 as `t` goes from negative to positive.
fn rising_edge(t: f64, form: StepForm) -> f64 {
    match form {
        StepForm::Linear => t.clamp(0.0, 1.0),
        StepForm::Arctan => 0.5 + t.atan() / PI,
        StepForm::Erf => 0.5 * (1.0 + erf(t)),
        StepForm::Logistic => 1.0 - 1.0 / (1.0 + t.exp()),
    }
}

/// Step from 0 to `amplitude` around `center` with width `sigma`.
pub fn step(x: &Array1<f64>, amplitude: f64, center: f64, sigma: f64, form: StepForm) -> Array1<f64> {
    let sigma = guard(sigma);
    x.mapv(|v| amplitude * rising_edge((v - center) / sigma, form))
}

/// Rising step at `center1` followed by a falling step at `center2`.
pub fn rectangle(
    x: &Array1<f64>,
    amplitude: f64,
    center1: f64,
    sigma1: f64,
    center2: f64,
    sigma2: f64,
    form: StepForm,
) -> Array1<f64> {
    let sigma1 = guard(sigma1);
    let sigma2 = guard(sigma2);
    x.mapv(|v| {
        let t1 = (v - center1) / sigma1;
        let t2 = -(v - center2) / sigma2;
        let out = match form {
            StepForm::Linear => 0.5 * (t1.clamp(-1.0, 1.0) + t2.clamp(-1.0, 1.0)),
            StepForm::Arctan => (t1.atan() + t2.atan()) / PI,
            StepForm::Erf => 0.5 * (erf(t1) + erf(t2)),
            StepForm::Logistic => 1.0 - 1.0 / (1.0 + t1.exp()) - 1.0 / (1.0 + t2.exp()),
        };
        amplitude * out
    })
}
