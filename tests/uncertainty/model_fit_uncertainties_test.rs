//! Tests for the uncertainties attached to a fit: covariance, standard
//! errors, correlations, propagation to constrained parameters and the model
//! uncertainty band.

use crate::test_helpers::add_noise;
use approx::assert_relative_eq;
use modelfit::lineshapes;
use modelfit::models::gaussian_model;
use modelfit::{FitConfig, Minimizer, Model, Parameters, Result};
use ndarray::Array1;

fn line_data() -> (Array1<f64>, Array1<f64>) {
    let x = Array1::linspace(0.0, 10.0, 21);
    let y = add_noise(&x.mapv(|v| 1.5 * v - 3.0), 0.2, 7);
    (x, y)
}

fn line_params() -> Parameters {
    let mut params = Parameters::new();
    params.add("intercept", 0.0).unwrap();
    params.add("slope", 1.0).unwrap();
    params
}

#[test]
fn test_linear_covariance_matches_normal_equations() {
    let (x, y) = line_data();
    let objective = |p: &Parameters| -> Result<Array1<f64>> {
        let (a, b) = (p.value("intercept")?, p.value("slope")?);
        Ok(x.mapv(|v| a + b * v) - &y)
    };

    let config = FitConfig::default().with_scale_covar(false);
    let result = Minimizer::new(config).minimize(&objective, &line_params()).unwrap();
    let covar = result.covar.as_ref().unwrap();

    // inv(X^T X) for the design matrix [1, x]
    let n = x.len() as f64;
    let sx = x.sum();
    let sxx = x.mapv(|v| v * v).sum();
    let det = n * sxx - sx * sx;
    assert_relative_eq!(covar[[0, 0]], sxx / det, max_relative = 1e-5);
    assert_relative_eq!(covar[[0, 1]], -sx / det, max_relative = 1e-5);
    assert_relative_eq!(covar[[1, 1]], n / det, max_relative = 1e-5);
    assert_relative_eq!(covar[[0, 1]], covar[[1, 0]], max_relative = 1e-9);

    let slope = result.params.get("slope").unwrap();
    assert_relative_eq!(slope.stderr().unwrap(), (n / det).sqrt(), max_relative = 1e-5);
    assert!(result.errorbars);
}

#[test]
fn test_scale_covar_multiplies_by_redchi() {
    let (x, y) = line_data();
    let objective = |p: &Parameters| -> Result<Array1<f64>> {
        let (a, b) = (p.value("intercept")?, p.value("slope")?);
        Ok(x.mapv(|v| a + b * v) - &y)
    };

    let scaled = Minimizer::new(FitConfig::default())
        .minimize(&objective, &line_params())
        .unwrap();
    let unscaled = Minimizer::new(FitConfig::default().with_scale_covar(false))
        .minimize(&objective, &line_params())
        .unwrap();

    let ratio = scaled.params.get("slope").unwrap().stderr().unwrap()
        / unscaled.params.get("slope").unwrap().stderr().unwrap();
    assert_relative_eq!(ratio, scaled.redchi.sqrt(), max_relative = 1e-4);

    let no_covar = Minimizer::new(FitConfig::default().with_calc_covar(false))
        .minimize(&objective, &line_params())
        .unwrap();
    assert!(no_covar.covar.is_none());
    assert!(!no_covar.errorbars);
    assert!(no_covar.params.get("slope").unwrap().stderr().is_none());
}

#[test]
fn test_gaussian_fit_uncertainties() {
    let x = Array1::linspace(-10.0, 10.0, 201);
    let y = add_noise(&lineshapes::gaussian(&x, 8.0, 1.2, 1.6), 0.02, 11);
    let model = gaussian_model();
    let params = model.guess(&x, &y).unwrap();
    let result = model.fit(&y, &params, &x).unwrap();
    assert!(result.success());

    let fitted = result.params();
    let sigma = fitted.get("sigma").unwrap();
    let fwhm = fitted.get("fwhm").unwrap();
    let center = fitted.get("center").unwrap();

    assert_relative_eq!(center.value(), 1.2, epsilon = 0.03);
    assert_relative_eq!(sigma.value(), 1.6, epsilon = 0.05);

    // each standard error is small but non-zero, and the true value lies
    // within a few of them
    for (name, truth) in [("amplitude", 8.0), ("center", 1.2), ("sigma", 1.6)] {
        let p = fitted.get(name).unwrap();
        let stderr = p.stderr().unwrap();
        assert!(stderr > 0.0 && stderr < 0.05, "{name}: {stderr}");
        assert!((p.value() - truth).abs() < 5.0 * stderr, "{name}");
    }

    // fwhm is a fixed multiple of sigma, and so is its standard error
    assert_relative_eq!(
        fwhm.stderr().unwrap(),
        2.35482 * sigma.stderr().unwrap(),
        max_relative = 1e-3
    );

    // correlations are symmetric and bounded
    let rho = sigma.correl()["amplitude"];
    assert_relative_eq!(
        rho,
        fitted.get("amplitude").unwrap().correl()["sigma"],
        epsilon = 1e-12
    );
    assert!(rho.abs() <= 1.0);
    assert!(!sigma.correl().contains_key("sigma"));
    assert!(!sigma.correl().contains_key("fwhm"));

    let band = result.eval_uncertainty(&x, 1.0).unwrap();
    assert_eq!(band.len(), x.len());
    assert!(band.iter().all(|v| v.is_finite() && *v >= 0.0));
    // the band is wider on the peak than far out in the tails
    assert!(band[112] > band[0]);
    let band2 = result.eval_uncertainty(&x, 2.0).unwrap();
    assert!(band2[112] > band[112]);
}
