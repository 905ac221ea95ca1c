//! Peak-fitting workflows in the style of lmfit-py
//!
//! Two overlapping gaussians on a sloped background, built from prefixed
//! library models, fitted from rough starting values.

use crate::test_helpers::add_noise;
use approx::assert_relative_eq;
use modelfit::lineshapes;
use modelfit::models::{gaussian_model, linear_model};
use modelfit::{add, CompositeModel, Model};
use ndarray::Array1;

fn two_peaks() -> CompositeModel {
    let peaks = add(
        gaussian_model().with_prefix("g1_"),
        gaussian_model().with_prefix("g2_"),
    )
    .unwrap();
    add(peaks, linear_model().with_prefix("bkg_")).unwrap()
}

fn two_peak_data() -> (Array1<f64>, Array1<f64>) {
    let x = Array1::linspace(0.0, 20.0, 401);
    let truth = lineshapes::gaussian(&x, 30.0, 7.0, 1.0)
        + lineshapes::gaussian(&x, 20.0, 12.0, 1.5)
        + lineshapes::linear(&x, 0.1, 2.0);
    (x.clone(), add_noise(&truth, 0.05, 2024))
}

#[test]
fn test_two_gaussians_on_linear_background() {
    let (x, y) = two_peak_data();
    let model = two_peaks();
    assert_eq!(
        model.name(),
        "((Model(gaussian, prefix='g1_') + Model(gaussian, prefix='g2_')) + Model(linear, prefix='bkg_'))"
    );

    let params = model
        .make_params_with(&[
            ("g1_amplitude", 20.0),
            ("g1_center", 6.5),
            ("g1_sigma", 1.2),
            ("g2_amplitude", 15.0),
            ("g2_center", 12.5),
            ("g2_sigma", 1.2),
            ("bkg_slope", 0.0),
            ("bkg_intercept", 1.0),
        ])
        .unwrap();
    // derived fwhm/height parameters from both peaks
    assert!(params.get("g1_fwhm").unwrap().expr().is_some());
    assert!(params.get("g2_height").unwrap().expr().is_some());

    let result = model.fit(&y, &params, &x).unwrap();
    assert!(result.success(), "{}", result.fit.message);
    assert_eq!(result.fit.nvarys, 8);
    assert_eq!(result.fit.ndata, 401);

    let fitted = result.params();
    for (name, truth, tol) in [
        ("g1_amplitude", 30.0, 0.3),
        ("g1_center", 7.0, 0.01),
        ("g1_sigma", 1.0, 0.01),
        ("g2_amplitude", 20.0, 0.3),
        ("g2_center", 12.0, 0.02),
        ("g2_sigma", 1.5, 0.02),
        ("bkg_slope", 0.1, 0.01),
        ("bkg_intercept", 2.0, 0.1),
    ] {
        let value = fitted.value(name).unwrap();
        assert!((value - truth).abs() < tol, "{name}: {value} vs {truth}");
    }

    assert_relative_eq!(
        fitted.value("g1_fwhm").unwrap(),
        2.35482 * fitted.value("g1_sigma").unwrap(),
        max_relative = 1e-5
    );
    assert!(result.rsquared() > 0.999);
    assert!(result.fit.redchi < 0.05);
}

#[test]
fn test_components_sum_to_best_fit() {
    let (x, y) = two_peak_data();
    let model = two_peaks();
    let params = model
        .make_params_with(&[
            ("g1_amplitude", 25.0),
            ("g1_center", 7.2),
            ("g1_sigma", 1.0),
            ("g2_amplitude", 18.0),
            ("g2_center", 11.8),
            ("g2_sigma", 1.4),
            ("bkg_slope", 0.1),
            ("bkg_intercept", 2.0),
        ])
        .unwrap();
    let result = model.fit(&y, &params, &x).unwrap();

    let components = result.eval_components(&x).unwrap();
    let names: Vec<&str> = components.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["g1_", "g2_", "bkg_"]);

    let total = components
        .iter()
        .fold(Array1::zeros(x.len()), |acc: Array1<f64>, (_, c)| acc + c);
    for (a, b) in total.iter().zip(result.best_fit.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-10);
    }

    // evaluating on a finer grid works with the fitted parameters
    let fine = Array1::linspace(0.0, 20.0, 1001);
    let curve = result.eval(&fine).unwrap();
    assert_eq!(curve.len(), 1001);
    let peak = curve
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    // the first peak dominates: height = amplitude / (sigma sqrt(2 pi)) + background
    assert_relative_eq!(peak, 30.0 / (2.0 * std::f64::consts::PI).sqrt() + 2.7, epsilon = 0.2);
}

#[test]
fn test_single_peak_guess_then_fit() {
    let x = Array1::linspace(-5.0, 5.0, 101);
    let y = add_noise(&lineshapes::lorentzian(&x, 4.0, 0.5, 0.7), 0.01, 99);
    let model = modelfit::models::lorentzian_model();
    let guess = model.guess(&x, &y).unwrap();
    assert!((guess.value("center").unwrap() - 0.5).abs() < 0.2);

    let result = model.fit(&y, &guess, &x).unwrap();
    assert!(result.success());
    assert!((result.params().value("amplitude").unwrap() - 4.0).abs() < 0.1);
    assert!((result.params().value("sigma").unwrap() - 0.7).abs() < 0.02);
    assert_relative_eq!(
        result.params().value("fwhm").unwrap(),
        2.0 * result.params().value("sigma").unwrap(),
        max_relative = 1e-9
    );
}
