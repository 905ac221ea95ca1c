//! Integration tests for real-world fitting problems
//!
//! These tests demonstrate practical applications: enzyme kinetics with a
//! derived parameter, and a two-compartment decay built from two prefixed
//! exponential models.

use approx::assert_relative_eq;
use modelfit::models::exponential_model;
use modelfit::{add, FuncModel, Minimizer, Model, ParamHint, Parameters, Result};
use ndarray::Array1;

/// Puromycin (treated) reaction velocities from Treloar (1974), as shipped
/// with R's `datasets` package.
fn puromycin() -> (Array1<f64>, Array1<f64>) {
    let conc = Array1::from(vec![
        0.02, 0.02, 0.06, 0.06, 0.11, 0.11, 0.22, 0.22, 0.56, 0.56, 1.10, 1.10,
    ]);
    let rate = Array1::from(vec![
        76.0, 47.0, 97.0, 107.0, 123.0, 139.0, 159.0, 152.0, 191.0, 201.0, 207.0, 200.0,
    ]);
    (conc, rate)
}

fn michaelis_menten() -> FuncModel {
    FuncModel::new("michaelis_menten", &[("vmax", 200.0), ("km", 0.1)], |s, p| {
        s.mapv(|c| p[0] * c / (p[1] + c))
    })
    .with_hint("km", ParamHint::new().with_min(0.0))
    .unwrap()
    .with_hint("efficiency", ParamHint::new().with_expr("vmax / km"))
    .unwrap()
}

/// Michaelis-Menten kinetics; reference values from `nls` in R.
#[test]
fn test_michaelis_menten_puromycin() {
    let (conc, rate) = puromycin();
    let model = michaelis_menten();
    let params = model.make_params().unwrap();
    let result = model.fit(&rate, &params, &conc).unwrap();
    assert!(result.success());

    let fitted = result.params();
    assert_relative_eq!(fitted.value("vmax").unwrap(), 212.68, max_relative = 1e-4);
    assert_relative_eq!(fitted.value("km").unwrap(), 0.06412, max_relative = 1e-3);
    assert_relative_eq!(fitted.get("vmax").unwrap().stderr().unwrap(), 6.947, max_relative = 1e-2);
    assert_relative_eq!(fitted.get("km").unwrap().stderr().unwrap(), 0.008281, max_relative = 1e-2);

    // residual standard error 10.93 on 10 degrees of freedom
    assert_eq!(result.fit.nfree, 10);
    assert_relative_eq!(result.fit.redchi.sqrt(), 10.93, max_relative = 1e-3);

    let efficiency = fitted.get("efficiency").unwrap();
    assert_relative_eq!(
        efficiency.value(),
        fitted.value("vmax").unwrap() / fitted.value("km").unwrap(),
        max_relative = 1e-12
    );
    assert!(efficiency.stderr().unwrap() > 0.0);
}

/// Fitting the same problem through a bare objective gives the same answer.
#[test]
fn test_michaelis_menten_objective() {
    let (conc, rate) = puromycin();
    let objective = |p: &Parameters| -> Result<Array1<f64>> {
        let (vmax, km) = (p.value("vmax")?, p.value("km")?);
        Ok(conc.mapv(|c| vmax * c / (km + c)) - &rate)
    };

    let mut params = Parameters::new();
    params.add("vmax", 200.0).unwrap();
    params.add("km", 0.1).unwrap().set_min(0.0).unwrap();
    let result = Minimizer::default().minimize(&objective, &params).unwrap();
    assert_relative_eq!(result.params.value("vmax").unwrap(), 212.68, max_relative = 1e-4);
    assert!(result.nfev > 2);
    assert!(result.aic < result.bic);
}

/// Two-compartment pharmacokinetics: `A exp(-t/d1) + B exp(-t/d2)`.
#[test]
fn test_two_compartment_decay() {
    let t = Array1::from(vec![
        0.1, 0.25, 0.5, 1.0, 2.0, 4.0, 6.0, 8.0, 12.0, 18.0, 24.0,
    ]);
    let concentration = t.mapv(|v: f64| 10.0 * (-v / 0.8).exp() + 5.0 * (-v / 5.0).exp());

    let model = add(
        exponential_model().with_prefix("fast_"),
        exponential_model().with_prefix("slow_"),
    )
    .unwrap();
    let params = model
        .make_params_with(&[
            ("fast_amplitude", 8.0),
            ("fast_decay", 1.0),
            ("slow_amplitude", 4.0),
            ("slow_decay", 6.0),
        ])
        .unwrap();

    let result = model.fit(&concentration, &params, &t).unwrap();
    assert!(result.success());
    let fitted = result.params();
    for (name, truth) in [
        ("fast_amplitude", 10.0),
        ("fast_decay", 0.8),
        ("slow_amplitude", 5.0),
        ("slow_decay", 5.0),
    ] {
        assert_relative_eq!(fitted.value(name).unwrap(), truth, max_relative = 1e-4);
    }
    assert!(result.rsquared() > 0.999_999);
}
