//! Tests for profile-likelihood confidence intervals
//!
//! For a model that is linear in its parameters the profile interval at
//! `n` sigma is `best +/- t * stderr`, with `t` the Student-t quantile for
//! the same probability. The tests below lean on that.

use crate::test_helpers::add_noise;
use approx::assert_relative_eq;
use modelfit::uncertainty::{conf_interval, sigma_to_probability};
use modelfit::{FitConfig, FitError, Minimizer, Parameters, Result};
use ndarray::Array1;
use statrs::distribution::{ContinuousCDF, StudentsT};

fn t_quantile(sigma: f64, nfree: usize) -> f64 {
    let t = StudentsT::new(0.0, 1.0, nfree as f64).unwrap();
    t.inverse_cdf((1.0 + sigma_to_probability(sigma)) / 2.0)
}

struct LineFit {
    x: Array1<f64>,
    y: Array1<f64>,
}

impl LineFit {
    fn new() -> Self {
        let x = Array1::linspace(0.0, 5.0, 30);
        let y = add_noise(&x.mapv(|v| 0.8 * v + 2.0), 0.1, 3);
        Self { x, y }
    }

    fn residuals(&self, p: &Parameters) -> Result<Array1<f64>> {
        let (a, b) = (p.value("intercept")?, p.value("slope")?);
        Ok(self.x.mapv(|v| a + b * v) - &self.y)
    }

    fn params() -> Parameters {
        let mut params = Parameters::new();
        params.add("intercept", 1.0).unwrap();
        params.add("slope", 1.0).unwrap();
        params
    }
}

#[test]
fn test_linear_profile_matches_student_t() {
    let line = LineFit::new();
    let objective = |p: &Parameters| line.residuals(p);
    let minimizer = Minimizer::new(FitConfig::default());
    let result = minimizer.minimize(&objective, &LineFit::params()).unwrap();

    let intervals = conf_interval(&minimizer, &objective, &result, None, &[1.0, 2.0]).unwrap();
    assert_eq!(intervals.len(), 2);
    assert_eq!(intervals[0].name, "intercept");
    assert_eq!(intervals[1].name, "slope");

    for interval in &intervals {
        let param = result.params.get(&interval.name).unwrap();
        let stderr = param.stderr().unwrap();
        assert_eq!(interval.best, param.value());

        for sigma in [1.0, 2.0] {
            let ci = interval.at_sigma(sigma).unwrap();
            let expected = t_quantile(sigma, result.nfree) * stderr;
            assert_relative_eq!(ci.probability, sigma_to_probability(sigma));
            assert_relative_eq!(interval.best - ci.lower, expected, max_relative = 0.01);
            assert_relative_eq!(ci.upper - interval.best, expected, max_relative = 0.01);
        }
    }
}

#[test]
fn test_selected_parameters_only() {
    let line = LineFit::new();
    let objective = |p: &Parameters| line.residuals(p);
    let minimizer = Minimizer::new(FitConfig::default());
    let result = minimizer.minimize(&objective, &LineFit::params()).unwrap();

    let intervals = conf_interval(&minimizer, &objective, &result, Some(&["slope"][..]), &[1.0]).unwrap();
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].name, "slope");
    let ci = &intervals[0].intervals[0];
    assert!(ci.lower < intervals[0].best && intervals[0].best < ci.upper);
}

#[test]
fn test_unreachable_limit_is_infinite() {
    let line = LineFit::new();
    let objective = |p: &Parameters| line.residuals(p);
    let minimizer = Minimizer::new(FitConfig::default());
    let mut result = minimizer.minimize(&objective, &LineFit::params()).unwrap();

    // a bound just above the best value blocks the upper limit
    let best = result.params.value("intercept").unwrap();
    let stderr = result.params.get("intercept").unwrap().stderr().unwrap();
    result
        .params
        .get_mut("intercept")
        .unwrap()
        .set_bounds(best - 100.0 * stderr, best + 0.5 * stderr)
        .unwrap();

    let intervals =
        conf_interval(&minimizer, &objective, &result, Some(&["intercept"][..]), &[1.0]).unwrap();
    let ci = intervals[0].at_sigma(1.0).unwrap();
    assert_eq!(ci.upper, f64::INFINITY);
    assert!(ci.lower.is_finite() && ci.lower < best);
}

#[test]
fn test_invalid_requests() {
    let line = LineFit::new();
    let objective = |p: &Parameters| line.residuals(p);
    let minimizer = Minimizer::new(FitConfig::default());

    let mut params = LineFit::params();
    params.get_mut("intercept").unwrap().set_vary(false);
    let result = minimizer.minimize(&objective, &params).unwrap();

    // a fixed parameter cannot be profiled
    let err = conf_interval(&minimizer, &objective, &result, Some(&["intercept"][..]), &[1.0]).unwrap_err();
    assert!(matches!(err, FitError::InvalidInput(_)));

    for sigmas in [&[0.0][..], &[-1.0][..], &[f64::NAN][..]] {
        assert!(conf_interval(&minimizer, &objective, &result, None, sigmas).is_err());
    }

    // without covariance there is no standard error to size the steps
    let minimizer = Minimizer::new(FitConfig::default().with_calc_covar(false));
    let result = minimizer.minimize(&objective, &LineFit::params()).unwrap();
    assert!(conf_interval(&minimizer, &objective, &result, None, &[1.0]).is_err());
}
