//! # Confidence Interval Calculations
//!
//! Profile-likelihood confidence intervals. Each parameter is held fixed at
//! trial values while the others are refit; the F-test turns the increase in
//! chi-square into a probability, and the trial value at which that
//! probability reaches the requested level is the confidence limit.

use crate::error::{FitError, Result};
use crate::minimizer::{Minimizer, MinimizerResult, Objective};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;
use tracing::debug;

/// Trial steps taken in each direction before a limit is declared unreachable.
const MAX_STEPS: usize = 200;

/// Bisection stops when the bracket is this fraction of the standard error.
const BISECT_TOL: f64 = 1.0e-5;

/// One confidence limit pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub sigma: f64,

    /// Probability content, `erf(sigma / sqrt(2))`
    pub probability: f64,

    /// Lower limit, `-inf` if it could not be reached
    pub lower: f64,

    /// Upper limit, `inf` if it could not be reached
    pub upper: f64,
}

/// Confidence limits of one parameter at every requested sigma level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInterval {
    pub name: String,
    pub best: f64,
    pub intervals: Vec<ConfidenceInterval>,
}

impl ParameterInterval {
    pub fn at_sigma(&self, sigma: f64) -> Option<&ConfidenceInterval> {
        self.intervals.iter().find(|ci| (ci.sigma - sigma).abs() < 1e-12)
    }
}

/// Probability content of a `sigma` interval of a normal distribution.
pub fn sigma_to_probability(sigma: f64) -> f64 {
    erf(sigma / SQRT_2)
}

/// F-test probability that fixing `nfix` parameters raised the chi-square
/// from `chisqr_best` to `chisqr_fixed` by more than chance.
pub fn f_test_probability(chisqr_fixed: f64, chisqr_best: f64, nfree: usize, nfix: usize) -> Result<f64> {
    if nfree == 0 || nfix == 0 {
        return Err(FitError::InvalidInput(
            "F-test needs at least one free and one fixed degree of freedom".to_string(),
        ));
    }
    if chisqr_best <= 0.0 {
        return Err(FitError::InvalidInput(
            "F-test needs a positive best-fit chi-square".to_string(),
        ));
    }

    let dist = FisherSnedecor::new(nfix as f64, nfree as f64)
        .map_err(|e| FitError::InvalidInput(e.to_string()))?;
    let dchi = chisqr_fixed / chisqr_best - 1.0;
    let statistic = (dchi * nfree as f64 / nfix as f64).max(0.0);
    Ok(dist.cdf(statistic))
}

struct Profile<'a, O: Objective + ?Sized> {
    minimizer: Minimizer,
    objective: &'a O,
    result: &'a MinimizerResult,
}

impl<'a, O: Objective + ?Sized> Profile<'a, O> {
    /// F-test probability with `name` held at `value`.
    fn probability(&self, name: &str, value: f64) -> Result<f64> {
        let mut params = self.result.params.clone();
        let param = params.get_mut(name).ok_or_else(|| {
            FitError::InvalidInput(format!("unknown parameter '{name}'"))
        })?;
        param.set_vary(false);
        param.set_value(value);

        let fit = self.minimizer.minimize(self.objective, &params)?;
        f_test_probability(fit.chisqr, self.result.chisqr, self.result.nfree, 1)
    }

    /// Walk away from the best value in `direction` and locate each target
    /// probability. Returns one limit per target, in the order given.
    fn limits(
        &self,
        name: &str,
        best: f64,
        stderr: f64,
        targets: &[f64],
        direction: f64,
    ) -> Result<Vec<f64>> {
        let (min, max) = self
            .result
            .params
            .get(name)
            .map_or((f64::NEG_INFINITY, f64::INFINITY), |p| (p.min(), p.max()));

        let mut order = (0..targets.len()).collect::<Vec<usize>>();
        order.sort_by(|&a, &b| targets[a].total_cmp(&targets[b]));

        let mut found = vec![direction * f64::INFINITY; targets.len()];
        let mut pending = order.into_iter().peekable();
        let mut previous = (best, 0.0);
        let step = 0.5 * stderr * direction;

        for i in 1..=MAX_STEPS {
            let candidate = best + step * i as f64;
            let value = candidate.clamp(min, max);
            let at_bound = value != candidate;

            let probability = self.probability(name, value)?;
            while let Some(&target) = pending.peek() {
                if probability < targets[target] {
                    break;
                }
                found[target] =
                    self.bisect(name, previous, (value, probability), targets[target], stderr)?;
                pending.next();
            }

            if pending.peek().is_none() || at_bound {
                break;
            }
            previous = (value, probability);
        }

        if pending.peek().is_some() {
            debug!(parameter = name, direction, "confidence limit not reached");
        }
        Ok(found)
    }

    /// Bisect between a point below and a point above `target`.
    fn bisect(
        &self,
        name: &str,
        below: (f64, f64),
        above: (f64, f64),
        target: f64,
        stderr: f64,
    ) -> Result<f64> {
        let (mut lo, mut hi) = (below.0, above.0);
        while (hi - lo).abs() > BISECT_TOL * stderr {
            let mid = 0.5 * (lo + hi);
            if self.probability(name, mid)? < target {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Ok(0.5 * (lo + hi))
    }
}

/// Calculate profile-likelihood confidence intervals.
///
/// # Arguments
///
/// * `minimizer` - Minimizer used for the refits (its covariance step is skipped)
/// * `objective` - The objective that produced `result`
/// * `result` - A finished fit with standard errors
/// * `names` - Parameters to profile; all varied parameters when `None`
/// * `sigmas` - Confidence levels in units of sigma, e.g. `[1.0, 2.0]`
///
/// # Returns
///
/// * One [`ParameterInterval`] per profiled parameter, in the order requested
pub fn conf_interval<O: Objective + ?Sized>(
    minimizer: &Minimizer,
    objective: &O,
    result: &MinimizerResult,
    names: Option<&[&str]>,
    sigmas: &[f64],
) -> Result<Vec<ParameterInterval>> {
    if sigmas.iter().any(|&s| !(s > 0.0 && s.is_finite())) {
        return Err(FitError::InvalidInput(
            "sigma levels must be positive and finite".to_string(),
        ));
    }

    let names = match names {
        Some(names) => names.iter().map(|n| n.to_string()).collect(),
        None => result.var_names.clone(),
    };
    let targets = sigmas.iter().map(|&s| sigma_to_probability(s)).collect::<Vec<f64>>();

    let profile = Profile {
        minimizer: Minimizer::new(minimizer.config().clone().with_calc_covar(false)),
        objective,
        result,
    };

    names
        .into_iter()
        .map(|name| {
            if !result.var_names.contains(&name) {
                return Err(FitError::InvalidInput(format!(
                    "'{name}' was not varied in the fit"
                )));
            }
            let param = result.params.get(&name).ok_or_else(|| {
                FitError::InvalidInput(format!("unknown parameter '{name}'"))
            })?;
            let stderr = param
                .stderr()
                .filter(|s| s.is_finite() && *s > 0.0)
                .ok_or_else(|| {
                    FitError::InvalidInput(format!(
                        "'{name}' has no standard error; confidence intervals need one"
                    ))
                })?;
            let best = param.value();

            debug!(parameter = %name, best, stderr, "profiling parameter");
            let lower = profile.limits(&name, best, stderr, &targets, -1.0)?;
            let upper = profile.limits(&name, best, stderr, &targets, 1.0)?;

            let intervals = sigmas
                .iter()
                .zip(&targets)
                .zip(lower.into_iter().zip(upper))
                .map(|((&sigma, &probability), (lower, upper))| ConfidenceInterval {
                    sigma,
                    probability,
                    lower,
                    upper,
                })
                .collect();

            Ok(ParameterInterval {
                name,
                best,
                intervals,
            })
        })
        .collect()
}
