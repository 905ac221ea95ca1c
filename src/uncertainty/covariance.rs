//! # Covariance Matrix Calculations
//!
//! Estimation of the parameter covariance matrix from the Jacobian at the
//! best fit, its mapping from the solver's internal coordinates to parameter
//! values, and propagation of the resulting uncertainties.

use crate::error::Result;
use crate::parameters::Parameters;
use crate::utils::central_gradient;
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;

/// Calculate `inv(J^T J)` from the Jacobian of the residuals.
///
/// Returns `None` when `J^T J` is singular.
pub fn covariance_from_jacobian(jacobian: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let jtj = jacobian.transpose() * jacobian;
    let inverse = jtj.try_inverse()?;
    inverse.iter().all(|v| v.is_finite()).then_some(inverse)
}

/// Map a covariance matrix from internal to external coordinates.
///
/// `gradients[i]` is `d external_i / d internal_i`; the mapping is
/// `cov_ext[i, j] = cov_int[i, j] * g_i * g_j`.
pub fn to_external(cov_internal: &DMatrix<f64>, gradients: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(cov_internal.nrows(), cov_internal.ncols(), |i, j| {
        cov_internal[(i, j)] * gradients[i] * gradients[j]
    })
}

/// Standard errors as the square roots of the diagonal.
pub fn standard_errors(covar: &DMatrix<f64>) -> Vec<f64> {
    covar.diagonal().iter().map(|v| v.sqrt()).collect()
}

/// Calculate the correlation matrix from a covariance matrix.
///
/// `correl[i, j] = covar[i, j] / sqrt(covar[i, i] * covar[j, j])`; entries
/// involving a zero variance are zero.
pub fn correlation_matrix(covar: &DMatrix<f64>) -> DMatrix<f64> {
    let sd = standard_errors(covar);
    DMatrix::from_fn(covar.nrows(), covar.ncols(), |i, j| {
        let denom = sd[i] * sd[j];
        if denom > 0.0 {
            covar[(i, j)] / denom
        } else {
            0.0
        }
    })
}

/// `sqrt(g^T C g)`: the standard error of a function with gradient `g`.
pub fn propagate(gradient: &[f64], covar: &DMatrix<f64>) -> f64 {
    let g = DVector::from_column_slice(gradient);
    (g.transpose() * covar * &g)[(0, 0)].max(0.0).sqrt()
}

/// Write standard errors and correlations onto the varied parameters.
pub fn apply_to_parameters(params: &mut Parameters, var_names: &[String], covar: &DMatrix<f64>) {
    let stderr = standard_errors(covar);
    let correl = correlation_matrix(covar);

    for (i, name) in var_names.iter().enumerate() {
        let Some(param) = params.get_mut(name) else {
            continue;
        };
        param.set_stderr(Some(stderr[i]));
        let correlations = var_names
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(j, other)| (other.clone(), correl[(i, j)]))
            .collect::<BTreeMap<String, f64>>();
        param.set_correl(correlations);
    }
}

/// Give every constrained parameter a standard error from the gradient of
/// its expression with respect to the varied parameters.
pub fn propagate_to_expressions(
    params: &mut Parameters,
    var_names: &[String],
    covar: &DMatrix<f64>,
) -> Result<()> {
    let values = var_names
        .iter()
        .map(|name| params.value(name))
        .collect::<std::result::Result<Vec<f64>, _>>()?;
    let steps = values
        .iter()
        .zip(standard_errors(covar))
        .map(|(&v, sd)| {
            if sd.is_finite() && sd > 0.0 {
                sd * 1.0e-3
            } else {
                (f64::EPSILON.sqrt() * v.abs()).max(1.0e-10)
            }
        })
        .collect::<Vec<f64>>();

    let constrained = params
        .iter()
        .filter(|p| p.expr().is_some())
        .map(|p| p.name().to_string())
        .collect::<Vec<String>>();

    for name in constrained {
        let base = params.clone();
        let value_at = |point: &[f64]| -> Result<f64> {
            let mut trial = base.clone();
            for (var, &value) in var_names.iter().zip(point) {
                trial.set_value(var, value)?;
            }
            trial.update_constraints()?;
            Ok(trial.value(&name)?)
        };

        let gradient = central_gradient(value_at, &values, &steps)?;
        let stderr = propagate(gradient.as_slice().unwrap_or(&[]), covar);
        if let Some(param) = params.get_mut(&name) {
            param.set_stderr(Some(stderr));
        }
    }
    Ok(())
}
