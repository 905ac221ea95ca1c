//! Finite difference methods for numerical differentiation.
//!
//! The forward-difference Jacobian feeds the Levenberg-Marquardt solver and
//! computes its columns in parallel with rayon. Central differences are used
//! where accuracy matters more than evaluation count: propagating standard
//! errors to constrained parameters and to model predictions.

use crate::error::{FitError, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use rayon::prelude::*;

/// Forward-difference step for a coordinate at `x`.
fn forward_step(x: f64, epsfcn: f64) -> f64 {
    let eps = epsfcn.max(f64::EPSILON).sqrt();
    let h = eps * x.abs();
    if h == 0.0 {
        eps
    } else {
        h
    }
}

/// Compute the Jacobian matrix using forward finite differences in parallel.
///
/// `J[i, j] = (f(x + h_j e_j)[i] - f0[i]) / h_j` with
/// `h_j = sqrt(max(epsfcn, eps)) * |x_j|`.
///
/// # Arguments
///
/// * `f` - The residual function; `None` signals a failed evaluation
/// * `x` - The point at which to evaluate the Jacobian
/// * `f0` - The residuals at `x`
/// * `epsfcn` - Relative accuracy of the function values
///
/// # Returns
///
/// * `None` if any perturbed evaluation fails, otherwise the Jacobian
pub fn forward_jacobian<F>(
    f: F,
    x: &DVector<f64>,
    f0: &DVector<f64>,
    epsfcn: f64,
) -> Option<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> Option<DVector<f64>> + Sync,
{
    if x.is_empty() {
        return Some(DMatrix::zeros(f0.len(), 0));
    }

    let columns = (0..x.len())
        .into_par_iter()
        .map(|j| {
            let h = forward_step(x[j], epsfcn);
            let mut perturbed = x.clone();
            perturbed[j] += h;
            let f1 = f(&perturbed)?;
            (f1.len() == f0.len()).then(|| (f1 - f0) / h)
        })
        .collect::<Option<Vec<DVector<f64>>>>()?;

    Some(DMatrix::from_columns(&columns))
}

/// Compute `d f / d x` for a vector-valued function using central differences.
///
/// Row `i` holds the derivatives of output `i`; column `j` corresponds to
/// `x[j]` perturbed by `±steps[j]`.
pub fn central_jacobian<F>(f: F, x: &[f64], steps: &[f64]) -> Result<Array2<f64>>
where
    F: Fn(&[f64]) -> Result<Array1<f64>>,
{
    if steps.len() != x.len() {
        return Err(FitError::DimensionMismatch(format!(
            "{} steps for {} variables",
            steps.len(),
            x.len()
        )));
    }

    let mut columns = Vec::with_capacity(x.len());
    let mut point = x.to_vec();
    for (j, &h) in steps.iter().enumerate() {
        if h <= 0.0 || !h.is_finite() {
            return Err(FitError::InvalidInput(format!(
                "finite difference step for variable {j} must be positive, got {h}"
            )));
        }
        point[j] = x[j] + h;
        let forward = f(&point)?;
        point[j] = x[j] - h;
        let backward = f(&point)?;
        point[j] = x[j];

        if forward.len() != backward.len() {
            return Err(FitError::DimensionMismatch(
                "function output length changed between evaluations".to_string(),
            ));
        }
        columns.push((forward - backward) / (2.0 * h));
    }

    let nrows = columns.first().map_or(0, Array1::len);
    let mut jac = Array2::zeros((nrows, x.len()));
    for (j, column) in columns.into_iter().enumerate() {
        jac.column_mut(j).assign(&column);
    }
    Ok(jac)
}

/// Gradient of a scalar function using central differences.
pub fn central_gradient<F>(f: F, x: &[f64], steps: &[f64]) -> Result<Array1<f64>>
where
    F: Fn(&[f64]) -> Result<f64>,
{
    let jac = central_jacobian(|point| Ok(Array1::from_elem(1, f(point)?)), x, steps)?;
    Ok(jac.row(0).to_owned())
}
