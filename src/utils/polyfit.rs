//! Linear least-squares polynomial fits used by the starting-value guesses.

use crate::error::{FitError, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;

/// Fit `y ≈ c0 + c1 x + ... + c_deg x^deg` and return `[c0, ..., c_deg]`.
///
/// The Vandermonde system is solved through an SVD, so rank-deficient
/// inputs still yield the minimum-norm solution.
pub fn polyfit(x: &Array1<f64>, y: &Array1<f64>, degree: usize) -> Result<Vec<f64>> {
    if x.len() != y.len() {
        return Err(FitError::DimensionMismatch(format!(
            "x has {} points, y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < degree + 1 {
        return Err(FitError::InvalidInput(format!(
            "a degree {degree} polynomial needs at least {} points, got {}",
            degree + 1,
            x.len()
        )));
    }

    let vandermonde = DMatrix::from_fn(x.len(), degree + 1, |i, j| x[i].powi(j as i32));
    let rhs = DVector::from_iterator(y.len(), y.iter().copied());

    let coefs = vandermonde
        .svd(true, true)
        .solve(&rhs, 1e-12)
        .map_err(|e| FitError::LinearAlgebra(e.to_string()))?;

    Ok(coefs.iter().copied().collect())
}
