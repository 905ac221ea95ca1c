//! Numerical helpers shared by the minimizer, the uncertainty estimates and
//! the starting-value guesses.

pub mod finite_difference;
pub mod matrix_convert;
pub mod polyfit;

pub use finite_difference::{central_gradient, central_jacobian, forward_jacobian};
pub use matrix_convert::{
    nalgebra_to_ndarray, nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};
pub use polyfit::polyfit;
