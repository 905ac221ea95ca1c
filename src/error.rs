use crate::parameters::{BoundsError, ExpressionError, ParameterError};
use thiserror::Error;

/// Error types for the modelfit library.
#[derive(Error, Debug)]
pub enum FitError {
    /// Error raised by the parameter system (names, bounds, constraints).
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// Error raised while parsing or evaluating a free-standing expression.
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// Array lengths that must agree do not.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Invalid input data or arguments.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Non-finite values encountered where the NaN policy forbids them.
    #[error("NaN values detected: {0}")]
    NanEncountered(String),

    /// Error in model construction or evaluation.
    #[error("Model error: {0}")]
    Model(String),

    /// The external optimizer could not produce a result.
    #[error("Optimization failed: {0}")]
    Optimization(String),

    /// Linear algebra failure (singular system, failed decomposition).
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),

    /// Functionality that a particular model does not provide.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<BoundsError> for FitError {
    fn from(err: BoundsError) -> Self {
        FitError::Parameter(ParameterError::from(err))
    }
}

/// Result type alias for modelfit operations.
pub type Result<T> = std::result::Result<T, FitError>;
