//! Parameter definition and implementation
//!
//! A [`Parameter`] is a named value that is either varied by the optimizer,
//! held fixed, or computed from other parameters through a constraint
//! expression. Bounds are enforced by clamping.

use crate::parameters::bounds::{Bounds, BoundsError, BoundsTransform};
use crate::parameters::expression::{Expression, ExpressionError, CONSTANTS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Invalid parameter name '{name}'")]
    InvalidName { name: String },

    #[error("Parameter '{name}' not found")]
    NotFound { name: String },

    #[error("Bounds error: {0}")]
    Bounds(#[from] BoundsError),

    #[error("Invalid expression for parameter '{name}': {source}")]
    Expression {
        name: String,
        source: ExpressionError,
    },

    #[error("Expression for parameter '{param}' references unknown name '{name}'")]
    UndefinedName { param: String, name: String },

    #[error("Circular dependency in expression for parameter '{name}'")]
    CircularDependency { name: String },

    #[error("Expected {expected} values, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

/// Check that `name` is an identifier and does not shadow a constant.
pub(crate) fn validate_name(name: &str) -> Result<(), ParameterError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && !CONSTANTS.contains(&name) {
        Ok(())
    } else {
        Err(ParameterError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// A named fit parameter
///
/// Parameters can be varied during optimization, held fixed, bounded, and
/// tied to other parameters through an expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    name: String,

    value: f64,

    /// Value the parameter was created with
    init_value: f64,

    vary: bool,

    #[serde(default)]
    bounds: Bounds,

    /// Constraint expression source, if any
    #[serde(default)]
    expr: Option<String>,

    /// Compiled form of `expr`
    #[serde(skip)]
    ast: Option<Expression>,

    /// Standard error (set after fitting)
    #[serde(default)]
    stderr: Option<f64>,

    /// Correlations with the other varied parameters (set after fitting)
    #[serde(default)]
    correl: BTreeMap<String, f64>,
}

impl Parameter {
    /// Create a new, unbounded, varying parameter.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelfit::parameters::Parameter;
    ///
    /// let param = Parameter::new("amplitude", 10.0);
    /// assert_eq!(param.name(), "amplitude");
    /// assert_eq!(param.value(), 10.0);
    /// assert!(param.vary());
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            init_value: value,
            vary: true,
            bounds: Bounds::default(),
            expr: None,
            ast: None,
            stderr: None,
            correl: BTreeMap::new(),
        }
    }

    /// Builder form of [`set_bounds`](Self::set_bounds).
    ///
    /// # Examples
    ///
    /// ```
    /// use modelfit::parameters::Parameter;
    ///
    /// let param = Parameter::new("fraction", 1.5).with_bounds(0.0, 1.0).unwrap();
    /// assert_eq!(param.value(), 1.0);
    /// ```
    pub fn with_bounds(mut self, min: f64, max: f64) -> Result<Self, ParameterError> {
        self.set_bounds(min, max)?;
        Ok(self)
    }

    pub fn with_min(mut self, min: f64) -> Result<Self, ParameterError> {
        self.set_min(min)?;
        Ok(self)
    }

    pub fn with_max(mut self, max: f64) -> Result<Self, ParameterError> {
        self.set_max(max)?;
        Ok(self)
    }

    /// Hold the parameter at its current value.
    pub fn fixed(mut self) -> Self {
        self.vary = false;
        self
    }

    /// Builder form of [`set_expr`](Self::set_expr).
    pub fn with_expr(mut self, expr: &str) -> Result<Self, ParameterError> {
        self.set_expr(Some(expr))?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    pub fn vary(&self) -> bool {
        self.vary
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    pub fn expr(&self) -> Option<&str> {
        self.expr.as_deref()
    }

    pub(crate) fn expression(&self) -> Option<&Expression> {
        self.ast.as_ref()
    }

    pub fn stderr(&self) -> Option<f64> {
        self.stderr
    }

    pub fn correl(&self) -> &BTreeMap<String, f64> {
        &self.correl
    }

    /// True when the optimizer moves this parameter.
    pub fn is_free(&self) -> bool {
        self.vary && self.expr.is_none()
    }

    /// Set the value, clamped into the bounds.
    pub fn set_value(&mut self, value: f64) {
        self.value = self.bounds.clamp(value);
    }

    /// Make the value the new initial value as well.
    pub fn set_init_value(&mut self, value: f64) {
        self.set_value(value);
        self.init_value = self.value;
    }

    /// Restore the initial value.
    pub fn reset(&mut self) {
        self.value = self.bounds.clamp(self.init_value);
    }

    /// Turning `vary` on drops any constraint expression.
    pub fn set_vary(&mut self, vary: bool) {
        self.vary = vary;
        if vary {
            self.expr = None;
            self.ast = None;
        }
    }

    /// Replace the bounds and clamp the current value into them.
    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<(), ParameterError> {
        self.bounds = Bounds::new(min, max)?;
        self.value = self.bounds.clamp(self.value);
        Ok(())
    }

    pub fn set_min(&mut self, min: f64) -> Result<(), ParameterError> {
        self.set_bounds(min, self.bounds.max)
    }

    pub fn set_max(&mut self, max: f64) -> Result<(), ParameterError> {
        self.set_bounds(self.bounds.min, max)
    }

    /// Set or clear the constraint expression.
    ///
    /// The expression is compiled immediately, so syntax errors surface here.
    /// Names it references are only checked when constraints are resolved.
    /// A parameter with an expression never varies.
    pub fn set_expr(&mut self, expr: Option<&str>) -> Result<(), ParameterError> {
        match expr.map(str::trim).filter(|e| !e.is_empty()) {
            Some(source) => {
                let ast = Expression::parse(source).map_err(|source| {
                    ParameterError::Expression {
                        name: self.name.clone(),
                        source,
                    }
                })?;
                self.expr = Some(source.to_string());
                self.ast = Some(ast);
                self.vary = false;
            }
            None => {
                self.expr = None;
                self.ast = None;
            }
        }
        Ok(())
    }

    pub(crate) fn set_stderr(&mut self, stderr: Option<f64>) {
        self.stderr = stderr;
    }

    pub(crate) fn set_correl(&mut self, correl: BTreeMap<String, f64>) {
        self.correl = correl;
    }

    /// Restore the invariants serde cannot: the compiled expression, and
    /// values inside the bounds.
    pub(crate) fn recompile(&mut self) -> Result<(), ParameterError> {
        self.value = self.bounds.clamp(self.value);
        self.init_value = self.bounds.clamp(self.init_value);
        let expr = self.expr.take();
        let vary = self.vary;
        self.set_expr(expr.as_deref())?;
        if self.expr.is_none() {
            self.vary = vary;
        }
        Ok(())
    }

    pub fn transform(&self) -> BoundsTransform {
        BoundsTransform::new(self.bounds)
    }

    /// Current value in the optimizer's unbounded space.
    pub fn to_internal(&self) -> f64 {
        self.transform().to_internal(self.value)
    }

    /// Set the value from the optimizer's unbounded space.
    pub fn set_internal(&mut self, internal: f64) {
        self.value = self.bounds.clamp(self.transform().to_external(internal));
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Parameter '{}', value={}", self.name, self.value)?;
        match (self.expr.as_deref(), self.vary) {
            (Some(expr), _) => write!(f, ", expr='{expr}'")?,
            (None, false) => f.write_str(" (fixed)")?,
            (None, true) => {
                if let Some(stderr) = self.stderr {
                    write!(f, " +/- {stderr:.3e}")?;
                }
            }
        }
        write!(f, ", bounds=[{}:{}]>", self.bounds.min, self.bounds.max)
    }
}
