//! Model trait and model implementations.
//!
//! A [`Model`] is a named, parametrized function of an independent variable.
//! [`FuncModel`] wraps a plain function whose positional arguments are named
//! parameters; [`CompositeModel`] combines two models with an arithmetic
//! operator and the union of their parameters. Fitting binds data to a model,
//! hands the residual to the [`Minimizer`] and wraps the outcome in a
//! [`ModelResult`].

use crate::config::{FitConfig, NanPolicy};
use crate::error::{FitError, Result};
use crate::minimizer::{Minimizer, MinimizerResult, Objective};
use crate::parameters::{Expression, Parameter, ParameterError, Parameters};
use crate::uncertainty::{self, ParameterInterval};
use crate::utils::central_jacobian;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Default starting value and constraints for one parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamHint {
    pub value: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub vary: Option<bool>,

    /// Constraint expression, written in the model's unprefixed names
    pub expr: Option<String>,
}

impl ParamHint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_vary(mut self, vary: bool) -> Self {
        self.vary = Some(vary);
        self
    }

    pub fn with_expr(mut self, expr: &str) -> Self {
        self.expr = Some(expr.to_string());
        self
    }

    /// Overwrite the fields that `other` sets.
    fn merge(&mut self, other: &ParamHint) {
        if other.value.is_some() {
            self.value = other.value;
        }
        if other.min.is_some() {
            self.min = other.min;
        }
        if other.max.is_some() {
            self.max = other.max;
        }
        if other.vary.is_some() {
            self.vary = other.vary;
        }
        if other.expr.is_some() {
            self.expr = other.expr.clone();
        }
    }

    fn apply(&self, param: &mut Parameter) -> std::result::Result<(), ParameterError> {
        if self.min.is_some() || self.max.is_some() {
            param.set_bounds(
                self.min.unwrap_or(param.min()),
                self.max.unwrap_or(param.max()),
            )?;
        }
        if let Some(value) = self.value {
            param.set_init_value(value);
        }
        if let Some(vary) = self.vary {
            param.set_vary(vary);
        }
        if let Some(expr) = &self.expr {
            param.set_expr(Some(expr))?;
        }
        Ok(())
    }
}

/// A trait representing a model that can be fit to data.
pub trait Model: Send + Sync {
    /// Display name, e.g. `Model(gaussian, prefix='g1_')`.
    fn name(&self) -> String;

    /// Prefix applied to every parameter name; empty for composites.
    fn prefix(&self) -> &str;

    /// Full (prefixed) names of the function arguments, in order.
    fn param_names(&self) -> Vec<String>;

    /// Hints by full parameter name, including derived parameters such as
    /// `fwhm` that are not function arguments.
    fn param_hints(&self) -> Vec<(String, ParamHint)>;

    /// Evaluates the model at `x` with the values in `params`.
    ///
    /// # Arguments
    ///
    /// * `params` - Parameter set containing at least [`param_names`](Model::param_names)
    /// * `x` - The independent variable values
    ///
    /// # Returns
    ///
    /// * The model's predicted values, one per element of `x`
    fn eval(&self, params: &Parameters, x: &Array1<f64>) -> Result<Array1<f64>>;

    /// Starting values estimated from data. Models without a heuristic
    /// return [`make_params`](Model::make_params).
    fn guess(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<Parameters> {
        check_lengths(x, y)?;
        self.make_params()
    }

    /// The leaf models this model is built from.
    fn components(&self) -> Vec<&dyn Model>;

    /// Evaluate each component separately, keyed by prefix (or name when
    /// the prefix is empty).
    fn eval_components(
        &self,
        params: &Parameters,
        x: &Array1<f64>,
    ) -> Result<Vec<(String, Array1<f64>)>> {
        self.components()
            .into_iter()
            .map(|model| {
                let key = if model.prefix().is_empty() {
                    model.name()
                } else {
                    model.prefix().to_string()
                };
                Ok((key, model.eval(params, x)?))
            })
            .collect()
    }

    /// A parameter set built from the hints.
    fn make_params(&self) -> Result<Parameters> {
        self.make_params_with(&[])
    }

    /// A parameter set built from the hints, with some starting values
    /// overridden by full parameter name.
    fn make_params_with(&self, overrides: &[(&str, f64)]) -> Result<Parameters> {
        let mut params = Parameters::new();
        for name in self.param_names() {
            params.add(&name, 0.0)?;
        }
        for (name, hint) in self.param_hints() {
            if !params.contains(&name) {
                params.add(&name, 0.0)?;
            }
            if let Some(param) = params.get_mut(&name) {
                hint.apply(param)?;
            }
        }
        for &(name, value) in overrides {
            params
                .get_mut(name)
                .ok_or_else(|| ParameterError::NotFound {
                    name: name.to_string(),
                })?
                .set_init_value(value);
        }

        match params.update_constraints() {
            Ok(()) => {}
            // expressions may refer to parameters of a model this one is
            // later combined with
            Err(ParameterError::UndefinedName { param, name }) => {
                debug!(param = %param, name = %name, "constraint left unresolved");
            }
            Err(err) => return Err(err.into()),
        }
        Ok(params)
    }

    /// Fit the model to `data` at `x` starting from `params`.
    fn fit(&self, data: &Array1<f64>, params: &Parameters, x: &Array1<f64>) -> Result<ModelResult<'_>>
    where
        Self: Sized,
    {
        fit_model(self, data, params, x, None, FitConfig::default())
    }

    /// Fit with per-point weights and an explicit configuration.
    fn fit_with(
        &self,
        data: &Array1<f64>,
        params: &Parameters,
        x: &Array1<f64>,
        weights: Option<&Array1<f64>>,
        config: FitConfig,
    ) -> Result<ModelResult<'_>>
    where
        Self: Sized,
    {
        fit_model(self, data, params, x, weights, config)
    }
}

fn check_lengths(x: &Array1<f64>, y: &Array1<f64>) -> Result<()> {
    if x.len() != y.len() {
        return Err(FitError::DimensionMismatch(format!(
            "x has {} points, data has {}",
            x.len(),
            y.len()
        )));
    }
    Ok(())
}

/// Signature of the function wrapped by a [`FuncModel`].
pub type ModelFn = dyn Fn(&Array1<f64>, &[f64]) -> Array1<f64> + Send + Sync;

/// Signature of a starting-value heuristic.
pub type GuessFn = dyn Fn(&FuncModel, &Array1<f64>, &Array1<f64>) -> Result<Parameters> + Send + Sync;

/// A model built from a plain function.
///
/// The function receives `x` and the parameter values in declaration order.
///
/// # Examples
///
/// ```
/// use modelfit::{FuncModel, Model, ParamHint};
/// use ndarray::Array1;
///
/// let model = FuncModel::new("decay", &[("amp", 1.0), ("tau", 1.0)], |x, p| {
///     x.mapv(|v| p[0] * (-v / p[1]).exp())
/// })
/// .with_prefix("d_")
/// .with_hint("tau", ParamHint::new().with_min(0.0))
/// .unwrap();
///
/// let params = model.make_params().unwrap();
/// assert_eq!(model.param_names(), vec!["d_amp", "d_tau"]);
/// assert_eq!(params.get("d_tau").unwrap().min(), 0.0);
/// ```
#[derive(Clone)]
pub struct FuncModel {
    name: String,
    prefix: String,

    /// Argument names (unprefixed) with their default values
    args: Vec<(String, f64)>,

    /// Hints by unprefixed name, in insertion order
    hints: Vec<(String, ParamHint)>,

    func: Arc<ModelFn>,
    guess: Option<Arc<GuessFn>>,
}

impl fmt::Debug for FuncModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncModel")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("args", &self.args)
            .field("hints", &self.hints)
            .field("has_guess", &self.guess.is_some())
            .finish()
    }
}

impl FuncModel {
    /// Wrap `func`, whose arguments after `x` are the parameters in `args`
    /// (name and default value).
    pub fn new<F>(name: &str, args: &[(&str, f64)], func: F) -> Self
    where
        F: Fn(&Array1<f64>, &[f64]) -> Array1<f64> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            prefix: String::new(),
            args: args.iter().map(|&(n, v)| (n.to_string(), v)).collect(),
            hints: Vec::new(),
            func: Arc::new(func),
            guess: None,
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_hint(mut self, name: &str, hint: ParamHint) -> Result<Self> {
        self.set_param_hint(name, hint)?;
        Ok(self)
    }

    pub fn with_guess<G>(mut self, guess: G) -> Self
    where
        G: Fn(&FuncModel, &Array1<f64>, &Array1<f64>) -> Result<Parameters> + Send + Sync + 'static,
    {
        self.guess = Some(Arc::new(guess));
        self
    }

    /// Add or update the hint for an unprefixed parameter name.
    ///
    /// Fields left unset in `hint` keep their previous values. A name that
    /// is not a function argument defines a derived parameter.
    pub fn set_param_hint(&mut self, name: &str, hint: ParamHint) -> Result<()> {
        if let Some(expr) = &hint.expr {
            Expression::parse(expr).map_err(|source| ParameterError::Expression {
                name: name.to_string(),
                source,
            })?;
        }
        self.merge_hint(name, hint);
        Ok(())
    }

    /// Hint for the library's own models, whose expressions are fixed
    /// strings covered by the model tests.
    pub(crate) fn with_builtin_hint(mut self, name: &str, hint: ParamHint) -> Self {
        self.merge_hint(name, hint);
        self
    }

    fn merge_hint(&mut self, name: &str, hint: ParamHint) {
        match self.hints.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => existing.merge(&hint),
            None => self.hints.push((name.to_string(), hint)),
        }
    }

    /// Function name, without prefix.
    pub fn func_name(&self) -> &str {
        &self.name
    }

    /// Prefixed name of an argument or hinted parameter.
    pub fn full_name(&self, base: &str) -> String {
        format!("{}{}", self.prefix, base)
    }

    fn owns(&self, base: &str) -> bool {
        self.args.iter().any(|(n, _)| n == base) || self.hints.iter().any(|(n, _)| n == base)
    }

    fn prefixed_expr(&self, expr: &str) -> String {
        if self.prefix.is_empty() {
            return expr.to_string();
        }
        match Expression::parse(expr) {
            Ok(ast) => ast
                .rename_variables(&|v: &str| {
                    if self.owns(v) {
                        self.full_name(v)
                    } else {
                        v.to_string()
                    }
                })
                .to_string(),
            Err(_) => expr.to_string(),
        }
    }
}

impl Model for FuncModel {
    fn name(&self) -> String {
        if self.prefix.is_empty() {
            format!("Model({})", self.name)
        } else {
            format!("Model({}, prefix='{}')", self.name, self.prefix)
        }
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn param_names(&self) -> Vec<String> {
        self.args.iter().map(|(n, _)| self.full_name(n)).collect()
    }

    fn param_hints(&self) -> Vec<(String, ParamHint)> {
        let find = |name: &str| self.hints.iter().find(|(n, _)| n == name).map(|(_, h)| h);

        let args = self.args.iter().map(|(name, default)| {
            let mut hint = ParamHint::new().with_value(*default);
            if let Some(extra) = find(name) {
                hint.merge(extra);
            }
            (name, hint)
        });
        let derived = self
            .hints
            .iter()
            .filter(|(name, _)| !self.args.iter().any(|(n, _)| n == name))
            .map(|(name, hint)| (name, hint.clone()));

        args.chain(derived)
            .map(|(name, mut hint)| {
                hint.expr = hint.expr.as_deref().map(|e| self.prefixed_expr(e));
                (self.full_name(name), hint)
            })
            .collect()
    }

    fn eval(&self, params: &Parameters, x: &Array1<f64>) -> Result<Array1<f64>> {
        let values = self
            .args
            .iter()
            .map(|(name, _)| params.value(&self.full_name(name)))
            .collect::<std::result::Result<Vec<f64>, _>>()?;

        let y = (self.func)(x, &values);
        if y.len() != x.len() {
            return Err(FitError::Model(format!(
                "{} returned {} values for {} points",
                self.name(),
                y.len(),
                x.len()
            )));
        }
        Ok(y)
    }

    fn guess(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<Parameters> {
        check_lengths(x, y)?;
        match &self.guess {
            Some(guess) => guess(self, x, y),
            None => self.make_params(),
        }
    }

    fn components(&self) -> Vec<&dyn Model> {
        vec![self]
    }
}

/// Binary operator joining two models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    fn apply(self, left: Array1<f64>, right: &Array1<f64>) -> Array1<f64> {
        match self {
            Operator::Add => left + right,
            Operator::Sub => left - right,
            Operator::Mul => left * right,
            Operator::Div => left / right,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
        };
        f.write_str(symbol)
    }
}

/// Two models combined by an [`Operator`], sharing one parameter namespace.
#[derive(Clone)]
pub struct CompositeModel {
    left: Arc<dyn Model>,
    right: Arc<dyn Model>,
    op: Operator,
}

impl fmt::Debug for CompositeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeModel")
            .field("name", &self.name())
            .finish()
    }
}

impl CompositeModel {
    /// Combine two models.
    ///
    /// Fails if both sides declare a parameter of the same name; give the
    /// models distinct prefixes instead.
    pub fn new<L, R>(left: L, right: R, op: Operator) -> Result<Self>
    where
        L: Model + 'static,
        R: Model + 'static,
    {
        fn declared(model: &dyn Model) -> HashSet<String> {
            let mut names = model.param_names();
            names.extend(model.param_hints().into_iter().map(|(n, _)| n));
            names.into_iter().collect()
        }

        let left_names = declared(&left);
        let mut collisions = declared(&right)
            .intersection(&left_names)
            .cloned()
            .collect::<Vec<String>>();
        if !collisions.is_empty() {
            collisions.sort();
            return Err(FitError::Model(format!(
                "{} and {} share parameter names: {}",
                left.name(),
                right.name(),
                collisions.join(", ")
            )));
        }

        Ok(Self {
            left: Arc::new(left),
            right: Arc::new(right),
            op,
        })
    }

    pub fn left(&self) -> &dyn Model {
        self.left.as_ref()
    }

    pub fn right(&self) -> &dyn Model {
        self.right.as_ref()
    }

    pub fn operator(&self) -> Operator {
        self.op
    }
}

/// Sum of two models.
///
/// # Examples
///
/// ```
/// use modelfit::models::{gaussian_model, linear_model};
/// use modelfit::{add, Model};
///
/// let model = add(gaussian_model().with_prefix("g_"), linear_model()).unwrap();
/// assert_eq!(
///     model.param_names(),
///     vec!["g_amplitude", "g_center", "g_sigma", "slope", "intercept"]
/// );
/// ```
pub fn add<L, R>(left: L, right: R) -> Result<CompositeModel>
where
    L: Model + 'static,
    R: Model + 'static,
{
    CompositeModel::new(left, right, Operator::Add)
}

impl Model for CompositeModel {
    fn name(&self) -> String {
        format!("({} {} {})", self.left.name(), self.op, self.right.name())
    }

    fn prefix(&self) -> &str {
        ""
    }

    fn param_names(&self) -> Vec<String> {
        let mut names = self.left.param_names();
        names.extend(self.right.param_names());
        names
    }

    fn param_hints(&self) -> Vec<(String, ParamHint)> {
        let mut hints = self.left.param_hints();
        hints.extend(self.right.param_hints());
        hints
    }

    fn eval(&self, params: &Parameters, x: &Array1<f64>) -> Result<Array1<f64>> {
        let left = self.left.eval(params, x)?;
        let right = self.right.eval(params, x)?;
        if left.len() != right.len() {
            return Err(FitError::DimensionMismatch(format!(
                "{} values on the left of '{}', {} on the right",
                left.len(),
                self.op,
                right.len()
            )));
        }
        Ok(self.op.apply(left, &right))
    }

    fn guess(&self, _x: &Array1<f64>, _y: &Array1<f64>) -> Result<Parameters> {
        Err(FitError::NotImplemented(
            "guess is not available for composite models; guess each component".to_string(),
        ))
    }

    fn components(&self) -> Vec<&dyn Model> {
        let mut components = self.left.components();
        components.extend(self.right.components());
        components
    }
}

/// Weighted residual `(model - data) * weights` of a model bound to data.
struct ModelObjective<'a> {
    model: &'a dyn Model,
    x: &'a Array1<f64>,
    data: &'a Array1<f64>,
    weights: Option<&'a Array1<f64>>,
}

impl Objective for ModelObjective<'_> {
    fn residuals(&self, params: &Parameters) -> Result<Array1<f64>> {
        let model = self.model.eval(params, self.x)?;
        if model.len() != self.data.len() {
            return Err(FitError::DimensionMismatch(format!(
                "model produced {} values for {} data points",
                model.len(),
                self.data.len()
            )));
        }
        let residual = model - self.data;
        Ok(match self.weights {
            Some(weights) => residual * weights,
            None => residual,
        })
    }
}

/// Result of fitting a [`Model`].
#[derive(Debug, Clone)]
pub struct ModelResult<'m> {
    model: &'m dyn Model,
    config: FitConfig,

    /// The minimizer outcome: best-fit parameters, statistics, covariance
    pub fit: MinimizerResult,

    /// Parameters the fit started from, constraints resolved
    pub init_params: Parameters,

    pub x: Array1<f64>,
    pub data: Array1<f64>,
    pub weights: Option<Array1<f64>>,

    /// Model evaluated with the initial parameters
    pub init_fit: Array1<f64>,

    /// Model evaluated with the best-fit parameters
    pub best_fit: Array1<f64>,
}

impl fmt::Debug for dyn Model + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl<'m> ModelResult<'m> {
    pub fn model(&self) -> &'m dyn Model {
        self.model
    }

    pub fn params(&self) -> &Parameters {
        &self.fit.params
    }

    pub fn success(&self) -> bool {
        self.fit.success
    }

    /// Evaluate the model with the best-fit parameters.
    pub fn eval(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        self.model.eval(&self.fit.params, x)
    }

    pub fn eval_components(&self, x: &Array1<f64>) -> Result<Vec<(String, Array1<f64>)>> {
        self.model.eval_components(&self.fit.params, x)
    }

    /// Weighted residual at the best fit.
    pub fn residual(&self) -> &Array1<f64> {
        &self.fit.residual
    }

    /// Coefficient of determination of the unweighted best fit.
    pub fn rsquared(&self) -> f64 {
        let mean = self.data.mean().unwrap_or(0.0);
        let ss_res = (&self.data - &self.best_fit).mapv(|v| v * v).sum();
        let ss_tot = self.data.mapv(|v| (v - mean).powi(2)).sum();
        1.0 - ss_res / ss_tot
    }

    /// Half-width of the `sigma` confidence band of the model at `x`.
    ///
    /// The gradient of the model with respect to the varied parameters is
    /// propagated through the covariance matrix and scaled by the Student-t
    /// quantile for `nfree` degrees of freedom.
    pub fn eval_uncertainty(&self, x: &Array1<f64>, sigma: f64) -> Result<Array1<f64>> {
        let covar = self.fit.covar.as_ref().ok_or_else(|| {
            FitError::InvalidInput("the fit has no covariance matrix".to_string())
        })?;
        if self.fit.nfree == 0 {
            return Err(FitError::InvalidInput(
                "no degrees of freedom left for an uncertainty band".to_string(),
            ));
        }

        let names = &self.fit.var_names;
        let params = &self.fit.params;
        let values = names
            .iter()
            .map(|n| params.value(n))
            .collect::<std::result::Result<Vec<f64>, _>>()?;
        let steps = names
            .iter()
            .zip(&values)
            .map(|(n, v)| match params.get(n).and_then(Parameter::stderr) {
                Some(sd) if sd.is_finite() && sd > 0.0 => sd * 1.0e-3,
                _ => (f64::EPSILON.sqrt() * v.abs()).max(1.0e-10),
            })
            .collect::<Vec<f64>>();

        let jac = central_jacobian(
            |point| {
                let mut trial = params.clone();
                for (name, &value) in names.iter().zip(point) {
                    trial.set_value(name, value)?;
                }
                trial.update_constraints()?;
                self.model.eval(&trial, x)
            },
            &values,
            &steps,
        )?;

        let variance = (jac.dot(covar) * &jac).sum_axis(ndarray::Axis(1));
        let probability = uncertainty::sigma_to_probability(sigma);
        let students_t = StudentsT::new(0.0, 1.0, self.fit.nfree as f64)
            .map_err(|e| FitError::InvalidInput(e.to_string()))?;
        let scale = students_t.inverse_cdf((1.0 + probability) / 2.0);

        Ok(variance.mapv(|v| scale * v.max(0.0).sqrt()))
    }

    /// Profile-likelihood confidence intervals for the varied parameters.
    pub fn conf_interval(
        &self,
        names: Option<&[&str]>,
        sigmas: &[f64],
    ) -> Result<Vec<ParameterInterval>> {
        let objective = ModelObjective {
            model: self.model,
            x: &self.x,
            data: &self.data,
            weights: self.weights.as_ref(),
        };
        uncertainty::conf_interval(
            &Minimizer::new(self.config.clone()),
            &objective,
            &self.fit,
            names,
            sigmas,
        )
    }
}

/// Drop points where the data, the abscissa or the weight is not finite.
fn omit_non_finite(
    data: &Array1<f64>,
    x: &Array1<f64>,
    weights: Option<&Array1<f64>>,
) -> (Array1<f64>, Array1<f64>, Option<Array1<f64>>) {
    let keep = (0..data.len())
        .filter(|&i| {
            data[i].is_finite()
                && x[i].is_finite()
                && weights.map_or(true, |w| w[i].is_finite())
        })
        .collect::<Vec<usize>>();
    let pick = |a: &Array1<f64>| keep.iter().map(|&i| a[i]).collect::<Array1<f64>>();
    (pick(data), pick(x), weights.map(pick))
}

/// Fit any model, including trait objects.
///
/// # Arguments
///
/// * `model` - The model to fit
/// * `data` - Observed values, one per element of `x`
/// * `params` - Starting parameters; must contain every name in `model.param_names()`
/// * `x` - The independent variable values
/// * `weights` - Optional multipliers of the residual, e.g. `1 / sigma`
/// * `config` - Solver and NaN handling options
pub fn fit_model<'m>(
    model: &'m dyn Model,
    data: &Array1<f64>,
    params: &Parameters,
    x: &Array1<f64>,
    weights: Option<&Array1<f64>>,
    config: FitConfig,
) -> Result<ModelResult<'m>> {
    check_lengths(x, data)?;
    if let Some(weights) = weights {
        if weights.len() != data.len() {
            return Err(FitError::DimensionMismatch(format!(
                "{} weights for {} data points",
                weights.len(),
                data.len()
            )));
        }
    }

    let missing = model
        .param_names()
        .into_iter()
        .filter(|name| !params.contains(name))
        .collect::<Vec<String>>();
    if !missing.is_empty() {
        return Err(FitError::Model(format!(
            "{} is missing parameters: {}",
            model.name(),
            missing.join(", ")
        )));
    }

    let (data, x, weights) = match config.nan_policy {
        NanPolicy::Omit => omit_non_finite(data, x, weights),
        NanPolicy::Raise => {
            let inputs = [Some(data), Some(x), weights];
            if inputs
                .iter()
                .flatten()
                .any(|a| a.iter().any(|v| !v.is_finite()))
            {
                return Err(FitError::NanEncountered(
                    "data, x or weights contain non-finite values".to_string(),
                ));
            }
            (data.clone(), x.clone(), weights.cloned())
        }
        NanPolicy::Propagate => (data.clone(), x.clone(), weights.cloned()),
    };

    let mut init_params = params.clone();
    init_params.update_constraints()?;
    let init_fit = model.eval(&init_params, &x)?;

    info!(model = %model.name(), npoints = data.len(), "fitting model");
    let objective = ModelObjective {
        model,
        x: &x,
        data: &data,
        weights: weights.as_ref(),
    };
    let fit = Minimizer::new(config.clone()).minimize(&objective, &init_params)?;
    let best_fit = model.eval(&fit.params, &x)?;

    Ok(ModelResult {
        model,
        config,
        fit,
        init_params,
        x,
        data,
        weights,
        init_fit,
        best_fit,
    })
}
