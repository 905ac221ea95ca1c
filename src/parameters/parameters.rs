//! Ordered parameter collection
//!
//! [`Parameters`] keeps parameters in insertion order, resolves constraint
//! expressions in dependency order and converts between named values and the
//! flat internal vector the optimizer works on.

use crate::error::Result;
use crate::parameters::expression::{EvaluationContext, Expression, ExpressionError};
use crate::parameters::parameter::{validate_name, Parameter, ParameterError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A collection of parameters keyed by name, in insertion order
///
/// # Examples
///
/// ```
/// use modelfit::parameters::Parameters;
///
/// let mut params = Parameters::new();
/// params.add("sigma", 1.5).unwrap();
/// params.add("fwhm", 0.0).unwrap().set_expr(Some("2.3548200*sigma")).unwrap();
/// params.update_constraints().unwrap();
///
/// assert!((params.value("fwhm").unwrap() - 3.53223).abs() < 1e-9);
/// assert_eq!(params.varying_names(), vec!["sigma"]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Parameter>", into = "Vec<Parameter>")]
pub struct Parameters {
    params: Vec<Parameter>,
    index: HashMap<String, usize>,
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    InProgress,
    Done,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a varying, unbounded parameter and return it for further setup.
    ///
    /// An existing parameter with the same name is replaced in place.
    pub fn add(&mut self, name: &str, value: f64) -> std::result::Result<&mut Parameter, ParameterError> {
        let position = self.insert(Parameter::new(name, value))?;
        Ok(&mut self.params[position])
    }

    /// Add a fully configured parameter, replacing one of the same name.
    pub fn add_param(&mut self, param: Parameter) -> std::result::Result<(), ParameterError> {
        self.insert(param).map(|_| ())
    }

    pub fn add_many<I>(&mut self, params: I) -> std::result::Result<(), ParameterError>
    where
        I: IntoIterator<Item = Parameter>,
    {
        params.into_iter().try_for_each(|param| self.add_param(param))
    }

    fn insert(&mut self, param: Parameter) -> std::result::Result<usize, ParameterError> {
        validate_name(param.name())?;
        match self.index.get(param.name()) {
            Some(&position) => {
                self.params[position] = param;
                Ok(position)
            }
            None => {
                let position = self.params.len();
                self.index.insert(param.name().to_string(), position);
                self.params.push(param);
                Ok(position)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.index.get(name).map(|&i| &self.params[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.params[i]),
            None => None,
        }
    }

    /// Current value of a parameter.
    pub fn value(&self, name: &str) -> std::result::Result<f64, ParameterError> {
        self.get(name)
            .map(Parameter::value)
            .ok_or_else(|| not_found(name))
    }

    /// Set a parameter's value (clamped into its bounds).
    pub fn set_value(&mut self, name: &str, value: f64) -> std::result::Result<(), ParameterError> {
        self.get_mut(name)
            .map(|param| param.set_value(value))
            .ok_or_else(|| not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        let position = self.index.remove(name)?;
        let param = self.params.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(param)
    }

    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.params.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Add every parameter of `other` that is not already present.
    pub fn extend_from(&mut self, other: &Parameters) {
        for param in other.iter() {
            if !self.contains(param.name()) {
                let position = self.params.len();
                self.index.insert(param.name().to_string(), position);
                self.params.push(param.clone());
            }
        }
    }

    /// Names referenced directly by the expression of `name`.
    pub fn dependencies(&self, name: &str) -> std::result::Result<Vec<String>, ParameterError> {
        let param = self.get(name).ok_or_else(|| not_found(name))?;
        Ok(param
            .expression()
            .map(Expression::variables)
            .unwrap_or_default())
    }

    /// Parameters whose expressions reference `name` directly.
    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.params
            .iter()
            .filter(|p| {
                p.expression()
                    .map_or(false, |expr| expr.variables().iter().any(|v| v == name))
            })
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Expression parameters ordered so that every one comes after the
    /// parameters it references.
    fn constraint_order(&self) -> std::result::Result<Vec<usize>, ParameterError> {
        let mut state: HashMap<usize, Visit> = HashMap::new();
        let mut order = Vec::new();

        for (i, param) in self.params.iter().enumerate() {
            if param.expression().is_some() {
                self.visit(i, &mut state, &mut order)?;
            }
        }
        Ok(order)
    }

    fn visit(
        &self,
        i: usize,
        state: &mut HashMap<usize, Visit>,
        order: &mut Vec<usize>,
    ) -> std::result::Result<(), ParameterError> {
        match state.get(&i) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => {
                return Err(ParameterError::CircularDependency {
                    name: self.params[i].name().to_string(),
                })
            }
            None => {}
        }

        let param = &self.params[i];
        let Some(expr) = param.expression() else {
            return Ok(());
        };

        state.insert(i, Visit::InProgress);
        for variable in expr.variables() {
            let &dep = self
                .index
                .get(&variable)
                .ok_or_else(|| ParameterError::UndefinedName {
                    param: param.name().to_string(),
                    name: variable.clone(),
                })?;
            self.visit(dep, state, order)?;
        }
        state.insert(i, Visit::Done);
        order.push(i);
        Ok(())
    }

    /// Evaluate every constraint expression in dependency order.
    ///
    /// Results are clamped into the bounds of the constrained parameter.
    pub fn update_constraints(&mut self) -> std::result::Result<(), ParameterError> {
        for i in self.constraint_order()? {
            let param = &self.params[i];
            let Some(expr) = param.expression() else {
                continue;
            };
            let value = expr
                .evaluate(self)
                .map_err(|source| ParameterError::Expression {
                    name: param.name().to_string(),
                    source,
                })?;
            self.params[i].set_value(value);
        }
        Ok(())
    }

    /// Names of the parameters the optimizer varies, in order.
    pub fn varying_names(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|p| p.is_free())
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Values of the varying parameters mapped into unbounded space.
    pub fn internal_values(&self) -> Vec<f64> {
        self.params
            .iter()
            .filter(|p| p.is_free())
            .map(Parameter::to_internal)
            .collect()
    }

    /// Set the varying parameters from internal values, then resolve
    /// constraints.
    pub fn set_internal_values(&mut self, values: &[f64]) -> std::result::Result<(), ParameterError> {
        let expected = self.params.iter().filter(|p| p.is_free()).count();
        if values.len() != expected {
            return Err(ParameterError::LengthMismatch {
                expected,
                got: values.len(),
            });
        }

        self.params
            .iter_mut()
            .filter(|p| p.is_free())
            .zip(values)
            .for_each(|(param, &internal)| param.set_internal(internal));

        self.update_constraints()
    }

    /// Evaluate an ad-hoc expression against the current values.
    pub fn eval(&self, expr: &str) -> std::result::Result<f64, ExpressionError> {
        Expression::parse(expr)?.evaluate(self)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

fn not_found(name: &str) -> ParameterError {
    ParameterError::NotFound {
        name: name.to_string(),
    }
}

impl EvaluationContext for Parameters {
    fn get_variable(&self, name: &str) -> Option<f64> {
        self.get(name).map(Parameter::value)
    }
}

impl TryFrom<Vec<Parameter>> for Parameters {
    type Error = ParameterError;

    fn try_from(list: Vec<Parameter>) -> std::result::Result<Self, Self::Error> {
        let mut params = Parameters::new();
        for mut param in list {
            param.recompile()?;
            params.add_param(param)?;
        }
        Ok(params)
    }
}

impl From<Parameters> for Vec<Parameter> {
    fn from(params: Parameters) -> Self {
        params.params
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}
