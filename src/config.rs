//! Fit configuration.
//!
//! [`FitConfig`] collects the tolerances handed to the Levenberg-Marquardt
//! solver together with the options that control how residuals and the
//! covariance matrix are treated. It can be built in code or read from JSON.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How non-finite values in the data or the residuals are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NanPolicy {
    /// Fail with an error. Default.
    #[default]
    Raise,

    /// Drop non-finite data points before fitting; non-finite residuals are
    /// treated as zero.
    Omit,

    /// Pass values through unchanged.
    Propagate,
}

/// Configuration options for a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Relative tolerance on the reduction of the sum of squares. Default: 1e-7
    pub ftol: f64,

    /// Relative tolerance on the change of the parameters. Default: 1e-7
    pub xtol: f64,

    /// Orthogonality tolerance between residuals and Jacobian columns. Default: 1e-7
    pub gtol: f64,

    /// Hard limit on objective evaluations during the search, Jacobian
    /// columns included. A fit that hits it reports `success = false`.
    /// Default: None
    pub max_nfev: Option<usize>,

    /// Relative step for the finite-difference Jacobian. Default: machine epsilon
    pub epsfcn: f64,

    /// Scale the covariance matrix by the reduced chi-square. Default: true
    pub scale_covar: bool,

    /// Estimate the covariance matrix after the fit. Default: true
    pub calc_covar: bool,

    /// Handling of non-finite values. Default: Raise
    pub nan_policy: NanPolicy,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            ftol: 1e-7,
            xtol: 1e-7,
            gtol: 1e-7,
            max_nfev: None,
            epsfcn: f64::EPSILON,
            scale_covar: true,
            calc_covar: true,
            nan_policy: NanPolicy::default(),
        }
    }
}

impl FitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.ftol = ftol;
        self
    }

    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.xtol = xtol;
        self
    }

    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.gtol = gtol;
        self
    }

    pub fn with_max_nfev(mut self, max_nfev: usize) -> Self {
        self.max_nfev = Some(max_nfev);
        self
    }

    pub fn with_epsfcn(mut self, epsfcn: f64) -> Self {
        self.epsfcn = epsfcn;
        self
    }

    pub fn with_scale_covar(mut self, scale_covar: bool) -> Self {
        self.scale_covar = scale_covar;
        self
    }

    pub fn with_calc_covar(mut self, calc_covar: bool) -> Self {
        self.calc_covar = calc_covar;
        self
    }

    pub fn with_nan_policy(mut self, nan_policy: NanPolicy) -> Self {
        self.nan_policy = nan_policy;
        self
    }

    /// Read a configuration from JSON; missing keys take their defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelfit::config::{FitConfig, NanPolicy};
    ///
    /// let config = FitConfig::from_json(r#"{"xtol": 1e-10, "nan_policy": "omit"}"#).unwrap();
    /// assert_eq!(config.xtol, 1e-10);
    /// assert_eq!(config.nan_policy, NanPolicy::Omit);
    /// assert!(config.scale_covar);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Patience factor for the solver. With `max_nfev` set the evaluation
    /// budget stops the search first, since the solver only counts its own
    /// residual calls.
    pub(crate) fn patience(&self) -> usize {
        self.max_nfev.map_or(2000, |max_nfev| max_nfev.max(1))
    }
}
