//! Least-squares minimization over named parameters.
//!
//! [`Minimizer`] turns a [`Parameters`] set and an [`Objective`] into a
//! problem for the `levenberg-marquardt` solver: the varying parameters are
//! mapped into unbounded internal coordinates, constraint expressions are
//! re-resolved before every evaluation, and the Jacobian is estimated with
//! forward differences. After the solver stops, fit statistics and the
//! covariance matrix are computed and written back onto the parameters.

use crate::config::{FitConfig, NanPolicy};
use crate::error::{FitError, Result};
use crate::parameters::Parameters;
use crate::uncertainty::covariance;
use crate::utils::{forward_jacobian, nalgebra_to_ndarray, ndarray_vec_to_nalgebra};
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn};
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// A residual function of named parameters.
///
/// The minimizer drives the sum of squares of the returned array to a
/// minimum. Any `Fn(&Parameters) -> Result<Array1<f64>>` closure is an
/// objective.
pub trait Objective: Sync {
    fn residuals(&self, params: &Parameters) -> Result<Array1<f64>>;
}

impl<F> Objective for F
where
    F: Fn(&Parameters) -> Result<Array1<f64>> + Sync,
{
    fn residuals(&self, params: &Parameters) -> Result<Array1<f64>> {
        self(params)
    }
}

/// Outcome of a minimization.
#[derive(Debug, Clone)]
pub struct MinimizerResult {
    /// Best-fit parameters with standard errors and correlations
    pub params: Parameters,

    /// Names of the varied parameters, in the order used by `covar`
    pub var_names: Vec<String>,

    /// Values of the varied parameters before the fit
    pub init_vals: Vec<f64>,

    /// Covariance matrix of the varied parameters, if it could be estimated
    pub covar: Option<Array2<f64>>,

    pub success: bool,

    /// Termination reason reported by the solver
    pub message: String,

    /// Number of objective evaluations made while searching, never more
    /// than `max_nfev`
    pub nfev: usize,

    pub ndata: usize,
    pub nvarys: usize,
    pub nfree: usize,

    /// Sum of squared residuals
    pub chisqr: f64,

    /// `chisqr / nfree`
    pub redchi: f64,

    /// Akaike information criterion
    pub aic: f64,

    /// Bayesian information criterion
    pub bic: f64,

    /// Residuals at the best fit
    pub residual: Array1<f64>,

    /// True when every varied parameter received a finite standard error
    pub errorbars: bool,
}

impl MinimizerResult {
    /// Best-fit values by parameter name, in parameter order.
    pub fn best_values(&self) -> BTreeMap<String, f64> {
        self.params
            .iter()
            .map(|p| (p.name().to_string(), p.value()))
            .collect()
    }
}

/// Fit statistics derived from the residuals.
struct Statistics {
    chisqr: f64,
    redchi: f64,
    aic: f64,
    bic: f64,
}

impl Statistics {
    fn new(residual: &Array1<f64>, nvarys: usize) -> Self {
        let ndata = residual.len() as f64;
        let nfree = residual.len().saturating_sub(nvarys).max(1) as f64;
        let chisqr = residual.dot(residual);
        let nvarys = nvarys as f64;

        // avoid ln(0) for an exact fit
        let neg2_log_likel = ndata * (chisqr.max(1.0e-250 * ndata) / ndata).ln();
        Self {
            chisqr,
            redchi: chisqr / nfree,
            aic: neg2_log_likel + 2.0 * nvarys,
            bic: neg2_log_likel + ndata.ln() * nvarys,
        }
    }
}

pub(crate) fn apply_nan_policy(values: Array1<f64>, policy: NanPolicy) -> Result<Array1<f64>> {
    match policy {
        NanPolicy::Propagate => Ok(values),
        NanPolicy::Omit => Ok(values.mapv(|v| if v.is_finite() { v } else { 0.0 })),
        NanPolicy::Raise => {
            let bad = values.iter().filter(|v| !v.is_finite()).count();
            if bad == 0 {
                Ok(values)
            } else {
                Err(FitError::NanEncountered(format!(
                    "{bad} of {} residuals are not finite",
                    values.len()
                )))
            }
        }
    }
}

/// Adapter between named parameters and the solver's internal vector.
struct FitProblem<'a, O: Objective + ?Sized> {
    objective: &'a O,
    params: Parameters,
    internal: DVector<f64>,
    ndata: usize,
    epsfcn: f64,
    nan_policy: NanPolicy,
    max_nfev: Option<usize>,
    nfev: AtomicUsize,
    exhausted: AtomicBool,
    best: Mutex<Option<(f64, DVector<f64>)>>,
    error: Mutex<Option<FitError>>,
}

impl<'a, O: Objective + ?Sized> FitProblem<'a, O> {
    fn new(objective: &'a O, params: Parameters, ndata: usize, config: &FitConfig) -> Self {
        let internal = DVector::from_vec(params.internal_values());
        Self {
            objective,
            params,
            internal,
            ndata,
            epsfcn: config.epsfcn,
            nan_policy: config.nan_policy,
            max_nfev: config.max_nfev,
            // the caller already spent one evaluation on the starting point
            nfev: AtomicUsize::new(1),
            exhausted: AtomicBool::new(false),
            best: Mutex::new(None),
            error: Mutex::new(None),
        }
    }

    fn residuals_at(&self, internal: &DVector<f64>) -> Result<Array1<f64>> {
        let mut params = self.params.clone();
        params.set_internal_values(internal.as_slice())?;
        let residual = apply_nan_policy(self.objective.residuals(&params)?, self.nan_policy)?;
        if residual.len() != self.ndata {
            return Err(FitError::DimensionMismatch(format!(
                "objective returned {} residuals, expected {}",
                residual.len(),
                self.ndata
            )));
        }
        Ok(residual)
    }

    /// Take one evaluation from the budget, or mark the budget as spent.
    fn charge(&self) -> bool {
        let limit = self.max_nfev.unwrap_or(usize::MAX);
        let charged = self
            .nfev
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| (n < limit).then_some(n + 1))
            .is_ok();
        if !charged {
            self.exhausted.store(true, Ordering::Relaxed);
        }
        charged
    }

    fn exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Relaxed)
    }

    /// Evaluate for the solver; failures are stored and stop the fit.
    fn evaluate(&self, internal: &DVector<f64>) -> Option<DVector<f64>> {
        if self.failed() || !self.charge() {
            return None;
        }
        self.evaluate_uncounted(internal)
    }

    /// Evaluate outside the search budget, for the final statistics.
    fn evaluate_uncounted(&self, internal: &DVector<f64>) -> Option<DVector<f64>> {
        if self.failed() {
            return None;
        }
        match self.residuals_at(internal) {
            Ok(residual) => Some(ndarray_vec_to_nalgebra(residual.view())),
            Err(err) => {
                self.record(err);
                None
            }
        }
    }

    fn failed(&self) -> bool {
        self.error.lock().map_or(true, |slot| slot.is_some())
    }

    fn record(&self, err: FitError) {
        if let Ok(mut slot) = self.error.lock() {
            if slot.is_none() {
                debug!(error = %err, "objective evaluation failed");
                *slot = Some(err);
            }
        }
    }

    fn take_error(&self) -> Option<FitError> {
        self.error.lock().ok().and_then(|mut slot| slot.take())
    }

    fn jacobian_at(&self, internal: &DVector<f64>, f0: &DVector<f64>) -> Option<DMatrix<f64>> {
        forward_jacobian(|x| self.evaluate_uncounted(x), internal, f0, self.epsfcn)
    }

    fn remember(&self, internal: &DVector<f64>, chisqr: f64) {
        if let Ok(mut slot) = self.best.lock() {
            if slot.as_ref().map_or(true, |(best, _)| chisqr < *best) {
                *slot = Some((chisqr, internal.clone()));
            }
        }
    }

    /// Lowest-chisqr point the solver asked for, or the start.
    fn best_point(&self) -> DVector<f64> {
        self.best
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|(_, x)| x.clone()))
            .unwrap_or_else(|| DVector::from_vec(self.params.internal_values()))
    }
}

impl<'a, O: Objective + ?Sized> LeastSquaresProblem<f64, Dyn, Dyn> for FitProblem<'a, O> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.internal.copy_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.internal.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let residual = self.evaluate(&self.internal)?;
        self.remember(&self.internal, residual.norm_squared());
        Some(residual)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let f0 = self.evaluate(&self.internal)?;
        forward_jacobian(|x| self.evaluate(x), &self.internal, &f0, self.epsfcn)
    }
}

/// Least-squares minimizer configured by a [`FitConfig`].
///
/// # Examples
///
/// ```
/// use modelfit::{FitConfig, Minimizer, Parameters};
/// use ndarray::Array1;
///
/// let x = Array1::linspace(0.0, 5.0, 20);
/// let y = x.mapv(|v| 3.0 * v - 1.0);
///
/// let mut params = Parameters::new();
/// params.add("slope", 1.0).unwrap();
/// params.add("intercept", 0.0).unwrap();
///
/// let residual = |p: &Parameters| -> modelfit::Result<Array1<f64>> {
///     let slope = p.value("slope")?;
///     let intercept = p.value("intercept")?;
///     Ok(x.mapv(|v| slope * v + intercept) - &y)
/// };
///
/// let result = Minimizer::new(FitConfig::default()).minimize(&residual, &params).unwrap();
/// assert!((result.params.value("slope").unwrap() - 3.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Minimizer {
    config: FitConfig,
}

impl Minimizer {
    pub fn new(config: FitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Minimize the sum of squares of `objective` starting from `params`.
    ///
    /// The input parameters are left untouched; the best fit is returned in
    /// the result.
    pub fn minimize<O: Objective + ?Sized>(
        &self,
        objective: &O,
        params: &Parameters,
    ) -> Result<MinimizerResult> {
        let mut params = params.clone();
        params.update_constraints()?;
        for param in params.iter_mut() {
            param.set_stderr(None);
            param.set_correl(BTreeMap::new());
        }

        let var_names = params.varying_names();
        let init_vals = var_names
            .iter()
            .map(|name| params.value(name))
            .collect::<std::result::Result<Vec<f64>, _>>()?;
        let nvarys = var_names.len();

        let initial = apply_nan_policy(objective.residuals(&params)?, self.config.nan_policy)?;
        let ndata = initial.len();
        if ndata == 0 {
            return Err(FitError::InvalidInput(
                "objective returned no residuals".to_string(),
            ));
        }
        if ndata < nvarys {
            return Err(FitError::InvalidInput(format!(
                "{ndata} data points are not enough to fit {nvarys} varying parameters"
            )));
        }

        if nvarys == 0 {
            debug!(ndata, "no varying parameters, evaluating once");
            return Ok(self.finish(
                params,
                var_names,
                init_vals,
                initial,
                1,
                true,
                "no varying parameters".to_string(),
                None,
            ));
        }

        info!(ndata, nvarys, "starting least-squares fit");
        let problem = FitProblem::new(objective, params, ndata, &self.config);
        let (problem, report) = LevenbergMarquardt::new()
            .with_ftol(self.config.ftol)
            .with_xtol(self.config.xtol)
            .with_gtol(self.config.gtol)
            .with_patience(self.config.patience())
            .minimize(problem);

        if let Some(err) = problem.take_error() {
            warn!(error = %err, "fit aborted by objective error");
            return Err(err);
        }

        let nfev = problem.nfev.load(Ordering::Relaxed);
        let (success, message, best) = if problem.exhausted() {
            let message = format!("max_nfev reached after {nfev} evaluations");
            (false, message, problem.best_point())
        } else {
            let message = format!("{:?}", report.termination);
            (report.termination.was_successful(), message, problem.params())
        };
        if success {
            info!(termination = %message, nfev, "fit finished");
        } else {
            warn!(termination = %message, nfev, "fit did not converge");
        }

        let residual = problem.residuals_at(&best)?;
        let jacobian = if self.config.calc_covar {
            let f0 = ndarray_vec_to_nalgebra(residual.view());
            let jacobian = problem.jacobian_at(&best, &f0);
            if let Some(err) = problem.take_error() {
                return Err(err);
            }
            jacobian
        } else {
            None
        };

        let mut params = problem.params.clone();
        params.set_internal_values(best.as_slice())?;

        Ok(self.finish(
            params,
            var_names,
            init_vals,
            residual,
            nfev,
            success,
            message,
            jacobian.map(|jac| (jac, best)),
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        mut params: Parameters,
        var_names: Vec<String>,
        init_vals: Vec<f64>,
        residual: Array1<f64>,
        nfev: usize,
        success: bool,
        message: String,
        jacobian: Option<(DMatrix<f64>, DVector<f64>)>,
    ) -> MinimizerResult {
        let ndata = residual.len();
        let nvarys = var_names.len();
        let stats = Statistics::new(&residual, nvarys);

        let covar = jacobian.and_then(|(jac, internal)| {
            let cov = covariance::covariance_from_jacobian(&jac);
            if cov.is_none() {
                warn!("J^T J is singular, uncertainties not estimated");
            }
            let mut cov = cov?;
            if self.config.scale_covar {
                cov *= stats.redchi;
            }
            let gradients = var_names
                .iter()
                .zip(internal.iter())
                .map(|(name, &int)| params.get(name).map_or(1.0, |p| p.transform().gradient(int)))
                .collect::<Vec<f64>>();
            Some(covariance::to_external(&cov, &gradients))
        });

        let errorbars = match &covar {
            Some(cov) => {
                covariance::apply_to_parameters(&mut params, &var_names, cov);
                if let Err(err) = covariance::propagate_to_expressions(&mut params, &var_names, cov)
                {
                    debug!(error = %err, "could not propagate uncertainties to constrained parameters");
                }
                cov.diagonal().iter().all(|v| v.is_finite() && *v >= 0.0)
            }
            None => false,
        };

        MinimizerResult {
            params,
            var_names,
            init_vals,
            covar: covar.as_ref().map(nalgebra_to_ndarray),
            success,
            message,
            nfev,
            ndata,
            nvarys,
            nfree: ndata.saturating_sub(nvarys),
            chisqr: stats.chisqr,
            redchi: stats.redchi,
            aic: stats.aic,
            bic: stats.bic,
            residual,
            errorbars,
        }
    }
}
