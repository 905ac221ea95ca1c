//! Step and rectangle models.

use super::{min_max, params_with_values};
use crate::lineshapes::{self, StepForm};
use crate::model::{FuncModel, ParamHint};

/// Step from 0 to `amplitude` at `center` with width `sigma`.
///
/// The guess puts the step in the middle of the `x` range with the full
/// data span as amplitude.
pub fn step_model(form: StepForm) -> FuncModel {
    FuncModel::new(
        &format!("step_{form}"),
        &[("amplitude", 1.0), ("center", 0.0), ("sigma", 1.0)],
        move |x, p| lineshapes::step(x, p[0], p[1], p[2], form),
    )
    .with_builtin_hint("sigma", ParamHint::new().with_min(0.0))
    .with_guess(|model, x, y| {
        let (ymin, ymax) = min_max(y)?;
        let (xmin, xmax) = min_max(x)?;
        params_with_values(
            model,
            &[
                ("amplitude", ymax - ymin),
                ("center", 0.5 * (xmin + xmax)),
                ("sigma", (xmax - xmin) / 7.0),
            ],
        )
    })
}

/// Rising step at `center1` and falling step at `center2`, with a derived
/// `midpoint` parameter.
pub fn rectangle_model(form: StepForm) -> FuncModel {
    FuncModel::new(
        &format!("rectangle_{form}"),
        &[
            ("amplitude", 1.0),
            ("center1", 0.0),
            ("sigma1", 1.0),
            ("center2", 1.0),
            ("sigma2", 1.0),
        ],
        move |x, p| lineshapes::rectangle(x, p[0], p[1], p[2], p[3], p[4], form),
    )
    .with_builtin_hint("sigma1", ParamHint::new().with_min(0.0))
    .with_builtin_hint("sigma2", ParamHint::new().with_min(0.0))
    .with_builtin_hint("midpoint", ParamHint::new().with_expr("(center1+center2)/2.0"))
    .with_guess(|model, x, y| {
        let (ymin, ymax) = min_max(y)?;
        let (xmin, xmax) = min_max(x)?;
        let span = xmax - xmin;
        params_with_values(
            model,
            &[
                ("amplitude", ymax - ymin),
                ("center1", xmin + span / 4.0),
                ("sigma1", span / 7.0),
                ("center2", xmax - span / 4.0),
                ("sigma2", span / 7.0),
            ],
        )
    })
}
