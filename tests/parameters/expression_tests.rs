//! Tests for the Expression parsing and evaluation

use approx::assert_relative_eq;
use modelfit::parameters::{EvaluationContext, Expression, ExpressionError};
use std::collections::HashMap;

fn vars(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
}

fn eval(expr: &str, context: &HashMap<String, f64>) -> Result<f64, ExpressionError> {
    Expression::parse(expr)?.evaluate(context)
}

#[test]
fn test_expression_parsing() {
    assert!(Expression::parse("42").unwrap().variables().is_empty());
    assert_eq!(Expression::parse("x").unwrap().variables(), vec!["x"]);
    assert_eq!(
        Expression::parse("x * y + x").unwrap().variables(),
        vec!["x", "y"]
    );
    assert_eq!(
        Expression::parse("sin(x) + cos(y) * pi").unwrap().variables(),
        vec!["x", "y"]
    );
    assert_eq!(
        Expression::parse("2.3548200*g1_sigma").unwrap().variables(),
        vec!["g1_sigma"]
    );
}

#[test]
fn test_operator_precedence() {
    let context = vars(&[("x", 3.0), ("y", 2.0)]);
    assert_eq!(eval("1 + 2 * 3", &context).unwrap(), 7.0);
    assert_eq!(eval("(1 + 2) * 3", &context).unwrap(), 9.0);
    assert_eq!(eval("x - y - 1", &context).unwrap(), 0.0);
    assert_eq!(eval("2 ** 3 ** 2", &context).unwrap(), 512.0);
    assert_eq!(eval("-x ** 2", &context).unwrap(), -9.0);
    assert_eq!(eval("x ^ y", &context).unwrap(), 9.0);
    assert_eq!(eval("2 ** -1", &context).unwrap(), 0.5);
    assert_eq!(eval("-7 % 3", &context).unwrap(), 2.0);
    assert_eq!(eval("1.5e2 / 3e-1", &context).unwrap(), 500.0);
}

#[test]
fn test_functions_and_constants() {
    let context = vars(&[("a", 4.0), ("b", -1.5)]);
    assert_eq!(eval("sqrt(a)", &context).unwrap(), 2.0);
    assert_eq!(eval("abs(b)", &context).unwrap(), 1.5);
    assert_eq!(eval("max(1e-15, b)", &context).unwrap(), 1e-15);
    assert_eq!(eval("min(a, b, 0)", &context).unwrap(), -1.5);
    assert_relative_eq!(eval("log(100, 10)", &context).unwrap(), 2.0);
    assert_eq!(eval("sign(b)", &context).unwrap(), -1.0);
    assert_relative_eq!(eval("log(e)", &context).unwrap(), 1.0);
    assert_relative_eq!(eval("atan2(1, 1) * 4", &context).unwrap(), std::f64::consts::PI);
    assert_relative_eq!(eval("sqrt(pi/ln(2))", &context).unwrap(), 2.1289340388624525);
    assert!(eval("inf", &context).unwrap().is_infinite());
}

#[test]
fn test_evaluation_errors() {
    let context = vars(&[("x", 0.0)]);
    assert_eq!(
        eval("1 / x", &context),
        Err(ExpressionError::DivisionByZero)
    );
    assert_eq!(
        eval("y + 1", &context),
        Err(ExpressionError::UndefinedVariable {
            name: "y".to_string()
        })
    );
    assert!(matches!(
        eval("gamma(x)", &context),
        Err(ExpressionError::UndefinedFunction { .. })
    ));
    assert!(matches!(
        eval("sqrt(x, x)", &context),
        Err(ExpressionError::WrongArity { got: 2, .. })
    ));
    assert!(matches!(
        eval("max()", &context),
        Err(ExpressionError::WrongArity { got: 0, .. })
    ));
}

#[test]
fn test_parse_errors() {
    for bad in ["", "2 *", "(x + 1", "x y", "3 + * 4", "f(,)"] {
        assert!(
            matches!(Expression::parse(bad), Err(ExpressionError::ParseError { .. })),
            "'{bad}' should not parse"
        );
    }
}

#[test]
fn test_display_round_trip() {
    let context = vars(&[("a", 1.25), ("b", -0.5)]);
    for source in ["a + b * 2", "-(a - b) ** 2 / 3", "max(a, b, 1e-15) % 0.75", "exp(-a) + hypot(a, b)"] {
        let expr = Expression::parse(source).unwrap();
        let reparsed = Expression::parse(&expr.to_string()).unwrap();
        assert_eq!(reparsed, expr, "{source}");
        assert_eq!(
            reparsed.evaluate(&context).unwrap(),
            expr.evaluate(&context).unwrap()
        );
    }
}

#[test]
fn test_rename_variables() {
    let expr = Expression::parse("2*sigma + offset").unwrap();
    let renamed = expr.rename_variables(&|name: &str| {
        if name == "sigma" {
            format!("g1_{name}")
        } else {
            name.to_string()
        }
    });
    assert_eq!(renamed.variables(), vec!["g1_sigma", "offset"]);
}

/// Every variable evaluates to twice the length of its name.
struct Doubling;

impl EvaluationContext for Doubling {
    fn get_variable(&self, name: &str) -> Option<f64> {
        Some(name.len() as f64 * 2.0)
    }
}

#[test]
fn test_custom_context() {
    let expr = Expression::parse("abc + z").unwrap();
    assert_eq!(expr.evaluate(&Doubling).unwrap(), 8.0);
}
