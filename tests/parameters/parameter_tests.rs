//! Integration tests for the Parameter struct
//!
//! These tests verify that the Parameter struct behaves correctly in various scenarios.

use modelfit::parameters::{Bounds, BoundsKind, Parameter, ParameterError};

#[test]
fn test_parameter_lifecycle() {
    let mut param = Parameter::new("amplitude", 10.0);

    assert_eq!(param.name(), "amplitude");
    assert_eq!(param.value(), 10.0);
    assert!(param.vary());
    assert_eq!(param.min(), f64::NEG_INFINITY);
    assert_eq!(param.max(), f64::INFINITY);
    assert!(param.expr().is_none());
    assert!(param.stderr().is_none());

    param.set_value(15.0);
    assert_eq!(param.value(), 15.0);
    assert_eq!(param.init_value(), 10.0);

    param.reset();
    assert_eq!(param.value(), 10.0);

    // Values outside the bounds are clamped
    param.set_bounds(0.0, 20.0).unwrap();
    param.set_value(-5.0);
    assert_eq!(param.value(), 0.0);
    param.set_value(25.0);
    assert_eq!(param.value(), 20.0);

    param.set_vary(false);
    assert!(!param.vary());
    assert!(!param.is_free());

    // An expression turns vary off; turning vary on drops the expression
    param.set_expr(Some("other_param * 2")).unwrap();
    assert_eq!(param.expr(), Some("other_param * 2"));
    assert!(!param.vary());
    param.set_vary(true);
    assert!(param.expr().is_none());
    assert!(param.is_free());
}

#[test]
fn test_bounds_clamp_existing_value() {
    let param = Parameter::new("fraction", 1.5).with_bounds(0.0, 1.0).unwrap();
    assert_eq!(param.value(), 1.0);
    assert_eq!(param.bounds().kind(), BoundsKind::Both);

    let param = Parameter::new("sigma", -1.0).with_min(0.0).unwrap();
    assert_eq!(param.value(), 0.0);
    assert_eq!(param.bounds().kind(), BoundsKind::Lower);

    let err = Parameter::new("x", 0.0).with_bounds(2.0, 1.0).unwrap_err();
    assert!(matches!(err, ParameterError::Bounds(_)));
}

#[test]
fn test_invalid_expression_is_rejected() {
    let mut param = Parameter::new("x", 1.0);
    let err = param.set_expr(Some("2 * (y")).unwrap_err();
    assert!(matches!(err, ParameterError::Expression { .. }));
    // the previous state is untouched
    assert!(param.vary());
    assert!(param.expr().is_none());

    // an empty expression clears it
    param.set_expr(Some("y")).unwrap();
    param.set_expr(Some("  ")).unwrap();
    assert!(param.expr().is_none());
}

#[test]
fn test_internal_round_trip_respects_bounds() {
    for bounds in [
        Bounds::unbounded(),
        Bounds::lower(1.0).unwrap(),
        Bounds::upper(5.0).unwrap(),
        Bounds::new(-2.0, 3.0).unwrap(),
    ] {
        let mut param = Parameter::new("p", 2.5)
            .with_bounds(bounds.min, bounds.max)
            .unwrap();
        let internal = param.to_internal();
        param.set_internal(internal);
        assert!((param.value() - 2.5).abs() < 1e-9, "{:?}", bounds);

        // any internal value maps inside the bounds
        for internal in [-1e3, -1.0, 0.0, 1.0, 1e3] {
            param.set_internal(internal);
            assert!(bounds.contains(param.value()));
        }
    }
}

#[test]
fn test_display() {
    let param = Parameter::new("c", 1.5).fixed();
    assert_eq!(param.to_string(), "<Parameter 'c', value=1.5 (fixed), bounds=[-inf:inf]>");

    let param = Parameter::new("fwhm", 0.0).with_expr("2*sigma").unwrap();
    assert!(param.to_string().contains("expr='2*sigma'"));
}
