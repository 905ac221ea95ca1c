//! Integration tests for the Parameters collection

use modelfit::parameters::{Parameter, ParameterError, Parameters};

fn peak_params() -> Parameters {
    let mut params = Parameters::new();
    params.add("amplitude", 10.0).unwrap();
    params.add("center", 5.0).unwrap().set_bounds(0.0, 10.0).unwrap();
    params.add("sigma", 1.0).unwrap().set_min(0.0).unwrap();
    params
        .add("fwhm", 0.0)
        .unwrap()
        .set_expr(Some("2.3548200*sigma"))
        .unwrap();
    params.add("offset", 0.1).unwrap().set_vary(false);
    params.update_constraints().unwrap();
    params
}

#[test]
fn test_insertion_order_and_lookup() {
    let params = peak_params();
    assert_eq!(params.len(), 5);
    assert_eq!(
        params.names(),
        vec!["amplitude", "center", "sigma", "fwhm", "offset"]
    );
    assert!(params.contains("sigma"));
    assert!(!params.contains("gamma"));
    assert_eq!(params.value("center").unwrap(), 5.0);
    assert!(matches!(
        params.value("gamma"),
        Err(ParameterError::NotFound { .. })
    ));

    let names = params.iter().map(Parameter::name).collect::<Vec<_>>();
    let names_by_ref = (&params).into_iter().map(Parameter::name).collect::<Vec<_>>();
    assert_eq!(names, names_by_ref);
}

#[test]
fn test_add_validates_and_replaces() {
    let mut params = peak_params();
    for bad in ["1x", "with space", "", "pi", "a-b"] {
        assert!(
            matches!(params.add(bad, 0.0), Err(ParameterError::InvalidName { .. })),
            "'{bad}' should be rejected"
        );
    }

    // re-adding keeps the position and resets the parameter
    params.add("center", 1.0).unwrap();
    assert_eq!(params.names()[1], "center");
    assert_eq!(params.get("center").unwrap().max(), f64::INFINITY);
    assert_eq!(params.len(), 5);
}

#[test]
fn test_remove_reindexes() {
    let mut params = peak_params();
    let removed = params.remove("center").unwrap();
    assert_eq!(removed.value(), 5.0);
    assert!(params.remove("center").is_none());
    assert_eq!(params.names(), vec!["amplitude", "sigma", "fwhm", "offset"]);
    assert_eq!(params.value("offset").unwrap(), 0.1);
    params.set_value("offset", 0.2).unwrap();
    assert_eq!(params.get("offset").unwrap().value(), 0.2);
}

#[test]
fn test_varying_names_and_internal_values() {
    let mut params = peak_params();
    assert_eq!(params.varying_names(), vec!["amplitude", "center", "sigma"]);

    let internal = params.internal_values();
    assert_eq!(internal.len(), 3);

    let err = params.set_internal_values(&[1.0]).unwrap_err();
    assert_eq!(err, ParameterError::LengthMismatch { expected: 3, got: 1 });

    // moving sigma in internal space re-resolves fwhm
    let mut moved = internal.clone();
    moved[2] = 3.0;
    params.set_internal_values(&moved).unwrap();
    let sigma = params.value("sigma").unwrap();
    assert!(sigma > 1.0);
    assert!((params.value("fwhm").unwrap() - 2.35482 * sigma).abs() < 1e-12);

    params.set_internal_values(&internal).unwrap();
    assert!((params.value("sigma").unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn test_extend_from_keeps_existing() {
    let mut params = Parameters::new();
    params.add("amplitude", 99.0).unwrap();
    params.extend_from(&peak_params());
    assert_eq!(params.len(), 5);
    assert_eq!(params.value("amplitude").unwrap(), 99.0);
    assert_eq!(params.names()[0], "amplitude");
}

#[test]
fn test_add_many_and_eval() {
    let mut params = Parameters::new();
    params
        .add_many(vec![
            Parameter::new("a", 2.0),
            Parameter::new("b", 3.0).fixed(),
            Parameter::new("c", 0.0).with_expr("a * b").unwrap(),
        ])
        .unwrap();
    params.update_constraints().unwrap();
    assert_eq!(params.value("c").unwrap(), 6.0);
    assert_eq!(params.eval("a + b + c").unwrap(), 11.0);
    assert!(params.eval("a + d").is_err());
}

#[test]
fn test_json_round_trip_recompiles_expressions() {
    let params = peak_params();
    let json = params.to_json().unwrap();
    assert!(json.contains("2.3548200*sigma"));

    let mut loaded = Parameters::from_json(&json).unwrap();
    assert_eq!(loaded.names(), params.names());
    assert_eq!(loaded.get("center").unwrap().min(), 0.0);
    assert_eq!(loaded.get("amplitude").unwrap().max(), f64::INFINITY);
    assert!(!loaded.get("offset").unwrap().vary());

    loaded.set_value("sigma", 2.0).unwrap();
    loaded.update_constraints().unwrap();
    assert!((loaded.value("fwhm").unwrap() - 4.70964).abs() < 1e-9);
}

#[test]
fn test_save_and_load_json() {
    let path = std::env::temp_dir().join(format!("modelfit-params-{}.json", std::process::id()));
    let params = peak_params();
    params.save_json(&path).unwrap();
    let loaded = Parameters::load_json(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded.names(), params.names());
    assert_eq!(loaded.get("fwhm").unwrap().expr(), Some("2.3548200*sigma"));
}
