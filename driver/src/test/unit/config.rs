use std::collections::HashMap;

use tessel_codegen::{Feature, Target};
use tessel_device::BackendKind;
use test_case::test_case;

use crate::DriverConfig;
use crate::config::{DEFAULT_HEIGHT, DEFAULT_ITERATIONS, DEFAULT_WIDTH, parse_iterations};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| vars.get(key).cloned()
}

#[test_case(None, DEFAULT_ITERATIONS; "missing")]
#[test_case(Some("5"), 5; "numeric")]
#[test_case(Some(" 12 "), 12; "padded")]
#[test_case(Some("0"), 0; "zero")]
#[test_case(Some("many"), DEFAULT_ITERATIONS; "non_numeric")]
#[test_case(Some("-3"), DEFAULT_ITERATIONS; "negative")]
fn test_parse_iterations(arg: Option<&str>, expected: usize) {
    assert_eq!(parse_iterations(arg), expected);
}

#[test]
fn test_defaults() {
    let config = DriverConfig::default();

    assert_eq!(config.iterations, DEFAULT_ITERATIONS);
    assert_eq!((config.width, config.height), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
    assert_eq!(config.devices, 2);
    assert_eq!(config.backend, BackendKind::default());
    assert!(config.target.has_feature(Feature::Cuda));
    assert_eq!(config, DriverConfig::from_lookup(lookup(&[])));
}

#[test]
fn test_from_lookup() {
    let config = DriverConfig::from_lookup(lookup(&[
        ("TESSEL_BACKEND", "Virtual"),
        ("TESSEL_DEVICES", "3"),
        ("TESSEL_WIDTH", "64"),
        ("TESSEL_HEIGHT", "48"),
        ("TESSEL_TARGET", "host"),
    ]));

    assert_eq!(config.backend, BackendKind::Virtual);
    assert_eq!(config.devices, 3);
    assert_eq!((config.width, config.height), (64, 48));
    assert_eq!(config.target, Target::host());
}

#[test]
#[tracing_test::traced_test]
fn test_bad_counts_warn_and_fall_back() {
    let config = DriverConfig::from_lookup(lookup(&[
        ("TESSEL_WIDTH", "wide"),
        ("TESSEL_HEIGHT", "99999999999999999999999"),
        ("TESSEL_DEVICES", "-1"),
    ]));

    assert_eq!((config.width, config.height, config.devices), (DEFAULT_WIDTH, DEFAULT_HEIGHT, 2));
    assert!(logs_contain("TESSEL_WIDTH"));
    assert!(logs_contain("TESSEL_HEIGHT"));
    assert!(logs_contain("TESSEL_DEVICES"));
    assert!(logs_contain("setting is not a count"));
}

#[test]
fn test_from_lookup_ignores_bad_values() {
    let config = DriverConfig::from_lookup(lookup(&[
        ("TESSEL_BACKEND", "opencl"),
        ("TESSEL_WIDTH", "wide"),
        ("TESSEL_TARGET", "host-metal"),
    ]));

    assert_eq!(config.backend, BackendKind::default());
    assert_eq!(config.width, DEFAULT_WIDTH);
    assert!(config.target.has_feature(Feature::Cuda));
}

#[test]
fn test_builder_overrides() {
    let config = DriverConfig::builder().iterations(1).width(4).height(3).backend(BackendKind::Virtual).build();
    assert_eq!((config.iterations, config.width, config.height), (1, 4, 3));
    assert_eq!(config.backend, BackendKind::Virtual);
}
