use std::collections::HashMap;
use std::time::Duration;

use loadgen_common::config::{RunOptions, TargetConfig};
use loadgen_common::LoadgenError;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn url_is_literal_concatenation() {
    let target = TargetConfig::new("https://example.com", "my-model", "t");
    assert_eq!(target.invocations_url(), "https://example.com/serving-endpoints/my-model/invocations");

    let odd = TargetConfig::new("https://example.com/", "a b", "t");
    assert_eq!(odd.invocations_url(), "https://example.com//serving-endpoints/a b/invocations");
    assert_eq!(odd.normalized_invocations_url(), "https://example.com/serving-endpoints/a b/invocations");
}

#[test]
fn missing_env_becomes_empty_values() {
    let target = TargetConfig::from_lookup(lookup(&[("DATABRICKS_HOST", "http://h")]));
    assert_eq!(target.endpoint, "");
    assert_eq!(target.token, "");
    assert_eq!(target.authorization(), "Bearer ");
    assert_eq!(target.invocations_url(), "http://h/serving-endpoints//invocations");
}

#[test]
fn strict_accessors_report_missing_values() {
    let target = TargetConfig::new("  ", "m", "");
    assert!(matches!(target.require_host(), Err(LoadgenError::MissingEnv("DATABRICKS_HOST"))));
    let err = target.require_token().unwrap_err();
    assert_eq!(err.to_string(), "Missing DATABRICKS_TOKEN");
}

#[test]
fn run_options_defaults_and_env_overrides() {
    let defaults = RunOptions::load_from(lookup(&[])).unwrap();
    assert_eq!(defaults.vus, 20);
    assert_eq!(defaults.duration, Duration::from_secs(180));
    assert_eq!(defaults.pause(), Duration::from_millis(100));
    assert_eq!(defaults.timeout(), None);

    let opts = RunOptions::load_from(lookup(&[
        ("LOADGEN_VUS", "4"),
        ("LOADGEN_DURATION", "30s"),
        ("LOADGEN_TIMEOUT_MS", "750"),
        ("LOADGEN_PAUSE_MS", "not-a-number"),
    ]))
    .unwrap();
    assert_eq!(opts.vus, 4);
    assert_eq!(opts.duration, Duration::from_secs(30));
    assert_eq!(opts.timeout(), Some(Duration::from_millis(750)));
    assert_eq!(opts.pause_ms, 100);
}

#[test]
fn run_options_from_yaml() {
    let opts = RunOptions::from_yaml("vus: 3\nduration: 2m\n").unwrap();
    assert_eq!(opts.vus, 3);
    assert_eq!(opts.duration, Duration::from_secs(120));
    assert_eq!(opts.pause_ms, 100);

    assert!(RunOptions::from_yaml("vus: [").is_err());
}

#[test]
fn zero_vus_is_rejected() {
    let opts = RunOptions { vus: 0, ..RunOptions::default() };
    assert!(opts.validate().is_err());
    assert!(RunOptions::default().validate().is_ok());
}
