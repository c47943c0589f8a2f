use loadgen_core::payload::{InvocationPayload, Sample, FEATURE_COLUMNS};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn fixed_payload_has_expected_wire_shape() {
    let bytes = InvocationPayload::fixed().to_json().unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert_eq!(
        text,
        r#"{"dataframe_split":{"columns":["pressure","flow","radius"],"data":[[120.0,4.2,0.35]]}}"#
    );

    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["dataframe_split"]["columns"], serde_json::json!(["pressure", "flow", "radius"]));
    assert_eq!(parsed["dataframe_split"]["data"], serde_json::json!([[120.0, 4.2, 0.35]]));
}

#[test]
fn fixed_payload_is_identical_every_time() {
    let a = InvocationPayload::fixed().to_json().unwrap();
    let b = InvocationPayload::fixed().to_json().unwrap();
    assert_eq!(a, b);
}

#[test]
fn malformed_payload_drops_radius() {
    let bad = InvocationPayload::missing_radius();
    assert_eq!(bad.dataframe_split.columns, vec!["pressure", "flow"]);
    assert_eq!(bad.dataframe_split.data, vec![vec![120.0, 4.2]]);
    assert!(!bad.matches_features());
    assert!(InvocationPayload::fixed().matches_features());
}

#[test]
fn random_samples_stay_in_range() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let s = Sample::random(&mut rng);
        assert!((80.0..140.0).contains(&s.pressure));
        assert!((2.0..6.0).contains(&s.flow));
        assert!((0.2..0.45).contains(&s.radius));
        let payload = InvocationPayload::from_sample(&s);
        assert_eq!(payload.dataframe_split.columns.len(), FEATURE_COLUMNS.len());
        assert_eq!(payload.dataframe_split.data[0], s.row());
    }
}
