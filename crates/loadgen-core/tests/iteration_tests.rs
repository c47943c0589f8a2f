use std::time::{Duration, Instant};

use loadgen_client::mock::MockClient;
use loadgen_common::config::TargetConfig;
use loadgen_core::check::CheckRecorder;
use loadgen_core::iteration::Iteration;
use loadgen_core::payload::InvocationPayload;

fn target() -> TargetConfig {
    TargetConfig::new("https://example.com", "my-model", "tok")
}

#[test]
fn request_is_composed_from_target() {
    let it = Iteration::new(&target(), Duration::from_millis(100)).unwrap();
    let req = it.request();
    assert_eq!(req.url, "https://example.com/serving-endpoints/my-model/invocations");
    assert_eq!(req.authorization.as_deref(), Some("Bearer tok"));
    assert_eq!(req.body, InvocationPayload::fixed().to_json().unwrap());
}

#[test]
fn missing_token_keeps_bare_bearer_header() {
    let it = Iteration::new(&TargetConfig::new("http://h", "m", ""), Duration::ZERO).unwrap();
    assert_eq!(it.request().authorization.as_deref(), Some("Bearer "));
}

#[tokio::test]
async fn check_passes_only_on_200() {
    let it = Iteration::new(&target(), Duration::ZERO).unwrap();
    for (status, expected) in [(200, true), (201, false), (404, false), (500, false)] {
        let client = MockClient::new(status);
        let checks = CheckRecorder::default();
        let report = it.run_once(&client, &checks).await;
        assert_eq!(report.status, Some(status));
        assert_eq!(report.passed, expected, "status {}", status);
        assert_eq!(checks.passes(), u64::from(expected));
        assert_eq!(checks.fails(), u64::from(!expected));
    }
}

#[tokio::test]
async fn transport_error_is_a_failed_check() {
    let it = Iteration::new(&target(), Duration::ZERO).unwrap();
    let client = MockClient::failing();
    let checks = CheckRecorder::default();
    let report = it.run_once(&client, &checks).await;
    assert_eq!(report.status, None);
    assert!(!report.passed);
    assert_eq!(report.status_key(), "REQUEST_ERROR");
    assert_eq!(checks.fails(), 1);
}

#[tokio::test]
async fn pauses_after_the_check() {
    let it = Iteration::new(&target(), Duration::from_millis(100)).unwrap();
    let client = MockClient::new(200);
    let checks = CheckRecorder::default();

    let start = Instant::now();
    let report = it.run_once(&client, &checks).await;
    let elapsed = start.elapsed();

    assert!(report.passed);
    assert!(elapsed >= Duration::from_millis(100), "returned after {:?}", elapsed);
    assert!(report.latency < Duration::from_millis(100));
}

#[tokio::test]
async fn every_iteration_sends_the_same_request() {
    let it = Iteration::new(&target(), Duration::ZERO).unwrap();
    let client = MockClient::new(200);
    let checks = CheckRecorder::default();
    for _ in 0..3 {
        it.run_once(&client, &checks).await;
    }
    let seen = client.requests();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|r| r == it.request()));
}
