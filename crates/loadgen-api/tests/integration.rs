use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use loadgen_api::{stand_in_app, StandInState};
use loadgen_client::http::HttpServingClient;
use loadgen_client::ServingClient;
use loadgen_common::config::{RunOptions, TargetConfig};
use loadgen_core::harness;
use loadgen_core::iteration::Iteration;
use loadgen_core::payload::InvocationPayload;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap(); });
    format!("http://{}:{}", addr.ip(), addr.port())
}

#[tokio::test]
async fn stand_in_scores_valid_payload_and_rejects_malformed() {
    let base = serve(stand_in_app(StandInState::new(None))).await;
    let client = reqwest::Client::new();
    let url = format!("{}/serving-endpoints/energy/invocations", base);

    let r = client.post(&url).body(InvocationPayload::fixed().to_json().unwrap()).send().await.unwrap();
    assert_eq!(r.status().as_u16(), 200);
    let body: serde_json::Value = serde_json::from_str(&r.text().await.unwrap()).unwrap();
    assert_eq!(body["predictions"].as_array().map(|a| a.len()), Some(1));

    let r = client.post(&url).body(InvocationPayload::missing_radius().to_json().unwrap()).send().await.unwrap();
    assert_eq!(r.status().as_u16(), 400);

    let r = client.post(&url).body("not json").send().await.unwrap();
    assert_eq!(r.status().as_u16(), 400);

    let r = client.get(format!("{}/healthz", base)).send().await.unwrap();
    assert!(r.status().is_success());

    let r = client.get(format!("{}/metrics", base)).send().await.unwrap();
    assert!(r.status().is_success());
    let text = r.text().await.unwrap();
    assert!(text.contains("standin_invocations_total"));
}

#[tokio::test]
async fn stand_in_enforces_configured_token() {
    let base = serve(stand_in_app(StandInState::new(Some("s3cret".into())))).await;
    let client = reqwest::Client::new();
    let url = format!("{}/serving-endpoints/energy/invocations", base);
    let body = InvocationPayload::fixed().to_json().unwrap();

    let r = client.post(&url).body(body.clone()).send().await.unwrap();
    assert_eq!(r.status().as_u16(), 401);

    let r = client.post(&url).header("authorization", "Bearer s3cret").body(body).send().await.unwrap();
    assert_eq!(r.status().as_u16(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn load_run_against_stand_in() {
    let base = serve(stand_in_app(StandInState::new(Some("tok".into())))).await;
    let opts = RunOptions { vus: 2, duration: Duration::from_millis(400), pause_ms: 100, timeout_ms: Some(2000) };

    let good = Arc::new(Iteration::new(&TargetConfig::new(base.as_str(), "energy", "tok"), opts.pause()).unwrap());
    let client: Arc<dyn ServingClient> = Arc::new(HttpServingClient::new(opts.timeout()).unwrap());
    let summary = harness::run(&opts, good, client.clone()).await.unwrap();
    assert!(summary.iterations >= 2);
    assert_eq!(summary.checks.fails, 0);

    let wrong_token = Arc::new(Iteration::new(&TargetConfig::new(base.as_str(), "energy", ""), opts.pause()).unwrap());
    let summary = harness::run(&opts, wrong_token, client).await.unwrap();
    assert_eq!(summary.checks.passes, 0);
    assert_eq!(summary.statuses.get("401").copied(), Some(summary.iterations));
}
