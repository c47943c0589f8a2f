use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use loadgen_api::{metrics_router, stand_in_app, StandInState};
use loadgen_client::http::HttpServingClient;
use loadgen_client::{InvocationRequest, ServingClient};
use loadgen_common::config::{parse_duration, RunOptions, TargetConfig};
use loadgen_core::bench::{self, BenchMode, BenchOptions};
use loadgen_core::harness;
use loadgen_core::iteration::Iteration;
use loadgen_core::payload::InvocationPayload;
use loadgen_core::probe::{self, SloThresholds};
use loadgen_core::warmup::{self, WarmupOptions};
use opentelemetry_otlp::WithExportConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "loadgen", version, about = "Load generator for model-serving endpoints")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Virtual users posting the fixed payload until the duration elapses
    Run(RunArgs),
    /// Single worker paced to a request rate, optionally injecting bad payloads
    Bench(BenchArgs),
    /// Sequential SLO probe with randomized samples
    Probe(ProbeArgs),
    /// Retry until the endpoint answers 2xx
    Warmup(WarmupArgs),
    /// Print the invocations URL for an endpoint
    Url(UrlArgs),
    /// Local stand-in for a serving endpoint
    MockServe(MockServeArgs),
    Version,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long)]
    vus: Option<usize>,
    /// e.g. 30s, 3m
    #[arg(long, value_parser = parse_duration)]
    duration: Option<Duration>,
    #[arg(long)]
    pause_ms: Option<u64>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Serve /metrics while the run is in progress
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct BenchArgs {
    #[arg(long)]
    url: String,
    /// Seconds
    #[arg(long)]
    duration: u64,
    #[arg(long)]
    rps: f64,
    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: f64,
    #[arg(long, default_value = "normal")]
    mode: BenchMode,
    #[arg(long)]
    assert_recovery: bool,
}

#[derive(Args, Debug)]
struct ProbeArgs {
    /// Defaults to ENDPOINT_NAME
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long, default_value_t = 50)]
    samples: usize,
    #[arg(long, default_value_t = 2)]
    timeout_sec: u64,
    #[arg(long, default_value_t = 1500.0)]
    p95_threshold_ms: f64,
    #[arg(long, default_value_t = 5.0)]
    error_rate_threshold_pct: f64,
}

#[derive(Args, Debug)]
struct WarmupArgs {
    /// Defaults to the invocations URL built from the environment
    #[arg(long)]
    url: Option<String>,
    #[arg(long, default_value_t = 8)]
    tries: u32,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60.0)]
    timeout: f64,
}

#[derive(Args, Debug)]
struct UrlArgs {
    /// Defaults to ENDPOINT_NAME
    endpoint: Option<String>,
}

#[derive(Args, Debug)]
struct MockServeArgs {
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,
    /// Require this bearer token
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_load(args).await,
        Commands::Bench(args) => run_bench(args).await,
        Commands::Probe(args) => run_probe(args).await,
        Commands::Warmup(args) => run_warmup(args).await,
        Commands::Url(args) => print_url(args),
        Commands::MockServe(args) => mock_serve(args).await,
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_load(args: RunArgs) -> anyhow::Result<()> {
    let mut opts = RunOptions::load()?;
    if let Some(v) = args.vus { opts.vus = v; }
    if let Some(v) = args.duration { opts.duration = v; }
    if let Some(v) = args.pause_ms { opts.pause_ms = v; }
    if let Some(v) = args.timeout_ms { opts.timeout_ms = Some(v); }

    if let Some(addr) = args.metrics_addr {
        let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {}", addr))?;
        tracing::info!("metrics on http://{}/metrics", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, metrics_router()).await {
                tracing::warn!("metrics server stopped: {}", e);
            }
        });
    }

    let target = TargetConfig::from_env();
    let iteration = Arc::new(Iteration::new(&target, opts.pause())?);
    let client: Arc<dyn ServingClient> = Arc::new(HttpServingClient::new(opts.timeout())?);

    let summary = tokio::select! {
        res = harness::run(&opts, iteration, client) => res?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, abandoning run");
            return Ok(());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

async fn run_bench(args: BenchArgs) -> anyhow::Result<()> {
    let target = TargetConfig::from_env();
    let authorization = (!target.token.is_empty()).then(|| target.authorization());
    let client = HttpServingClient::new(Some(seconds(args.timeout)?))?;
    let opts = BenchOptions::new(Duration::from_secs(args.duration), args.rps, args.mode);
    let mut rng = StdRng::from_entropy();

    let summary = bench::run_bench(&client, &args.url, authorization, &opts, &mut rng).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if args.assert_recovery {
        bench::assert_recovery(&summary)?;
    }
    Ok(())
}

async fn run_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let mut target = TargetConfig::from_env();
    if let Some(endpoint) = args.endpoint { target.endpoint = endpoint; }
    let client = HttpServingClient::new(Some(Duration::from_secs(args.timeout_sec)))?;
    let mut rng = StdRng::from_entropy();

    let report = probe::run_probe(&client, &target, args.samples, &mut rng).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let thresholds = SloThresholds { p95_ms: args.p95_threshold_ms, error_rate_pct: args.error_rate_threshold_pct };
    thresholds.enforce(&report)?;
    Ok(())
}

async fn run_warmup(args: WarmupArgs) -> anyhow::Result<()> {
    let target = TargetConfig::from_env();
    target.require_token()?;
    let url = match args.url {
        Some(url) => url,
        None => {
            target.require_host()?;
            target.require_endpoint()?;
            target.normalized_invocations_url()
        }
    };
    let client = HttpServingClient::new(Some(seconds(args.timeout)?))?;
    let request = InvocationRequest::new(url, Some(target.authorization()), InvocationPayload::fixed().to_json()?);
    let opts = WarmupOptions { tries: args.tries, ..WarmupOptions::default() };

    warmup::warm_up(&client, &request, &opts).await?;
    Ok(())
}

fn seconds(value: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("invalid timeout {}", value))
}

fn print_url(args: UrlArgs) -> anyhow::Result<()> {
    let mut target = TargetConfig::from_env();
    if let Some(endpoint) = args.endpoint { target.endpoint = endpoint; }
    target.require_endpoint()?;
    println!("{}", target.normalized_invocations_url());
    Ok(())
}

async fn mock_serve(args: MockServeArgs) -> anyhow::Result<()> {
    let app = stand_in_app(StandInState::new(args.token));
    let listener = tokio::net::TcpListener::bind(args.bind).await.with_context(|| format!("binding {}", args.bind))?;
    tracing::info!("stand-in endpoint listening on http://{}", args.bind);
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    };
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
            .install_simple()
            .ok();
        if let Some(tracer) = tracer {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .with(OpenTelemetryLayer::new(tracer))
                .init();
            return;
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
