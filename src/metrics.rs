//! Prometheus metrics for the RAG workflow.
//!
//! Exposes:
//! - `acolyte_rag_stage_duration_seconds` (histogram per workflow stage)
//! - `acolyte_rag_stage_total` (counter with status)
//! - `acolyte_rag_stage_inflight` (gauge)
//! - `acolyte_rag_model_calls_total` (counter per call kind)
//! - `acolyte_rag_command_duration_seconds` / `acolyte_rag_command_total` (CLI subcommands)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter_vec, register_int_gauge_vec,
    Encoder, HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Exponential buckets from 50ms up to ~3 minutes.
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "acolyte_rag_stage_duration_seconds",
        "Workflow stage duration in seconds",
        &["stage"],
        buckets
    )
    .expect("failed to register stage duration histogram")
});

static STAGE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "acolyte_rag_stage_total",
        "Total workflow stage executions by status",
        &["stage", "status"]
    )
    .expect("failed to register stage counter")
});

static STAGE_INFLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "acolyte_rag_stage_inflight",
        "Number of in-flight workflow stages",
        &["stage"]
    )
    .expect("failed to register inflight gauge")
});

static MODEL_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "acolyte_rag_model_calls_total",
        "Calls issued to chat and embedding providers",
        &["kind"]
    )
    .expect("failed to register model call counter")
});

static COMMAND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "acolyte_rag_command_duration_seconds",
        "CLI command duration in seconds",
        &["command"],
        buckets
    )
    .expect("failed to register command duration histogram")
});

static COMMAND_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "acolyte_rag_command_total",
        "Total CLI command executions by status",
        &["command", "status"]
    )
    .expect("failed to register command counter")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&STAGE_DURATION);
    Lazy::force(&STAGE_TOTAL);
    Lazy::force(&STAGE_INFLIGHT);
    Lazy::force(&MODEL_CALLS);
    Lazy::force(&COMMAND_DURATION);
    Lazy::force(&COMMAND_TOTAL);
}

/// Increment inflight gauge for a stage.
pub fn record_stage_start(stage: &'static str) {
    init_collectors();
    STAGE_INFLIGHT.with_label_values(&[stage]).inc();
}

/// Record stage completion with duration and status.
pub fn record_stage_result(stage: &'static str, duration: Duration, success: bool) {
    init_collectors();
    STAGE_INFLIGHT.with_label_values(&[stage]).dec();
    STAGE_DURATION
        .with_label_values(&[stage])
        .observe(duration.as_secs_f64());
    STAGE_TOTAL
        .with_label_values(&[stage, if success { "ok" } else { "error" }])
        .inc();
}

/// Run `fut` as workflow stage `stage`, recording inflight, duration and status.
pub async fn observe_stage<T, E, F>(stage: &'static str, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    record_stage_start(stage);
    let start = Instant::now();
    let result = fut.await;
    record_stage_result(stage, start.elapsed(), result.is_ok());
    result
}

/// Record one CLI command run.
pub fn record_command_result(command: &'static str, duration: Duration, success: bool) {
    init_collectors();
    COMMAND_DURATION
        .with_label_values(&[command])
        .observe(duration.as_secs_f64());
    COMMAND_TOTAL
        .with_label_values(&[command, if success { "ok" } else { "error" }])
        .inc();
}

/// Count one provider call (`chat` or `embedding`).
pub fn record_model_call(kind: &'static str) {
    init_collectors();
    MODEL_CALLS.with_label_values(&[kind]).inc();
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        let mut response = Response::new(Full::from("encode error"));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        return Ok(response);
    }

    let mut response = Response::new(Full::from(buffer));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(prometheus::TEXT_FORMAT));
    Ok(response)
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => {
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::NOT_FOUND;
            Ok(response)
        }
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}
