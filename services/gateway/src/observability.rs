//! Logging, tracing and metrics for the gateway.
//!
//! # Purpose
//! Sets up the `tracing` subscriber (fmt output filtered by `RUST_LOG`), an
//! OTLP span pipeline when an exporter can be built, W3C `traceparent`
//! extraction for incoming requests, and the Prometheus listener that serves
//! the `cdf_*` metrics.
//!
//! # Key invariants
//! - Every initializer is guarded by a `OnceLock`; calling them again is a
//!   no-op, which lets tests and `main` share them.
//! - A failure to build the OTLP exporter only disables span export.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "info";

static SUBSCRIBER: OnceLock<()> = OnceLock::new();
static PROPAGATOR: OnceLock<()> = OnceLock::new();
static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the subscriber, propagator and metrics recorder, returning the
/// handle the metrics listener renders from.
pub fn init_observability(service_name: &str) -> PrometheusHandle {
    install_propagator();
    SUBSCRIBER.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let base = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer());
        let installed = match span_exporter(service_name) {
            Some(provider) => {
                let tracer = provider.tracer(service_name.to_string());
                global::set_tracer_provider(provider);
                base.with(tracing_opentelemetry::layer().with_tracer(tracer))
                    .try_init()
            }
            None => base.try_init(),
        };
        if installed.is_err() {
            tracing::debug!("tracing subscriber already set");
        }
    });
    let handle = install_metrics_recorder();
    describe_metrics();
    handle
}

fn install_propagator() {
    PROPAGATOR.get_or_init(|| {
        global::set_text_map_propagator(TraceContextPropagator::new());
    });
}

fn span_exporter(service_name: &str) -> Option<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
        .ok()?;
    let resource = Resource::builder_empty()
        .with_attributes(resource_attributes(service_name))
        .build();
    Some(
        SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build(),
    )
}

/// `service.name` plus the instance and environment, when known.
///
/// The instance id prefers `CDF_SERVICE_INSTANCE_ID` and falls back to
/// `HOSTNAME`.
fn resource_attributes(service_name: &str) -> Vec<KeyValue> {
    let instance = std::env::var("CDF_SERVICE_INSTANCE_ID")
        .or_else(|_| std::env::var("HOSTNAME"))
        .ok();
    let environment = std::env::var("DEPLOYMENT_ENVIRONMENT").ok();
    std::iter::once(KeyValue::new("service.name", service_name.to_string()))
        .chain(instance.map(|id| KeyValue::new("service.instance.id", id)))
        .chain(environment.map(|env| KeyValue::new("deployment.environment", env)))
        .collect()
}

/// Parent context carried by the request's `traceparent`/`tracestate`
/// headers. Returns an empty context when they are absent or malformed.
pub fn trace_context_from_headers(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    install_propagator();
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderCarrier(headers)))
}

struct HeaderCarrier<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderCarrier<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.to_str().ok()
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(axum::http::HeaderName::as_str).collect()
    }
}

fn install_metrics_recorder() -> PrometheusHandle {
    RECORDER
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .unwrap_or_else(|err| {
                    // Another recorder owns the global slot; render from a
                    // detached one so the listener still answers.
                    tracing::warn!(error = %err, "prometheus recorder not installed");
                    PrometheusBuilder::new().build_recorder().handle()
                })
        })
        .clone()
}

fn describe_metrics() {
    metrics::describe_counter!(
        "cdf_access_denied_total",
        "Requests refused by a route or operation role check"
    );
    metrics::describe_counter!(
        "cdf_status_changes_total",
        "Status writes, labelled by entity"
    );
    metrics::describe_counter!(
        "cdf_tokens_blacklisted_total",
        "Bearer tokens revoked through logout"
    );
    metrics::describe_counter!(
        "cdf_notifications_created_total",
        "Notifications written to user inboxes"
    );
    metrics::describe_gauge!("cdf_projects_total", "Projects held by the in-memory store");
}

/// Serve `/metrics` on `addr` until the task is dropped.
pub async fn serve_metrics(handle: PrometheusHandle, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics listening");
    serve_metrics_with_listener(handle, listener, std::future::pending()).await
}

async fn serve_metrics_with_listener<F>(
    handle: PrometheusHandle,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let body = handle.render();
            async move { body }
        }),
    );
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}
