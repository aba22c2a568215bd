//! Observability wiring for the hubuum service.
//!
//! # Purpose
//! Initializes tracing, OpenTelemetry propagation and the Prometheus recorder,
//! and owns the names of the metrics the service publishes:
//! - `hubuum_authz_decisions_total{outcome,policy}`
//! - `hubuum_namespaces_total`
//! - `hubuum_grants_total`
//!
//! # Notes
//! Initialization is guarded by `OnceLock` so repeated calls in tests are no-ops.
use hubuum_authz::{AccessPolicy, Decision};
use metrics_exporter_prometheus::PrometheusBuilder;
use metrics_exporter_prometheus::PrometheusHandle;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static OBS_INIT: OnceLock<()> = OnceLock::new();
static PROPAGATOR_INIT: OnceLock<()> = OnceLock::new();

pub fn init_observability(service_name: &str) -> PrometheusHandle {
    OBS_INIT.get_or_init(|| {
        global::set_text_map_propagator(
            opentelemetry_sdk::propagation::TraceContextPropagator::new(),
        );

        let provider = build_tracer_provider(service_name);
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer();
        let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);
        if let Some(provider) = provider {
            let tracer = provider.tracer(service_name.to_string());
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            let _ = registry.with(otel_layer).try_init();
        } else {
            let _ = registry.try_init();
        }
    });

    let handle = install_metrics_recorder();
    describe_metrics();
    handle
}

fn describe_metrics() {
    metrics::describe_counter!(
        "hubuum_authz_decisions_total",
        "Authorization decisions by outcome and access policy"
    );
    metrics::describe_gauge!("hubuum_namespaces_total", "Namespaces currently stored");
    metrics::describe_gauge!("hubuum_grants_total", "Permission grants currently stored");
}

/// Count one authorization decision.
pub fn record_decision(policy: AccessPolicy, decision: &Decision) {
    metrics::counter!(
        "hubuum_authz_decisions_total",
        "outcome" => decision.outcome(),
        "policy" => policy.as_str(),
    )
    .increment(1);
}

fn build_tracer_provider(
    service_name: &str,
) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let resource = Resource::builder_empty()
        .with_attributes(resource_attributes(service_name))
        .build();
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
        .ok()?;
    Some(
        opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build(),
    )
}

fn resource_attributes(service_name: &str) -> Vec<KeyValue> {
    let mut attrs = vec![KeyValue::new("service.name", service_name.to_string())];
    if let Ok(value) =
        std::env::var("HUBUUM_SERVICE_INSTANCE_ID").or_else(|_| std::env::var("HOSTNAME"))
    {
        attrs.push(KeyValue::new("service.instance.id", value));
    }
    attrs
}

pub fn trace_context_from_headers(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    PROPAGATOR_INIT.get_or_init(|| {
        global::set_text_map_propagator(
            opentelemetry_sdk::propagation::TraceContextPropagator::new(),
        );
    });
    global::get_text_map_propagator(|prop| prop.extract(&HeaderMapExtractor(headers)))
}

struct HeaderMapExtractor<'a>(&'a axum::http::HeaderMap);

impl<'a> Extractor for HeaderMapExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

pub async fn serve_metrics(handle: PrometheusHandle, addr: SocketAddr) -> std::io::Result<()> {
    serve_metrics_with_shutdown(handle, addr, std::future::pending()).await
}

async fn serve_metrics_with_shutdown<F>(
    handle: PrometheusHandle,
    addr: SocketAddr,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_metrics_with_listener(handle, listener, shutdown).await
}

async fn serve_metrics_with_listener<F>(
    handle: PrometheusHandle,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    );
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

fn install_metrics_recorder() -> PrometheusHandle {
    if let Some(handle) = METRICS_HANDLE.get() {
        return handle.clone();
    }
    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(err) => {
            // Another recorder owns the global slot; render from a detached one.
            tracing::warn!(error = %err, "metrics recorder already installed");
            PrometheusBuilder::new().build_recorder().handle()
        }
    };
    METRICS_HANDLE.get_or_init(|| handle).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubuum_authz::DenyReason;
    use serial_test::serial;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn decisions_show_up_in_rendered_metrics() {
        let handle = init_observability("hubuum-decision-test");
        record_decision(AccessPolicy::NamespaceScoped, &Decision::Allow);
        record_decision(
            AccessPolicy::AdminOrReadOnly,
            &Decision::Deny(DenyReason::AdminRequired),
        );
        let rendered = handle.render();
        assert!(rendered.contains("hubuum_authz_decisions_total"));
        assert!(rendered.contains("policy=\"namespace_scoped\""));
        assert!(rendered.contains("policy=\"admin_or_read_only\""));
        assert!(rendered.contains("outcome=\"deny\""));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn metrics_endpoint_serves_decision_counts() {
        let handle = init_observability("hubuum-metrics-test");
        record_decision(AccessPolicy::NamespaceScoped, &Decision::Allow);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_metrics_with_listener(handle, listener, async move {
            let _ = shutdown_rx.await;
        }));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .no_proxy()
            .build()
            .expect("client");
        let body = client
            .get(format!("http://{addr}/metrics"))
            .send()
            .await
            .expect("GET /metrics")
            .error_for_status()
            .expect("metrics status")
            .text()
            .await
            .expect("body");
        assert!(body.contains("hubuum_authz_decisions_total"));

        let _ = shutdown_tx.send(());
        let _ = tokio::time::timeout(Duration::from_secs(1), server)
            .await
            .expect("server shutdown");
    }
}
