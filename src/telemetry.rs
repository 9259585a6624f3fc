//! Tracing and OpenTelemetry wiring
//!
//! Installs the global `tracing` subscriber: env filter, fmt output and a
//! `tracing-opentelemetry` bridge. The bridge is always on; an OTLP span
//! exporter is attached only when a collector endpoint is configured. Also
//! provides the header carriers used to move W3C trace context across HTTP
//! hops.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::{
    Context, KeyValue, global,
    propagation::{Extractor, Injector, TextMapPropagator},
    trace::TracerProvider as _,
};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    trace::{SdkTracer, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::resource::SERVICE_VERSION;
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
};

use crate::error::ServiceError;

/// Read-only view of inbound headers for context extraction
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

/// Mutable view of outbound headers for context injection
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        let Ok(name) = HeaderName::from_bytes(key.as_bytes()) else {
            return;
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            self.0.insert(name, value);
        }
    }
}

/// Pull the remote parent context out of inbound headers using the global propagator
#[must_use]
pub fn extract_context(headers: &HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

/// Write `cx` into outbound headers using the global propagator
pub fn inject_context(cx: &Context, headers: &mut HeaderMap) {
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(cx, &mut HeaderInjector(headers));
    });
}

/// Keeps the tracer provider alive; flush it with [`TelemetryGuard::shutdown`].
#[derive(Debug)]
pub struct TelemetryGuard {
    provider: SdkTracerProvider,
    exporting: bool,
}

impl TelemetryGuard {
    /// Whether spans are being exported to a collector
    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    /// Flush pending spans and release the exporter.
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        let provider = self.provider;

        // the batch processor joins its worker thread
        tokio::task::spawn_blocking(move || provider.shutdown())
            .await
            .map_err(|e| ServiceError::telemetry(format!("shutdown task failed: {e}")))?
            .map_err(|e| ServiceError::telemetry(format!("failed to flush spans: {e}")))
    }

    /// Flush, then hand back `result` unchanged. A failed flush is logged
    /// and never replaces the service's own outcome.
    pub async fn flush_after<T>(self, result: crate::Result<T>) -> crate::Result<T> {
        if let Err(e) = self.shutdown().await {
            tracing::error!("Failed to shut telemetry down: {}", e);
        }
        result
    }
}

/// Register the W3C trace-context propagator used by [`extract_context`] and
/// [`inject_context`].
pub fn install_propagator() {
    global::set_text_map_propagator(TraceContextPropagator::new());
}

/// Tracer provider for `service_name`. Spans always get real trace and span
/// IDs so they can be propagated; they are only shipped anywhere when
/// `exporter_url` is set.
pub fn tracer_provider(
    service_name: &'static str,
    exporter_url: Option<&str>,
) -> Result<SdkTracerProvider, ServiceError> {
    let builder = SdkTracerProvider::builder().with_resource(resource(service_name));

    let Some(url) = exporter_url else {
        return Ok(builder.build());
    };

    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(url)
        .build()
        .map_err(|e| ServiceError::telemetry(format!("failed to build OTLP exporter: {e}")))?;

    Ok(builder.with_batch_exporter(exporter).build())
}

/// `tracing` layer bridging spans into `provider`
pub fn otel_layer<S>(
    provider: &SdkTracerProvider,
    service_name: &'static str,
) -> OpenTelemetryLayer<S, SdkTracer>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name))
}

/// Install the global subscriber and propagator for `service_name`.
///
/// `exporter_url` is the full OTLP/HTTP traces endpoint
/// (e.g. `http://otel-collector:4318/v1/traces`). Without it, spans are still
/// bridged to OpenTelemetry so trace context crosses service hops, but
/// nothing is exported.
pub fn init(
    service_name: &'static str,
    exporter_url: Option<&str>,
) -> Result<TelemetryGuard, ServiceError> {
    install_propagator();

    let provider = tracer_provider(service_name, exporter_url)?;
    global::set_tracer_provider(provider.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(otel_layer(&provider, service_name))
        .try_init()
        .map_err(|e| ServiceError::telemetry(e.to_string()))?;

    if let Some(url) = exporter_url {
        tracing::info!(service = service_name, endpoint = url, "Exporting spans over OTLP");
    }

    Ok(TelemetryGuard {
        provider,
        exporting: exporter_url.is_some(),
    })
}

fn resource(service_name: &'static str) -> Resource {
    Resource::builder()
        .with_service_name(service_name)
        .with_attribute(KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")))
        .build()
}
