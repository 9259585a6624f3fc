//! Helpers for tests that need a real upstream on a socket, or that inspect
//! the spans a request produced

use axum::Router;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use tokio::net::TcpListener;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;

use crate::telemetry;

/// Serve `router` on an ephemeral localhost port; returns its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a localhost port that nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Spans bridged to OpenTelemetry on the current thread, kept in memory.
///
/// Only valid with a current-thread runtime (the `#[tokio::test]` default).
pub struct TraceCapture {
    _guard: DefaultGuard,
    _provider: SdkTracerProvider,
    exporter: InMemorySpanExporter,
}

impl TraceCapture {
    /// Finished spans called `name`, in the order they ended
    pub fn finished(&self, name: &str) -> Vec<SpanData> {
        self.exporter
            .get_finished_spans()
            .unwrap()
            .into_iter()
            .filter(|span| span.name == name)
            .collect()
    }
}

pub fn capture_traces() -> TraceCapture {
    telemetry::install_propagator();

    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    let subscriber =
        tracing_subscriber::registry().with(telemetry::otel_layer(&provider, "test"));

    TraceCapture {
        _guard: tracing::subscriber::set_default(subscriber),
        _provider: provider,
        exporter,
    }
}
