//! Request-ID and request logging middleware shared by both services
//!
//! Both wrappers call the inner service exactly once and only observe or
//! decorate the request/response.

use std::{
    fmt,
    net::SocketAddr,
    sync::{
        LazyLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use axum::{
    extract::{ConnectInfo, Request},
    http::header::HOST,
    middleware::Next,
    response::Response,
};
use rand::{RngExt, distr::Alphanumeric};

/// Header carrying the correlation identifier between services
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// `<host>/<random>` computed once per process
static PREFIX: LazyLock<String> = LazyLock::new(|| format!("{}/{}", hostname(), random_tag()));

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

fn random_tag() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(10)
        .map(char::from)
        .collect()
}

/// Correlation identifier attached to every request; only ever logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Mint a new identifier: `<host>/<random-10>-<sequence>`
    #[must_use]
    pub fn generate() -> Self {
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1;
        Self(format!("{}-{sequence:06}", *PREFIX))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Honor an inbound `X-Request-Id`, otherwise mint one, and store it in the
/// request extensions.
pub async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(|value| RequestId(value.to_string()))
        .unwrap_or_else(RequestId::generate);

    request.extensions_mut().insert(request_id);
    next.run(request).await
}

/// One access-log line per request, written after the inner handler returns.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "-".to_string(), |info| info.0.to_string());
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| format!("[{id}] "))
        .unwrap_or_default();

    let response = next.run(request).await;

    tracing::info!(
        "{request_id}\"{method} http://{host}{uri} {version:?}\" from {peer} - {} in {:?}",
        response.status().as_u16(),
        start.elapsed()
    );

    response
}
