//! HTTP server lifecycle shared by both services
//!
//! `Initializing → Serving → Draining → Stopped`. The supervisor serves a
//! router until the shutdown future resolves, then stops accepting
//! connections and gives in-flight requests a bounded window to finish.

use std::{fmt, future::Future, future::IntoFuture, net::SocketAddr, time::Duration};

use axum::{Router, http::StatusCode, middleware, routing::get};
use tokio::{net::TcpListener, sync::oneshot};
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::middleware::{assign_request_id, log_requests};

/// Largest request body the weather endpoints accept
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Liveness endpoint; no dependency checks
pub async fn ready() -> StatusCode {
    StatusCode::OK
}

/// Add `GET /ready` and the request-ID and logging wrappers. Request-ID runs
/// first so the access log can print it.
pub fn with_common_routes(router: Router) -> Router {
    router
        .route("/ready", get(ready))
        .layer(middleware::from_fn(log_requests))
        .layer(middleware::from_fn(assign_request_id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Serving,
    Draining,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Initializing => "initializing",
            Phase::Serving => "serving",
            Phase::Draining => "draining",
            Phase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// How the drain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every admitted request finished in time
    Drained,
    /// The drain window elapsed and remaining connections were dropped
    DrainTimedOut,
}

/// Runs one service's listener from bind to stop
#[derive(Debug, Clone)]
pub struct Supervisor {
    service: &'static str,
    drain_timeout: Duration,
}

impl Supervisor {
    /// Drain window used by both services unless configured otherwise
    pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(service: &'static str, drain_timeout: Duration) -> Self {
        Self {
            service,
            drain_timeout,
        }
    }

    fn transition(&self, phase: Phase) {
        info!(service = self.service, %phase, "Lifecycle transition");
    }

    /// Bind `0.0.0.0:port`.
    pub async fn bind(&self, port: u16) -> Result<TcpListener, ServiceError> {
        self.transition(Phase::Initializing);
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
        Ok(listener)
    }

    /// Serve `app` on `listener` until `shutdown` resolves, then drain.
    ///
    /// A drain that overruns the timeout is reported as
    /// [`ShutdownOutcome::DrainTimedOut`], not as an error.
    pub async fn run<F>(
        &self,
        listener: TcpListener,
        app: Router,
        shutdown: F,
    ) -> Result<ShutdownOutcome, ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let (draining_tx, draining_rx) = oneshot::channel::<()>();

        let signal = async move {
            shutdown.await;
            let _ = draining_tx.send(());
        };

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .into_future();
        tokio::pin!(server);

        self.transition(Phase::Serving);
        info!(service = self.service, "Listening on {}", addr);

        tokio::select! {
            result = &mut server => {
                // listener failed before any shutdown was requested
                result?;
                self.transition(Phase::Stopped);
                return Ok(ShutdownOutcome::Drained);
            }
            _ = draining_rx => {}
        }

        self.transition(Phase::Draining);
        info!(
            service = self.service,
            "Shutting http server down, draining for up to {:?}", self.drain_timeout
        );

        let outcome = match tokio::time::timeout(self.drain_timeout, &mut server).await {
            Ok(result) => {
                result?;
                ShutdownOutcome::Drained
            }
            Err(_) => {
                warn!(
                    service = self.service,
                    "Drain timed out after {:?}; dropping remaining connections",
                    self.drain_timeout
                );
                ShutdownOutcome::DrainTimedOut
            }
        };

        self.transition(Phase::Stopped);
        Ok(outcome)
    }
}

/// Resolves once on Ctrl-C or SIGTERM. Later signals are not observed.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
