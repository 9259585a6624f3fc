//! Request-scoped context threaded through every resolver and outbound call
//!
//! Carries the correlation ID and the tracing span the work belongs to. The
//! span's OpenTelemetry context is what gets injected into outbound headers,
//! so the call chain never relies on the thread's "current" span.
//! Cancellation is structural: every outbound call is a future owned by the
//! handler, so when the caller disconnects or the server stops draining, the
//! handler future is dropped and any in-flight resolver call is aborted.

use axum::http::{HeaderMap, HeaderValue};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::middleware::{REQUEST_ID_HEADER, RequestId};
use crate::telemetry;

#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    span: Span,
}

impl RequestContext {
    #[must_use]
    pub fn new(request_id: RequestId, span: Span) -> Self {
        Self { request_id, span }
    }

    /// Context for an inbound request: `span` is parented on whatever trace
    /// context the caller put in the headers.
    #[must_use]
    pub fn from_inbound(request_id: RequestId, headers: &HeaderMap, span: Span) -> Self {
        let parent = telemetry::extract_context(headers);
        let _ = span.set_parent(parent);
        Self { request_id, span }
    }

    /// Same request, new step span
    #[must_use]
    pub fn child(&self, span: Span) -> Self {
        Self {
            request_id: self.request_id.clone(),
            span,
        }
    }

    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Write this context's trace propagation headers into `headers`.
    pub fn inject_trace(&self, headers: &mut HeaderMap) {
        telemetry::inject_context(&self.span.context(), headers);
    }

    /// Write the trace headers plus `X-Request-Id`, for hops between our own services.
    pub fn inject_all(&self, headers: &mut HeaderMap) {
        self.inject_trace(headers);
        if let Ok(value) = HeaderValue::from_str(self.request_id.as_str()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
    }
}
