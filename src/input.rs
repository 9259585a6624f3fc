//! Edge service: validates the CEP and forwards to the orchestrator
//!
//! The orchestrator's answer is relayed verbatim. Only a transport failure
//! on the forward hop produces a response of our own.

use anyhow::Context;
use axum::{
    Extension, Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use reqwest::Client;
use tracing::{Instrument, debug, info_span, warn};

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::location_resolver::is_valid_cep;
use crate::middleware::RequestId;
use crate::models::WeatherRequest;
use crate::web;

#[derive(Debug, Clone)]
pub struct InputState {
    client: Client,
    orchestrator_url: String,
}

impl InputState {
    /// State forwarding to the orchestrator at `orchestrator_url`
    pub fn new(orchestrator_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cep-weather/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self::with_client(client, orchestrator_url))
    }

    #[must_use]
    pub fn with_client(client: Client, orchestrator_url: impl Into<String>) -> Self {
        let orchestrator_url = orchestrator_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            orchestrator_url,
        }
    }

    fn weather_url(&self) -> String {
        format!("{}/api/weather", self.orchestrator_url)
    }
}

pub fn router(state: InputState) -> Router {
    let api = Router::new()
        .route(
            "/api/weather",
            post(forward_weather).layer(DefaultBodyLimit::max(web::MAX_BODY_BYTES)),
        )
        .with_state(state);

    web::with_common_routes(api)
}

async fn forward_weather(
    State(state): State<InputState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    let span = info_span!("POST /api/weather", request_id = %request_id);
    let ctx = RequestContext::from_inbound(request_id, &headers, span);

    let span = ctx.span().clone();
    match forward(&state, &ctx, body).instrument(span).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn forward(state: &InputState, ctx: &RequestContext, body: Bytes) -> Result<Response, ApiError> {
    let request: WeatherRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::InvalidInput)?;

    if !is_valid_cep(&request.cep) {
        return Err(ApiError::InvalidZipcode);
    }

    let mut headers = HeaderMap::new();
    ctx.inject_all(&mut headers);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    debug!("Forwarding CEP {} to {}", request.cep, state.orchestrator_url);

    let upstream = state
        .client
        .post(state.weather_url())
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "orchestrator request failed");
            ApiError::OrchestratorUnavailable
        })?;

    let status = upstream.status();
    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();
    let payload = upstream.bytes().await.map_err(|e| {
        warn!(error = %e, "failed to read orchestrator response");
        ApiError::OrchestratorUnavailable
    })?;

    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }

    Ok(response)
}
