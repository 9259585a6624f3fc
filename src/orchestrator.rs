//! Orchestrator service: CEP → location → temperature
//!
//! One request runs a fixed sequence with no retries: decode, validate,
//! resolve the location, resolve the weather at its coordinates, respond.
//! Each resolver call gets its own span, closed before the handler returns.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::HeaderMap,
    routing::post,
};
use tracing::{Instrument, Span, debug, error, field, info_span, warn};

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::location_resolver::{LocationError, LocationResolver, is_valid_cep};
use crate::middleware::RequestId;
use crate::models::{WeatherReport, WeatherRequest};
use crate::weather::{WeatherError, WeatherResolver};
use crate::web;

/// Resolvers shared by every request
#[derive(Clone)]
pub struct OrchestratorState {
    locations: Arc<dyn LocationResolver>,
    weather: Arc<dyn WeatherResolver>,
}

impl OrchestratorState {
    pub fn new(locations: Arc<dyn LocationResolver>, weather: Arc<dyn WeatherResolver>) -> Self {
        Self { locations, weather }
    }
}

pub fn router(state: OrchestratorState) -> Router {
    let api = Router::new()
        .route(
            "/api/weather",
            post(get_temperature).layer(DefaultBodyLimit::max(web::MAX_BODY_BYTES)),
        )
        .with_state(state);

    web::with_common_routes(api)
}

async fn get_temperature(
    State(state): State<OrchestratorState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WeatherReport>, ApiError> {
    let body = body?;
    let span = info_span!("POST /api/weather", request_id = %request_id);
    let ctx = RequestContext::from_inbound(request_id, &headers, span);

    let span = ctx.span().clone();
    lookup_weather(&state, &ctx, &body)
        .instrument(span)
        .await
        .map(Json)
}

/// Run the two-step lookup for a raw request body.
pub async fn lookup_weather(
    state: &OrchestratorState,
    ctx: &RequestContext,
    body: &[u8],
) -> Result<WeatherReport, ApiError> {
    let request: WeatherRequest =
        serde_json::from_slice(body).map_err(|_| ApiError::InvalidInput)?;

    if !is_valid_cep(&request.cep) {
        return Err(ApiError::InvalidZipcode);
    }

    let location = {
        let span = info_span!(
            parent: ctx.span(),
            "cep-loader",
            otel.status_code = field::Empty,
            otel.status_description = field::Empty,
        );
        let step = ctx.child(span.clone());

        state
            .locations
            .resolve(&step, &request.cep)
            .instrument(span.clone())
            .await
            .map_err(|err| {
                mark_failed(&span, &err);
                span.in_scope(|| classify_location_error(&err))
            })?
    };

    debug!(
        "CEP {} is {}/{} at {}",
        request.cep,
        location.city,
        location.state,
        location.format_coordinates()
    );

    let temperature = {
        let span = info_span!(
            parent: ctx.span(),
            "weather-loader",
            otel.status_code = field::Empty,
            otel.status_description = field::Empty,
        );
        let step = ctx.child(span.clone());

        state
            .weather
            .resolve(&step, &location.latitude, &location.longitude)
            .instrument(span.clone())
            .await
            .map_err(|err| {
                mark_failed(&span, &err);
                span.in_scope(|| classify_weather_error(&err))
            })?
    };

    Ok(WeatherReport::new(location.city, &temperature))
}

fn mark_failed(span: &Span, err: &dyn std::error::Error) {
    span.record("otel.status_code", "ERROR");
    span.record("otel.status_description", field::display(err));
}

fn classify_location_error(err: &LocationError) -> ApiError {
    match err {
        LocationError::InvalidInput => {
            debug!(error = %err, "cep rejected by the location service");
            ApiError::InvalidZipcode
        }
        LocationError::NotFound => {
            debug!(error = %err, "cep has no match");
            ApiError::ZipcodeNotFound
        }
        LocationError::Unavailable { .. } => {
            warn!(error = %err, "cep service is unavailable");
            ApiError::CepServiceUnavailable
        }
        LocationError::Other(_) => {
            error!(error = ?err, "unhandled error while loading cep");
            ApiError::Internal
        }
    }
}

fn classify_weather_error(err: &WeatherError) -> ApiError {
    match err {
        WeatherError::Unavailable { .. } => {
            warn!(error = %err, "weather service is unavailable");
            ApiError::WeatherServiceUnavailable
        }
        WeatherError::Unauthorized | WeatherError::InvalidLocation | WeatherError::Other(_) => {
            error!(error = ?err, "unhandled error while loading weather");
            ApiError::Internal
        }
    }
}
