//! Location Resolution Module
//!
//! Resolves a Brazilian postal code (CEP) into a [`Location`] with
//! coordinates. The production variant talks to AwesomeAPI; tests plug in
//! their own [`LocationResolver`] implementations.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::HeaderMap};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::context::RequestContext;
use crate::models::Location;

/// Number of digits in a CEP
pub const CEP_LENGTH: usize = 8;

/// Whether `cep` is exactly eight ASCII digits with no separators
#[must_use]
pub fn is_valid_cep(cep: &str) -> bool {
    cep.len() == CEP_LENGTH && cep.bytes().all(|b| b.is_ascii_digit())
}

/// Failures a location resolver reports
#[derive(Error, Debug)]
pub enum LocationError {
    #[error("invalid CEP")]
    InvalidInput,

    #[error("CEP not found")]
    NotFound,

    #[error("CEP service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LocationError {
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Maps a postal code to a locality and its coordinates
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self, ctx: &RequestContext, cep: &str) -> Result<Location, LocationError>;
}

/// Upstream payload of `GET /json/{cep}`
#[derive(Debug, Deserialize)]
struct AwesomeApiResponse {
    #[serde(default)]
    cep: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    district: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    lat: String,
    #[serde(default)]
    lng: String,
}

impl From<AwesomeApiResponse> for Location {
    fn from(response: AwesomeApiResponse) -> Self {
        Location {
            cep: response.cep,
            street: response.address,
            neighborhood: response.district,
            city: response.city,
            state: response.state,
            latitude: response.lat,
            longitude: response.lng,
            source_service: AwesomeApiResolver::SOURCE.to_string(),
        }
    }
}

/// Location resolver backed by `cep.awesomeapi.com.br`
#[derive(Debug, Clone)]
pub struct AwesomeApiResolver {
    client: Client,
    base_url: String,
}

impl AwesomeApiResolver {
    pub const SOURCE: &'static str = "AwesomeAPI";

    /// Create a resolver against `base_url` (no trailing path)
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cep-weather/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self::with_client(client, base_url))
    }

    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }
}

#[async_trait]
impl LocationResolver for AwesomeApiResolver {
    async fn resolve(&self, ctx: &RequestContext, cep: &str) -> Result<Location, LocationError> {
        if !is_valid_cep(cep) {
            return Err(LocationError::InvalidInput);
        }

        let url = format!("{}/json/{}", self.base_url, cep);
        let mut headers = HeaderMap::new();
        ctx.inject_trace(&mut headers);

        debug!(request_id = %ctx.request_id(), "Looking up CEP {}", cep);

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| LocationError::unavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LocationError::NotFound);
        }
        if status != StatusCode::OK {
            return Err(LocationError::unavailable(format!(
                "upstream returned {status}"
            )));
        }

        let body: AwesomeApiResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse AwesomeAPI response")?;

        let location = Location::from(body);
        debug!(
            "Resolved CEP {} to {}/{} ({}, {})",
            cep, location.city, location.state, location.latitude, location.longitude
        );

        Ok(location)
    }
}
