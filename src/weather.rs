//! Weather API client for WeatherAPI.com integration
//!
//! Resolves coordinates into a current [`Temperature`]. Only Celsius is read
//! from the upstream; Fahrenheit and Kelvin are always derived locally.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::HeaderMap};
use thiserror::Error;
use tracing::debug;

use crate::context::RequestContext;
use crate::models::Temperature;

/// Failures a weather resolver reports
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("weather API rejected the credentials")]
    Unauthorized,

    #[error("weather API rejected the location")]
    InvalidLocation,

    #[error("weather service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WeatherError {
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Maps coordinates to the current temperature
#[async_trait]
pub trait WeatherResolver: Send + Sync {
    async fn resolve(
        &self,
        ctx: &RequestContext,
        latitude: &str,
        longitude: &str,
    ) -> Result<Temperature, WeatherError>;
}

/// `WeatherAPI.com` response structures
mod weatherapi {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct CurrentResponse {
        pub current: CurrentData,
    }

    #[derive(Debug, Deserialize)]
    pub struct CurrentData {
        pub temp_c: f64,
    }
}

/// Weather resolver backed by `api.weatherapi.com`
#[derive(Clone)]
pub struct WeatherApiResolver {
    client: Client,
    base_url: String,
    api_key: String,
}

// keeps the key out of logs
impl std::fmt::Debug for WeatherApiResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherApiResolver")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl WeatherApiResolver {
    pub const SOURCE: &'static str = "WeatherAPI";

    /// Create a resolver against `base_url` authenticating with `api_key`
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cep-weather/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self::with_client(client, base_url, api_key))
    }

    #[must_use]
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    fn current_url(&self, latitude: &str, longitude: &str) -> String {
        format!(
            "{}/v1/current.json?key={}&q={},{}&aqi=no",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(latitude),
            urlencoding::encode(longitude)
        )
    }
}

#[async_trait]
impl WeatherResolver for WeatherApiResolver {
    async fn resolve(
        &self,
        ctx: &RequestContext,
        latitude: &str,
        longitude: &str,
    ) -> Result<Temperature, WeatherError> {
        let url = self.current_url(latitude, longitude);
        let mut headers = HeaderMap::new();
        ctx.inject_trace(&mut headers);

        debug!(
            request_id = %ctx.request_id(),
            "Getting current weather for coordinates: {}, {}", latitude, longitude
        );

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| WeatherError::unavailable(e.without_url().to_string()))?;

        let status = response.status();
        match status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(WeatherError::Unauthorized);
            }
            s if s.is_client_error() => return Err(WeatherError::InvalidLocation),
            s => {
                return Err(WeatherError::unavailable(format!("upstream returned {s}")));
            }
        }

        let body: weatherapi::CurrentResponse = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| "Failed to parse WeatherAPI response")?;

        debug!("Current temperature is {} °C", body.current.temp_c);

        Ok(Temperature::from_celsius(body.current.temp_c, Self::SOURCE))
    }
}
