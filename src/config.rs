//! Configuration management for both services
//!
//! Settings come from unprefixed environment variables (`PORT`,
//! `WEATHER_APIKEY`, ...). Every setting except the weather API key has a
//! default, and each config is validated before a listener is bound.

use std::time::Duration;

use config::{Config, Environment, Map};
use serde::Deserialize;

use crate::error::ServiceError;
use crate::web::Supervisor;

/// Edge service settings
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_input_port")]
    pub port: u16,
    /// Base URL of the orchestrator service
    #[serde(default = "default_orchestrator_url")]
    pub orchestrator_url: String,
    /// OTLP/HTTP traces endpoint; export is disabled when unset
    #[serde(default)]
    pub otel_exporter_url: Option<String>,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

/// Orchestrator service settings
#[derive(Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_orchestrator_port")]
    pub port: u16,
    /// WeatherAPI key
    #[serde(default)]
    pub weather_apikey: String,
    #[serde(default = "default_cep_api_url")]
    pub cep_api_url: String,
    #[serde(default = "default_weather_api_url")]
    pub weather_api_url: String,
    #[serde(default)]
    pub otel_exporter_url: Option<String>,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl std::fmt::Debug for OrchestratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorConfig")
            .field("port", &self.port)
            .field("cep_api_url", &self.cep_api_url)
            .field("weather_api_url", &self.weather_api_url)
            .field("otel_exporter_url", &self.otel_exporter_url)
            .field("shutdown_timeout_seconds", &self.shutdown_timeout_seconds)
            .finish_non_exhaustive()
    }
}

fn default_input_port() -> u16 {
    8080
}

fn default_orchestrator_port() -> u16 {
    8181
}

fn default_orchestrator_url() -> String {
    "http://localhost:8181".to_string()
}

fn default_cep_api_url() -> String {
    "https://cep.awesomeapi.com.br".to_string()
}

fn default_weather_api_url() -> String {
    "https://api.weatherapi.com".to_string()
}

fn default_shutdown_timeout() -> u64 {
    Supervisor::DEFAULT_DRAIN_TIMEOUT.as_secs()
}

const MAX_SHUTDOWN_TIMEOUT_SECONDS: u64 = 300;

/// Read the environment, or `source` in its place when given.
fn load_settings<T>(source: Option<Map<String, String>>) -> Result<T, ServiceError>
where
    T: for<'de> Deserialize<'de>,
{
    Config::builder()
        .add_source(Environment::default().ignore_empty(true).source(source))
        .build()
        .and_then(Config::try_deserialize)
        .map_err(|e| ServiceError::config(format!("Failed to load configuration: {e}")))
}

fn validate_url(name: &str, url: &str) -> Result<(), ServiceError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ServiceError::config(format!(
            "{name} must be a valid HTTP or HTTPS URL, got '{url}'"
        )));
    }
    Ok(())
}

fn validate_common(
    otel_exporter_url: Option<&str>,
    shutdown_timeout_seconds: u64,
) -> Result<(), ServiceError> {
    if let Some(url) = otel_exporter_url {
        validate_url("OTEL_EXPORTER_URL", url)?;
    }
    if !(1..=MAX_SHUTDOWN_TIMEOUT_SECONDS).contains(&shutdown_timeout_seconds) {
        return Err(ServiceError::config(format!(
            "SHUTDOWN_TIMEOUT_SECONDS must be between 1 and {MAX_SHUTDOWN_TIMEOUT_SECONDS}"
        )));
    }
    Ok(())
}

impl InputConfig {
    /// Load from the process environment and validate
    pub fn load() -> Result<Self, ServiceError> {
        Self::load_from(None)
    }

    pub fn load_from(source: Option<Map<String, String>>) -> Result<Self, ServiceError> {
        let config: Self = load_settings(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_url("ORCHESTRATOR_URL", &self.orchestrator_url)?;
        validate_common(self.otel_exporter_url.as_deref(), self.shutdown_timeout_seconds)
    }

    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl OrchestratorConfig {
    /// Load from the process environment and validate
    pub fn load() -> Result<Self, ServiceError> {
        Self::load_from(None)
    }

    pub fn load_from(source: Option<Map<String, String>>) -> Result<Self, ServiceError> {
        let config: Self = load_settings(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.weather_apikey.trim().is_empty() {
            return Err(ServiceError::config(
                "WEATHER_APIKEY is required. Get a key at https://www.weatherapi.com",
            ));
        }
        validate_url("CEP_API_URL", &self.cep_api_url)?;
        validate_url("WEATHER_API_URL", &self.weather_api_url)?;
        validate_common(self.otel_exporter_url.as_deref(), self.shutdown_timeout_seconds)
    }

    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}
