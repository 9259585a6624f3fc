//! `cep-weather` - current temperature for a Brazilian postal code
//!
//! Two HTTP services share this library: an edge service that validates the
//! CEP and forwards it, and an orchestrator that resolves the CEP to a
//! locality and the locality's coordinates to a temperature.

pub mod config;
pub mod context;
pub mod error;
pub mod input;
pub mod location_resolver;
pub mod middleware;
pub mod models;
pub mod orchestrator;
pub mod telemetry;
pub mod weather;
pub mod web;

#[cfg(test)]
mod test_support;

// Re-export core types for public API
pub use config::{InputConfig, OrchestratorConfig};
pub use context::RequestContext;
pub use error::{ApiError, ErrorResponse, ServiceError};
pub use location_resolver::{AwesomeApiResolver, LocationError, LocationResolver, is_valid_cep};
pub use middleware::RequestId;
pub use models::{Location, Temperature, WeatherReport, WeatherRequest};
pub use weather::{WeatherApiResolver, WeatherError, WeatherResolver};
pub use web::{ShutdownOutcome, Supervisor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, ServiceError>;
