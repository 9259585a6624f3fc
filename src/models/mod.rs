//! Data models for the CEP weather pipeline
//!
//! Every value here lives for a single inbound request:
//! - Location: the locality and coordinates a postal code resolves to
//! - Weather: a temperature reading and the combined report sent to callers

pub mod location;
pub mod weather;

// Re-export all public types for convenient access
pub use location::Location;
pub use weather::{Temperature, WeatherReport, WeatherRequest, celsius_to_fahrenheit, celsius_to_kelvin};
