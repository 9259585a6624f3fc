//! Temperature reading and the combined report returned to callers

use serde::{Deserialize, Serialize, Serializer};

/// Convert Celsius to Fahrenheit
#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

/// Convert Celsius to Kelvin with a whole-degree offset of 273
#[must_use]
pub fn celsius_to_kelvin(celsius: f64) -> f64 {
    celsius + 273.0
}

/// Body of `POST /api/weather` on both services
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct WeatherRequest {
    /// Missing is treated like empty and fails CEP validation, not decoding
    #[serde(default)]
    pub cep: String,
}

/// Current temperature at a location
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Temperature {
    pub celsius: f64,
    pub fahrenheit: f64,
    pub kelvin: f64,
    /// Name of the upstream that produced this reading
    pub source_service: String,
}

impl Temperature {
    /// Build a reading from Celsius; the other scales are always derived.
    #[must_use]
    pub fn from_celsius(celsius: f64, source_service: impl Into<String>) -> Self {
        Self {
            celsius,
            fahrenheit: celsius_to_fahrenheit(celsius),
            kelvin: celsius_to_kelvin(celsius),
            source_service: source_service.into(),
        }
    }
}

/// Successful response body of `POST /api/weather`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherReport {
    pub city: String,
    #[serde(rename = "temp_C", serialize_with = "serialize_number")]
    pub temp_c: f64,
    #[serde(rename = "temp_F", serialize_with = "serialize_number")]
    pub temp_f: f64,
    #[serde(rename = "temp_K", serialize_with = "serialize_number")]
    pub temp_k: f64,
}

impl WeatherReport {
    #[must_use]
    pub fn new(city: impl Into<String>, temperature: &Temperature) -> Self {
        Self {
            city: city.into(),
            temp_c: temperature.celsius,
            temp_f: temperature.fahrenheit,
            temp_k: temperature.kelvin,
        }
    }
}

/// Whole values go out as integers (`20`, not `20.0`)
fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}
