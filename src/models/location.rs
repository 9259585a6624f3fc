//! Location model produced by the location resolver

use serde::{Deserialize, Serialize};

/// Locality a postal code resolves to
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Location {
    /// Postal code as echoed back by the upstream
    pub cep: String,
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    /// State (UF) abbreviation
    pub state: String,
    /// Latitude in decimal degrees, kept verbatim as the upstream sent it
    pub latitude: String,
    /// Longitude in decimal degrees, kept verbatim as the upstream sent it
    pub longitude: String,
    /// Name of the upstream that produced this record
    pub source_service: String,
}

impl Location {
    /// Create a location from the fields the pipeline actually consumes
    #[must_use]
    pub fn new(
        city: impl Into<String>,
        state: impl Into<String>,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
        source_service: impl Into<String>,
    ) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            latitude: latitude.into(),
            longitude: longitude.into(),
            source_service: source_service.into(),
            ..Self::default()
        }
    }

    /// Coordinates formatted as the `q` parameter of a weather lookup
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}
