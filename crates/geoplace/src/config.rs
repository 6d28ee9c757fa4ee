//! Provider credentials and feature switches.

/// Environment variable holding the Google Maps Platform key.
pub const GOOGLE_MAPS_API_KEY_VAR: &str = "GEOPLACE_GOOGLE_MAPS_API_KEY";
/// Environment variable holding the Mapbox access token.
pub const MAPBOX_ACCESS_TOKEN_VAR: &str = "GEOPLACE_MAPBOX_ACCESS_TOKEN";
/// Environment variable enabling recentring on the tileset's centre.
pub const AUTO_CENTER_TILESET_VAR: &str = "GEOPLACE_AUTO_CENTER_TILESET";

/// Runtime configuration.
///
/// Keys are trimmed; empty values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Key for photorealistic tiles, elevation and Google geocoding.
    pub google_maps_api_key: Option<String>,
    /// Token for Mapbox geocoding, preferred over Google when present.
    pub mapbox_access_token: Option<String>,
    /// Recentre the camera on the tileset when its root reports a location.
    pub auto_center_tileset: bool,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            google_maps_api_key: normalize_value(lookup(GOOGLE_MAPS_API_KEY_VAR)),
            mapbox_access_token: normalize_value(lookup(MAPBOX_ACCESS_TOKEN_VAR)),
            auto_center_tileset: lookup(AUTO_CENTER_TILESET_VAR).as_deref() == Some("true"),
        }
    }

    /// Build a configuration from explicit values, applying the same normalization.
    pub fn new(
        google_maps_api_key: Option<String>,
        mapbox_access_token: Option<String>,
        auto_center_tileset: bool,
    ) -> Self {
        Self {
            google_maps_api_key: normalize_value(google_maps_api_key),
            mapbox_access_token: normalize_value(mapbox_access_token),
            auto_center_tileset,
        }
    }

    pub fn has_geocoder(&self) -> bool {
        self.google_maps_api_key.is_some() || self.mapbox_access_token.is_some()
    }
}

/// Trim a raw value, mapping empty strings to `None`.
pub fn normalize_value(raw: Option<String>) -> Option<String> {
    let trimmed = raw?.trim().to_string();
    (!trimmed.is_empty()).then_some(trimmed)
}
