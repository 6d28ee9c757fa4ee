//! Model placement utilities and display formatting.

use serde::Deserialize;

pub use geoplace_mesh::{
    ModelFormat, detect_model_format, is_valid_model_file, normalize_model,
};

use crate::state::ModelPosition;

/// Reason reported when the elevation service returned no body.
pub const ELEVATION_NO_PAYLOAD: &str = "Elevation response had no payload";
/// Reason reported when an OK elevation response carried no usable value.
pub const ELEVATION_MISSING_RESULT: &str = "Elevation response missing result";

/// Format an altitude in whole metres, rounding half away from zero.
pub fn format_altitude(value: f64) -> String {
    format!("{} m", round_display(value))
}

/// Format the scale slider multiplier.
pub fn format_scale_multiplier(multiplier: f64) -> String {
    format!("{multiplier:.2}x")
}

/// Format a heading or pitch in whole degrees.
pub fn format_degrees(value: f64) -> String {
    format!("{}°", round_display(value))
}

/// Round half away from zero without ever printing `-0`.
fn round_display(value: f64) -> f64 {
    value.round() + 0.0
}

/// Format a coordinate pair for the status bar.
pub fn format_coordinates(lat: f64, lng: f64) -> String {
    format!("{lat:.6}, {lng:.6}")
}

/// Replace the fields that are provided, keeping the rest.
///
/// `Some(0.0)` counts as provided.
pub fn update_anchor_position(
    current: ModelPosition,
    lat: Option<f64>,
    lng: Option<f64>,
    altitude: Option<f64>,
) -> ModelPosition {
    ModelPosition {
        lat: lat.unwrap_or(current.lat),
        lng: lng.unwrap_or(current.lng),
        altitude: altitude.unwrap_or(current.altitude),
    }
}

/// Body of an elevation service response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElevationResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub results: Vec<ElevationSample>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// One sample of an elevation response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElevationSample {
    #[serde(default)]
    pub elevation: Option<f64>,
}

/// Outcome of an elevation lookup: an altitude, or the reason there is none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElevationResult {
    pub altitude: Option<f64>,
    pub reason: Option<String>,
}

impl ElevationResult {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            altitude: None,
            reason: Some(reason.into()),
        }
    }
}

/// Interpret an elevation response.
pub fn extract_elevation_result(response: Option<&ElevationResponse>) -> ElevationResult {
    let Some(response) = response else {
        return ElevationResult::failed(ELEVATION_NO_PAYLOAD);
    };

    if let Some(status) = response.status.as_deref()
        && status != "OK"
    {
        return ElevationResult::failed(
            response
                .error_message
                .clone()
                .unwrap_or_else(|| status.to_string()),
        );
    }

    match response
        .results
        .first()
        .and_then(|sample| sample.elevation)
        .filter(|elevation| elevation.is_finite())
    {
        Some(altitude) => ElevationResult {
            altitude: Some(altitude),
            reason: None,
        },
        None => ElevationResult::failed(ELEVATION_MISSING_RESULT),
    }
}

/// Status text for a failed terrain snap.
pub fn elevation_failure_status(reason: Option<&str>) -> String {
    let hint = match reason {
        Some(reason) => format!("Elevation lookup failed ({reason})."),
        None => "Unable to fetch elevation data.".to_string(),
    };
    format!("{hint} Adjust altitude manually.")
}
