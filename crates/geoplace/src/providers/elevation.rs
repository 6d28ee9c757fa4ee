//! Ground elevation lookups.

use crate::model::{ElevationResponse, ElevationResult, extract_elevation_result};

use super::{GOOGLE_API_KEY_HEADER, ProviderClient};

const ELEVATION_URL: &str = "https://maps.googleapis.com/maps/api/elevation/json";

/// Reason reported when a snap is requested without a Google key.
pub const ELEVATION_KEY_MISSING: &str = "Google Maps API key missing or Elevation API not enabled";

pub fn build_elevation_url(lat: f64, lng: f64, key: &str) -> String {
    format!(
        "{ELEVATION_URL}?locations={lat},{lng}&key={}",
        urlencoding::encode(key)
    )
}

impl ProviderClient {
    /// Look up the ground elevation at a location.
    ///
    /// Never fails outright: transport and provider errors become the
    /// result's `reason`.
    pub async fn lookup_elevation(&self, lat: f64, lng: f64, key: &str) -> ElevationResult {
        let url = build_elevation_url(lat, lng, key);
        tracing::debug!(lat, lng, "Requesting elevation");

        let response = match self
            .http()
            .get(&url)
            .header(GOOGLE_API_KEY_HEADER, key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Elevation fetch failed: {e}");
                return ElevationResult::failed(e.to_string());
            }
        };

        let status = response.status();
        let body = response.json::<ElevationResponse>().await.ok();
        let parsed = extract_elevation_result(body.as_ref());

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), reason = ?parsed.reason, "Elevation API error");
            let reason = parsed.reason.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
            return ElevationResult::failed(reason);
        }

        match (parsed.altitude, parsed.reason.as_deref()) {
            (Some(altitude), _) => tracing::debug!("Elevation altitude(m): {altitude:.2}"),
            (None, Some(reason)) => tracing::error!("Elevation API missing data: {reason}"),
            (None, None) => {}
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_elevation_url() {
        assert_eq!(
            build_elevation_url(37.793, -122.403, "k y"),
            "https://maps.googleapis.com/maps/api/elevation/json?locations=37.793,-122.403&key=k%20y"
        );
    }
}
