//! Forward geocoding through Mapbox or Google.

use serde::Deserialize;

use crate::config::Config;
use crate::error::{Error, Result};

use super::ProviderClient;

const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const MAPBOX_GEOCODE_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";

/// Maximum number of suggestions kept from a response.
pub const MAX_SUGGESTIONS: usize = 5;

/// A configured geocoding backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeProvider {
    Mapbox { token: String },
    Google { key: String },
}

impl GeocodeProvider {
    /// Mapbox wins when both credentials are present.
    pub fn from_config(config: &Config) -> Option<Self> {
        if let Some(token) = &config.mapbox_access_token {
            return Some(Self::Mapbox {
                token: token.clone(),
            });
        }
        config
            .google_maps_api_key
            .as_ref()
            .map(|key| Self::Google { key: key.clone() })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Mapbox { .. } => "Mapbox",
            Self::Google { .. } => "Google",
        }
    }

    pub fn build_url(&self, query: &str) -> String {
        let query = urlencoding::encode(query);
        match self {
            Self::Mapbox { token } => format!(
                "{MAPBOX_GEOCODE_URL}/{query}.json?access_token={}&limit={MAX_SUGGESTIONS}&autocomplete=true",
                urlencoding::encode(token)
            ),
            Self::Google { key } => format!(
                "{GOOGLE_GEOCODE_URL}?address={query}&key={}",
                urlencoding::encode(key)
            ),
        }
    }

    /// Status text describing a failed lookup.
    pub fn failure_message(&self, error: &Error) -> String {
        match (self, error) {
            (Self::Mapbox { .. }, Error::HttpStatus { status, body, .. }) => {
                format!("Mapbox geocoding failed ({status}). {body}")
            }
            (Self::Mapbox { .. }, Error::Provider { status, message, .. }) => {
                format!(
                    "Mapbox geocoding error: {}",
                    message.as_deref().unwrap_or(status)
                )
            }
            (Self::Mapbox { .. }, _) => "Mapbox geocoding network error.".to_string(),
            (Self::Google { .. }, Error::HttpStatus { status, .. }) => {
                format!("Geocoding failed ({status}). Check API key/billing/referrer settings.")
            }
            (Self::Google { .. }, Error::Provider { status, message, .. }) => match message {
                Some(message) => format!("Geocoding returned {status}: {message}"),
                None => format!("Geocoding returned {status}"),
            },
            (Self::Google { .. }, Error::MissingConfig { .. }) => {
                "Google Maps API key missing. Search unavailable.".to_string()
            }
            (Self::Google { .. }, _) => {
                "Geocoding network error. Check connectivity or CORS.".to_string()
            }
        }
    }
}

/// One candidate location offered to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSuggestion {
    pub label: String,
    /// Secondary text, the coordinates to five decimals.
    pub detail: String,
    pub lat: f64,
    pub lng: f64,
}

impl SearchSuggestion {
    pub fn new(label: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            label: label.into(),
            detail: format!("{lat:.5}, {lng:.5}"),
            lat,
            lng,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleGeocodeResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub results: Vec<GoogleGeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleGeocodeResult {
    pub formatted_address: String,
    pub geometry: GoogleGeometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleGeometry {
    pub location: GoogleLocation,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GoogleLocation {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapboxGeocodeResponse {
    #[serde(default)]
    pub features: Vec<MapboxFeature>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapboxFeature {
    #[serde(default)]
    pub place_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// `[lng, lat]`.
    #[serde(default)]
    pub center: Option<Vec<f64>>,
}

/// Interpret a Google geocoding response.
///
/// `ZERO_RESULTS` is reported as a provider status like any other non-OK
/// status.
pub fn parse_google_response(body: GoogleGeocodeResponse) -> Result<Vec<SearchSuggestion>> {
    if let Some(status) = body.status
        && status != "OK"
    {
        return Err(Error::Provider {
            provider: "Google geocoding",
            status,
            message: body.error_message,
        });
    }

    Ok(body
        .results
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|result| {
            let GoogleLocation { lat, lng } = result.geometry.location;
            SearchSuggestion::new(result.formatted_address, lat, lng)
        })
        .collect())
}

/// Interpret a Mapbox geocoding response.
///
/// Features without a usable centre are skipped.
pub fn parse_mapbox_response(body: MapboxGeocodeResponse) -> Result<Vec<SearchSuggestion>> {
    if let Some(message) = body.message {
        return Err(Error::Provider {
            provider: "Mapbox geocoding",
            status: "error".to_string(),
            message: Some(message),
        });
    }

    Ok(body
        .features
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .filter_map(|feature| {
            let center = feature.center?;
            let [lng, lat] = [*center.first()?, *center.get(1)?];
            let label = feature
                .place_name
                .or(feature.text)
                .unwrap_or_else(|| "Unnamed".to_string());
            Some(SearchSuggestion::new(label, lat, lng))
        })
        .collect())
}

/// Parse a literal `"lat,lng"` query, such as `"37.79, -122.40"`.
///
/// Both parts must be plain decimals (no exponent or sign other than a
/// leading minus) and within geographic range.
pub fn parse_lat_lng(query: &str) -> Option<(f64, f64)> {
    let (lat, lng) = query.trim().split_once(',')?;
    let lng = lng.trim_start();
    if !is_plain_decimal(lat) || !is_plain_decimal(lng) {
        return None;
    }

    let lat: f64 = lat.parse().ok()?;
    let lng: f64 = lng.parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)).then_some((lat, lng))
}

/// `-?\d+(\.\d+)?`
fn is_plain_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && fraction.is_none_or(all_digits)
}

impl ProviderClient {
    /// Geocode a free-text query.
    pub async fn geocode(
        &self,
        provider: &GeocodeProvider,
        query: &str,
    ) -> Result<Vec<SearchSuggestion>> {
        let url = provider.build_url(query);
        match provider {
            GeocodeProvider::Mapbox { .. } => {
                let body = self
                    .fetch_json::<MapboxGeocodeResponse>(&url, None, "Mapbox geocoding response")
                    .await?;
                parse_mapbox_response(body)
            }
            GeocodeProvider::Google { .. } => {
                let body = self
                    .fetch_json::<GoogleGeocodeResponse>(&url, None, "Google geocoding response")
                    .await?;
                parse_google_response(body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_preference() {
        let both = Config::new(Some("g".into()), Some("m".into()), false);
        assert_eq!(
            GeocodeProvider::from_config(&both),
            Some(GeocodeProvider::Mapbox { token: "m".into() })
        );

        let google = Config::new(Some("g".into()), None, false);
        assert_eq!(GeocodeProvider::from_config(&google).unwrap().label(), "Google");
        assert!(GeocodeProvider::from_config(&Config::default()).is_none());
    }

    #[test]
    fn test_build_urls() {
        let mapbox = GeocodeProvider::Mapbox { token: "pk".into() };
        assert_eq!(
            mapbox.build_url("Golden Gate"),
            "https://api.mapbox.com/geocoding/v5/mapbox.places/Golden%20Gate.json?access_token=pk&limit=5&autocomplete=true"
        );

        let google = GeocodeProvider::Google { key: "abc".into() };
        assert_eq!(
            google.build_url("Golden Gate Bridge"),
            "https://maps.googleapis.com/maps/api/geocode/json?address=Golden%20Gate%20Bridge&key=abc"
        );
    }

    #[test]
    fn test_parse_google_ok() {
        let body: GoogleGeocodeResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [
                    {"formatted_address": "Golden Gate Bridge, San Francisco, CA, USA",
                     "geometry": {"location": {"lat": 37.8199286, "lng": -122.4782551}}}
                ]
            }"#,
        )
        .unwrap();

        let suggestions = parse_google_response(body).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].label, "Golden Gate Bridge, San Francisco, CA, USA");
        assert_eq!(suggestions[0].detail, "37.81993, -122.47826");
    }

    #[test]
    fn test_parse_google_denied() {
        let body: GoogleGeocodeResponse = serde_json::from_str(
            r#"{"status": "REQUEST_DENIED", "results": [], "error_message": "The provided API key is invalid."}"#,
        )
        .unwrap();
        let err = parse_google_response(body).unwrap_err();

        let google = GeocodeProvider::Google { key: "k".into() };
        assert_eq!(
            google.failure_message(&err),
            "Geocoding returned REQUEST_DENIED: The provided API key is invalid."
        );
    }

    #[test]
    fn test_parse_mapbox_features() {
        let body: MapboxGeocodeResponse = serde_json::from_str(
            r#"{
                "features": [
                    {"place_name": "Paris, France", "center": [2.35, 48.85]},
                    {"text": "Paris", "center": [-95.55, 33.66]},
                    {"center": [1.0, 2.0]},
                    {"place_name": "No centre"},
                    {"place_name": "Short centre", "center": [1.0]}
                ]
            }"#,
        )
        .unwrap();

        let suggestions = parse_mapbox_response(body).unwrap();
        let labels: Vec<_> = suggestions.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["Paris, France", "Paris", "Unnamed"]);
        assert!((suggestions[0].lat - 48.85).abs() < 1e-9);
        assert!((suggestions[0].lng - 2.35).abs() < 1e-9);
    }

    #[test]
    fn test_parse_mapbox_message() {
        let body: MapboxGeocodeResponse =
            serde_json::from_str(r#"{"message": "Not Authorized - Invalid Token"}"#).unwrap();
        let err = parse_mapbox_response(body).unwrap_err();

        let mapbox = GeocodeProvider::Mapbox { token: "t".into() };
        assert_eq!(
            mapbox.failure_message(&err),
            "Mapbox geocoding error: Not Authorized - Invalid Token"
        );
    }

    #[test]
    fn test_failure_messages_for_transport_errors() {
        let status = Error::HttpStatus {
            url: "u".into(),
            status: 401,
            body: "Unauthorized".into(),
        };
        let network = Error::Http {
            url: "u".into(),
            message: "dns".into(),
        };

        let mapbox = GeocodeProvider::Mapbox { token: "t".into() };
        assert_eq!(mapbox.failure_message(&status), "Mapbox geocoding failed (401). Unauthorized");
        assert_eq!(mapbox.failure_message(&network), "Mapbox geocoding network error.");

        let google = GeocodeProvider::Google { key: "k".into() };
        assert_eq!(
            google.failure_message(&status),
            "Geocoding failed (401). Check API key/billing/referrer settings."
        );
        assert_eq!(
            google.failure_message(&network),
            "Geocoding network error. Check connectivity or CORS."
        );
    }

    #[test]
    fn test_parse_lat_lng() {
        assert_eq!(parse_lat_lng("37.79,-122.40"), Some((37.79, -122.40)));
        assert_eq!(parse_lat_lng("  -33.86,   151.21  "), Some((-33.86, 151.21)));
        assert_eq!(parse_lat_lng("0,0"), Some((0.0, 0.0)));
        assert_eq!(parse_lat_lng("90,180"), Some((90.0, 180.0)));

        assert_eq!(parse_lat_lng("91,0"), None);
        assert_eq!(parse_lat_lng("0,-180.5"), None);
        assert_eq!(parse_lat_lng("37.79 ,-122.40"), None);
        assert_eq!(parse_lat_lng("1e3,5"), None);
        assert_eq!(parse_lat_lng("+1,5"), None);
        assert_eq!(parse_lat_lng("1.,5"), None);
        assert_eq!(parse_lat_lng("Golden Gate Bridge"), None);
        assert_eq!(parse_lat_lng("1,2,3"), None);
    }
}
