//! Probe the Google Maps Platform endpoints the viewer depends on.
//!
//! Reads the key from `--google-maps-api-key` or `GEOPLACE_GOOGLE_MAPS_API_KEY`
//! and prints one line per API:
//!
//! ```text
//! Photorealistic 3D Tiles: OK (status 200)
//! Elevation API: OK (status OK, elevation 21.37m)
//! Geocoding API: FAIL (REQUEST_DENIED)
//! ```

#[cfg(not(target_family = "wasm"))]
mod probe {
    use std::fmt;

    use clap::Parser;
    use geoplace::config::{Config, GOOGLE_MAPS_API_KEY_VAR};
    use geoplace::providers::GOOGLE_API_KEY_HEADER;
    use geoplace::providers::elevation::build_elevation_url;
    use geoplace::providers::geocode::GeocodeProvider;
    use geoplace::providers::tileset::build_tiles_url;
    use serde_json::Value;

    /// Where the elevation probe samples (downtown San Francisco).
    const SAMPLE_LAT: f64 = 37.793;
    const SAMPLE_LNG: f64 = -122.403;
    const SAMPLE_ADDRESS: &str = "Golden Gate Bridge";

    #[derive(Parser)]
    #[command(about = "Check which Google Maps Platform APIs a key can reach")]
    pub struct Args {
        /// Google Maps Platform key [default: $GEOPLACE_GOOGLE_MAPS_API_KEY].
        #[arg(long)]
        google_maps_api_key: Option<String>,
    }

    /// Outcome of one probe.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Outcome {
        Ok(String),
        Fail(String),
        /// The request itself failed.
        Error(String),
    }

    impl fmt::Display for Outcome {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Ok(detail) => write!(f, "OK ({detail})"),
                Self::Fail(detail) => write!(f, "FAIL ({detail})"),
                Self::Error(message) => write!(f, "ERROR ({message})"),
            }
        }
    }

    #[derive(Clone, Copy)]
    enum Api {
        Tiles,
        Elevation,
        Geocoding,
    }

    impl Api {
        const ALL: [Self; 3] = [Self::Tiles, Self::Elevation, Self::Geocoding];

        fn name(self) -> &'static str {
            match self {
                Self::Tiles => "Photorealistic 3D Tiles",
                Self::Elevation => "Elevation API",
                Self::Geocoding => "Geocoding API",
            }
        }

        fn url(self, key: &str) -> String {
            match self {
                Self::Tiles => build_tiles_url(key),
                Self::Elevation => build_elevation_url(SAMPLE_LAT, SAMPLE_LNG, key),
                Self::Geocoding => GeocodeProvider::Google {
                    key: key.to_string(),
                }
                .build_url(SAMPLE_ADDRESS),
            }
        }

        /// Judge a response from its status and (possibly absent) JSON body.
        fn evaluate(self, status: u16, reason: &str, body: Option<&Value>) -> Outcome {
            let success = (200..300).contains(&status);
            let field = |path: &[&str]| {
                let mut value = body?;
                for key in path {
                    value = value.get(key)?;
                }
                Some(value)
            };
            let text = |path: &[&str]| field(path).and_then(Value::as_str).map(str::to_string);
            let api_ok = text(&["status"]).as_deref() == Some("OK");
            let api_error = || {
                text(&["error_message"])
                    .or_else(|| text(&["status"]))
                    .unwrap_or_else(|| reason.to_string())
            };

            match self {
                Self::Tiles if success => Outcome::Ok(format!("status {status}")),
                Self::Tiles => Outcome::Fail(
                    text(&["error", "message"]).unwrap_or_else(|| reason.to_string()),
                ),
                Self::Elevation if success && api_ok => {
                    let elevation = body
                        .and_then(|b| b.get("results"))
                        .and_then(|r| r.get(0))
                        .and_then(|r| r.get("elevation"))
                        .and_then(Value::as_f64);
                    Outcome::Ok(elevation.map_or_else(
                        || "status OK".to_string(),
                        |e| format!("status OK, elevation {e:.2}m"),
                    ))
                }
                Self::Geocoding if success && api_ok => {
                    let formatted = body
                        .and_then(|b| b.get("results"))
                        .and_then(|r| r.get(0))
                        .and_then(|r| r.get("formatted_address"))
                        .and_then(Value::as_str);
                    Outcome::Ok(formatted.unwrap_or("status OK").to_string())
                }
                Self::Elevation | Self::Geocoding => Outcome::Fail(api_error()),
            }
        }
    }

    async fn check(http: &reqwest::Client, api: Api, key: &str) -> Outcome {
        let response = match http
            .get(api.url(key))
            .header(GOOGLE_API_KEY_HEADER, key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Outcome::Error(e.to_string()),
        };
        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("Unknown status");
        let body = response.json::<Value>().await.ok();
        api.evaluate(status.as_u16(), reason, body.as_ref())
    }

    pub async fn run() -> i32 {
        let args = Args::parse();
        let key = Config::new(args.google_maps_api_key, None, false)
            .google_maps_api_key
            .or_else(|| Config::from_env().google_maps_api_key);
        let Some(key) = key else {
            eprintln!("Missing {GOOGLE_MAPS_API_KEY_VAR} in the environment or --google-maps-api-key");
            return 1;
        };

        let http = reqwest::Client::new();
        for api in Api::ALL {
            let outcome = check(&http, api, &key).await;
            tracing::debug!(api = api.name(), ?outcome, "probe finished");
            println!("{}: {outcome}", api.name());
        }
        0
    }

    #[cfg(test)]
    mod tests {
        use serde_json::json;

        use super::*;

        #[test]
        fn test_tiles_outcome() {
            assert_eq!(
                Api::Tiles.evaluate(200, "OK", None),
                Outcome::Ok("status 200".to_string())
            );
            let denied = json!({"error": {"message": "API key not valid."}});
            assert_eq!(
                Api::Tiles.evaluate(400, "Bad Request", Some(&denied)),
                Outcome::Fail("API key not valid.".to_string())
            );
            assert_eq!(
                Api::Tiles.evaluate(403, "Forbidden", None),
                Outcome::Fail("Forbidden".to_string())
            );
        }

        #[test]
        fn test_elevation_outcome() {
            let ok = json!({"status": "OK", "results": [{"elevation": 21.366}]});
            assert_eq!(
                Api::Elevation.evaluate(200, "OK", Some(&ok)),
                Outcome::Ok("status OK, elevation 21.37m".to_string())
            );

            let denied = json!({"status": "REQUEST_DENIED", "error_message": "Not enabled"});
            assert_eq!(
                Api::Elevation.evaluate(200, "OK", Some(&denied)),
                Outcome::Fail("Not enabled".to_string())
            );

            let bare = json!({"status": "OVER_QUERY_LIMIT"});
            assert_eq!(
                Api::Elevation.evaluate(200, "OK", Some(&bare)),
                Outcome::Fail("OVER_QUERY_LIMIT".to_string())
            );
        }

        #[test]
        fn test_geocoding_outcome() {
            let ok = json!({
                "status": "OK",
                "results": [{"formatted_address": "Golden Gate Bridge, San Francisco, CA, USA"}]
            });
            assert_eq!(
                Api::Geocoding.evaluate(200, "OK", Some(&ok)),
                Outcome::Ok("Golden Gate Bridge, San Francisco, CA, USA".to_string())
            );
            assert_eq!(
                Api::Geocoding.evaluate(500, "Internal Server Error", None),
                Outcome::Fail("Internal Server Error".to_string())
            );
        }

        #[test]
        fn test_outcome_display() {
            assert_eq!(Outcome::Ok("x".into()).to_string(), "OK (x)");
            assert_eq!(Outcome::Fail("y".into()).to_string(), "FAIL (y)");
            assert_eq!(Outcome::Error("z".into()).to_string(), "ERROR (z)");
        }

        #[test]
        fn test_probe_urls_carry_key() {
            for api in Api::ALL {
                assert!(api.url("k3y").contains("key=k3y"), "{}", api.name());
            }
            assert!(Api::Geocoding.url("k").contains("Golden%20Gate%20Bridge"));
        }
    }
}

#[cfg(not(target_family = "wasm"))]
#[tokio::main]
async fn main() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    std::process::exit(probe::run().await);
}

#[cfg(target_family = "wasm")]
fn main() {}
