//! HTTP clients for the map providers.
//!
//! Response parsing lives in pure functions next to each endpoint so it can be
//! tested against recorded payloads; [`ProviderClient`] only performs the
//! requests. The client is runtime-agnostic: every method returns a future
//! that any executor can drive.

pub mod elevation;
pub mod geocode;
pub mod tileset;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result, redact_url};

/// Header carrying the Google Maps Platform key.
pub const GOOGLE_API_KEY_HEADER: &str = "X-GOOG-API-KEY";

/// HTTP client shared by all provider calls.
///
/// `reqwest::Client` is `Arc`-based, so clones share one connection pool.
#[derive(Debug, Clone, Default)]
pub struct ProviderClient {
    http: reqwest::Client,
}

impl ProviderClient {
    /// Create a client with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client around a preconfigured HTTP client.
    #[must_use]
    pub fn with_http(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Send a GET request, optionally authenticated with the Google key header.
    async fn send(&self, url: &str, google_key: Option<&str>) -> Result<reqwest::Response> {
        tracing::debug!(url = %redact_url(url), "fetching");

        let mut request = self.http.get(url);
        if let Some(key) = google_key {
            request = request.header(GOOGLE_API_KEY_HEADER, key);
        }

        request.send().await.map_err(|e| Error::Http {
            url: redact_url(url),
            message: e.to_string(),
        })
    }

    /// GET a JSON document, failing on non-success statuses.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        google_key: Option<&str>,
        context: &'static str,
    ) -> Result<T> {
        let response = self.send(url, google_key).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(url, status.as_u16(), &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::InvalidResponse {
                context,
                detail: e.to_string(),
            })
    }
}

/// Error for a non-success response, keeping a trimmed body for the status line.
fn status_error(url: &str, status: u16, body: &str) -> Error {
    Error::HttpStatus {
        url: redact_url(url),
        status,
        body: body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_redacts_key() {
        let err = status_error(
            "https://tile.googleapis.com/v1/3dtiles/root.json?key=secret",
            403,
            "  {\"error\":{\"message\":\"denied\"}}\n",
        );
        assert_eq!(
            err,
            Error::HttpStatus {
                url: "https://tile.googleapis.com/v1/3dtiles/root.json?key=***".to_string(),
                status: 403,
                body: "{\"error\":{\"message\":\"denied\"}}".to_string(),
            }
        );
        assert!(!err.to_string().contains("secret"));
    }
}
