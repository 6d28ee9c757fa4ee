//! Error types for the geoplace crate.

use std::fmt;

/// Result type for geoplace operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to map providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// HTTP request failed before a response arrived.
    Http {
        /// The URL that failed, with credentials redacted.
        url: String,
        /// The error message.
        message: String,
    },
    /// HTTP response had a non-success status code.
    HttpStatus {
        /// The URL that returned the error, with credentials redacted.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Response body, if one could be read.
        body: String,
    },
    /// The provider answered but reported a failure in its payload.
    Provider {
        /// Provider name.
        provider: &'static str,
        /// Provider status code, such as `REQUEST_DENIED`.
        status: String,
        /// Provider error message, if any.
        message: Option<String>,
    },
    /// Response could not be decoded.
    InvalidResponse {
        /// Context for where the error occurred.
        context: &'static str,
        /// Description of what was invalid.
        detail: String,
    },
    /// A required configuration value is absent.
    MissingConfig {
        /// The environment variable that supplies the value.
        key: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http { url, message } => {
                write!(f, "http request to {url} failed: {message}")
            }
            Error::HttpStatus { url, status, .. } => {
                write!(f, "http request to {url} returned status {status}")
            }
            Error::Provider {
                provider,
                status,
                message,
            } => match message {
                Some(message) => write!(f, "{provider} returned {status}: {message}"),
                None => write!(f, "{provider} returned {status}"),
            },
            Error::InvalidResponse { context, detail } => {
                write!(f, "invalid {context}: {detail}")
            }
            Error::MissingConfig { key } => write!(f, "missing configuration value {key}"),
        }
    }
}

impl std::error::Error for Error {}

/// Replace the value of `key=` / `access_token=` query parameters with `***`.
pub(crate) fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let query = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name @ ("key" | "access_token"), _)) => format!("{name}=***"),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{query}")
}
