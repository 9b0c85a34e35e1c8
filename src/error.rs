//! Error types for citymap.
//!
//! Map service failures get their own [`GeocodeError`] so callers can tell a
//! rejected lookup apart from a broken local setup.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for citymap operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Query Errors ===
    /// A required query field was blank; the query is not issued.
    #[error("required field '{0}' is empty")]
    MissingField(&'static str),

    /// An air sample index did not refer to a loaded sample.
    #[error("no air sample at index {0}")]
    UnknownAirSample(usize),

    /// An encoded polyline could not be decoded.
    #[error("invalid encoded polyline: {message}")]
    InvalidPolyline {
        /// Description of the decoding failure.
        message: String,
    },

    /// The map service could not resolve a route or place.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    // === Data Errors ===
    /// A dataset file could not be read or parsed.
    #[error("failed to load data from {path}: {message}")]
    DataLoad {
        /// Path to the data file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for citymap operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a data load error for `path`.
    #[must_use]
    pub fn data_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DataLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error came from bad caller input rather than the system.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::MissingField(_) | Self::UnknownAirSample(_))
    }
}

/// Errors returned by a map service lookup.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("map service returned status {0}")]
    Status(String),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

impl GeocodeError {
    /// Create a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let err = Error::MissingField("start");
        assert_eq!(err.to_string(), "required field 'start' is empty");
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_data_load_display() {
        let err = Error::data_load("/tmp/wifi.json", "not an array");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/wifi.json"));
        assert!(msg.contains("not an array"));
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn test_geocode_status_is_transparent() {
        let err: Error = GeocodeError::Status("ZERO_RESULTS".to_string()).into();
        assert_eq!(err.to_string(), "map service returned status ZERO_RESULTS");
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_config_validation_display() {
        let err = Error::config_validation("place radius must be positive");
        assert!(err.to_string().contains("place radius must be positive"));
    }
}
