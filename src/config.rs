//! Application configuration.
//!
//! Loaded with figment from (highest precedence first):
//! 1. Environment variables prefixed with `CITYMAP_` (`__` separates sections,
//!    e.g. `CITYMAP_SERVER__BIND`)
//! 2. A TOML file, `citymap.toml` unless another path is given
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "citymap.toml";

const ENV_PREFIX: &str = "CITYMAP_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataPaths,
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub thresholds: Thresholds,
    pub view: ViewConfig,
}

/// Locations of the static JSON inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub hotspots: PathBuf,
    pub air: PathBuf,
    pub accidents: PathBuf,
    pub map_config: PathBuf,
    pub secrets: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub directions_url: String,
    pub geocode_url: String,
    /// Overrides the key from the secrets file when set.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

/// Distance thresholds for the proximity filters.
///
/// Route tolerances are degrees off the path; the place radius is meters.
/// Accidents use a tighter route tolerance than hotspots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub route_accident_tolerance: f64,
    pub route_wifi_tolerance: f64,
    pub place_radius_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub zoom: u8,
    pub place_zoom: u8,
    pub wifi_radius_m: f64,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            hotspots: PathBuf::from("data/wifi.json"),
            air: PathBuf::from("data/aqi.json"),
            accidents: PathBuf::from("data/accidents.json"),
            map_config: PathBuf::from("data/config.json"),
            secrets: PathBuf::from("data/secrets.json"),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            directions_url: "https://maps.googleapis.com/maps/api/directions/json".to_string(),
            geocode_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            api_key: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            route_accident_tolerance: 0.0002,
            route_wifi_tolerance: 0.0005,
            place_radius_m: 250.0,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            zoom: 12,
            place_zoom: 18,
            wifi_radius_m: 50.0,
        }
    }
}

impl AppConfig {
    /// Load configuration, reading `path` if given or `citymap.toml` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider fails to parse or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.unwrap_or_else(|| Path::new(CONFIG_FILE_NAME));
        Self::from_figment(
            Figment::from(Serialized::defaults(AppConfig::default()))
                .merge(Toml::file(file))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    /// Extract and validate a configuration from an assembled figment.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or validation fails.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that thresholds and view settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        for (name, value) in [
            ("route_accident_tolerance", t.route_accident_tolerance),
            ("route_wifi_tolerance", t.route_wifi_tolerance),
            ("place_radius_m", t.place_radius_m),
            ("wifi_radius_m", self.view.wifi_radius_m),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::config_validation(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }

        for (name, zoom) in [("zoom", self.view.zoom), ("place_zoom", self.view.place_zoom)] {
            if zoom > 22 {
                return Err(Error::config_validation(format!(
                    "{name} must be between 0 and 22, got {zoom}"
                )));
            }
        }

        if self.server.bind.is_empty() {
            return Err(Error::config_validation("server.bind must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.thresholds.route_accident_tolerance, 0.0002);
        assert_eq!(config.thresholds.route_wifi_tolerance, 0.0005);
        assert_eq!(config.thresholds.place_radius_m, 250.0);
        assert_eq!(config.view.zoom, 12);
        assert_eq!(config.view.place_zoom, 18);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(
            Toml::string(
                r#"
                [thresholds]
                place_radius_m = 400.0

                [server]
                bind = "127.0.0.1:8080"
                "#,
            ),
        );
        let config = AppConfig::from_figment(figment).unwrap();
        assert_eq!(config.thresholds.place_radius_m, 400.0);
        assert_eq!(config.thresholds.route_wifi_tolerance, 0.0005);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_rejects_non_positive_tolerance() {
        let mut config = AppConfig::default();
        config.thresholds.route_accident_tolerance = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("route_accident_tolerance"));
    }

    #[test]
    fn test_rejects_zoom_out_of_range() {
        let mut config = AppConfig::default();
        config.view.place_zoom = 30;
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/citymap.toml"))).unwrap();
        assert_eq!(config.data, DataPaths::default());
    }
}
