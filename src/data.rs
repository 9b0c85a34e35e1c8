use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::config::DataPaths;
use crate::error::{Error, Result};
use crate::model::{AccidentRecord, AirSample, Hotspot, MapConfig, Secrets};

/// The static inputs, loaded once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub hotspots: Vec<Hotspot>,
    pub air_samples: Vec<AirSample>,
    pub accidents: Vec<AccidentRecord>,
    pub map_config: MapConfig,
    pub secrets: Secrets,
}

impl Dataset {
    pub fn load(paths: &DataPaths) -> Result<Self> {
        let hotspots = load_records(&paths.hotspots)?;
        let air_samples = load_records(&paths.air)?;
        let accidents = load_records(&paths.accidents)?;
        let map_config = load_object(&paths.map_config)?;
        let secrets = load_object(&paths.secrets)?;

        let dataset = Self {
            hotspots,
            air_samples,
            accidents,
            map_config,
            secrets,
        };
        info!(
            hotspots = dataset.hotspots.len(),
            air_samples = dataset.air_samples.len(),
            accidents = dataset.accidents.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Total number of hotspots, shown on the wifi layer.
    pub fn wifi_count(&self) -> usize {
        self.hotspots.len()
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::data_load(path, format!("cannot read file: {e}")))?;
    serde_json::from_str(&content).map_err(|e| Error::data_load(path, e.to_string()))
}

fn load_object<T: DeserializeOwned>(path: &Path) -> Result<T> {
    serde_json::from_value(read_json(path)?).map_err(|e| Error::data_load(path, e.to_string()))
}

/// Loads a JSON array, skipping elements that do not parse as `T`.
fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let serde_json::Value::Array(items) = read_json(path)? else {
        return Err(Error::data_load(path, "expected a JSON array"));
    };

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %path.display(), index = i, error = %e, "skipping malformed record");
                None
            }
        })
        .collect();

    if records.len() < total {
        warn!(
            path = %path.display(),
            skipped = total - records.len(),
            "some records could not be parsed"
        );
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AccidentCategory;
    use std::path::PathBuf;

    struct Fixture {
        dir: PathBuf,
    }

    impl Fixture {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("citymap-{name}-{}", std::process::id()));
            fs::create_dir_all(&dir).unwrap();
            Self { dir }
        }

        fn write(&self, file: &str, content: &str) -> PathBuf {
            let path = self.dir.join(file);
            fs::write(&path, content).unwrap();
            path
        }

        fn paths(&self) -> DataPaths {
            DataPaths {
                hotspots: self.write("wifi.json", r#"[{"lat": 48.2, "lng": 16.37}, {"lat": "48.21", "lng": "16.38"}]"#),
                air: self.write("aqi.json", r#"[{"lat": "48.2", "lon": "16.3", "pm10": "40", "o3": "61"}]"#),
                accidents: self.write(
                    "accidents.json",
                    r#"[{"lat": "48.2", "lng": "16.37", "category": "1"},
                        {"lat": "x", "lng": "16.37", "category": "2"},
                        {"lat": "48.2", "lng": "16.37", "category": "7"}]"#,
                ),
                map_config: self.write(
                    "config.json",
                    r#"{"lat": 48.2082, "lng": 16.3738, "selectedLayer": "wifi",
                        "modeOfTransport": "walk", "defaultLocation": ", Wien"}"#,
                ),
                secrets: self.write("secrets.json", r#"{"mapsApiKey": "test-key"}"#),
            }
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn test_load_skips_malformed_records() {
        let fixture = Fixture::new("load");
        let dataset = Dataset::load(&fixture.paths()).unwrap();

        assert_eq!(dataset.wifi_count(), 2);
        assert_eq!(dataset.air_samples.len(), 1);
        assert_eq!(dataset.accidents.len(), 1);
        assert_eq!(dataset.accidents[0].category, AccidentCategory::Fatal);
        assert_eq!(dataset.map_config.default_location, ", Wien");
        assert_eq!(dataset.secrets.maps_api_key, "test-key");
    }

    #[test]
    fn test_load_rejects_non_array() {
        let fixture = Fixture::new("nonarray");
        let mut paths = fixture.paths();
        paths.hotspots = fixture.write("wifi.json", r#"{"lat": 1}"#);
        let err = Dataset::load(&paths).unwrap_err();
        assert!(err.to_string().contains("expected a JSON array"));
    }

    #[test]
    fn test_load_missing_file() {
        let fixture = Fixture::new("missing");
        let mut paths = fixture.paths();
        paths.air = fixture.dir.join("nope.json");
        assert!(matches!(Dataset::load(&paths), Err(Error::DataLoad { .. })));
    }
}
