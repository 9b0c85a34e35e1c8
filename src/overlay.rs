//! Markers drawn on top of the base map.

use serde::Serialize;

use crate::air::AirQualityBand;
use crate::data::Dataset;
use crate::model::{AccidentCategory, Coordinate};

const ACCIDENT_RADIUS_M: f64 = 10.0;
const AIR_RADIUS_M: f64 = 625.0;
const WIFI_COLOR: &str = "deepskyblue";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleMarker {
    pub center: Coordinate,
    pub radius_m: f64,
    pub stroke_color: &'static str,
    pub stroke_opacity: f64,
    pub stroke_weight: u8,
    pub fill_color: &'static str,
    pub fill_opacity: f64,
}

impl CircleMarker {
    fn new(center: Coordinate, radius_m: f64, color: &'static str, stroke_opacity: f64) -> Self {
        Self {
            center,
            radius_m,
            stroke_color: color,
            stroke_opacity,
            stroke_weight: 2,
            fill_color: color,
            fill_opacity: 0.35,
        }
    }

    pub fn accident(center: Coordinate, category: AccidentCategory) -> Self {
        let color = match category {
            AccidentCategory::Fatal => "red",
            AccidentCategory::SevereInjury => "orangered",
            AccidentCategory::LightInjury => "orange",
        };
        Self::new(center, ACCIDENT_RADIUS_M, color, 0.8)
    }

    pub fn wifi(center: Coordinate, radius_m: f64) -> Self {
        Self::new(center, radius_m, WIFI_COLOR, 0.5)
    }
}

/// The pin dropped on a geocoded place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceMarker {
    pub position: Coordinate,
    pub title: String,
}

/// A clickable air-quality circle; `sample` indexes `Dataset::air_samples`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirMarker {
    pub sample: usize,
    pub band: AirQualityBand,
    pub circle: CircleMarker,
}

/// Every hotspot as a wifi circle.
pub fn wifi_layer(dataset: &Dataset, radius_m: f64) -> Vec<CircleMarker> {
    dataset
        .hotspots
        .iter()
        .map(|h| CircleMarker::wifi(h.location(), radius_m))
        .collect()
}

/// Every air sample as a circle colored by its band.
pub fn air_layer(dataset: &Dataset) -> Vec<AirMarker> {
    dataset
        .air_samples
        .iter()
        .enumerate()
        .map(|(sample, s)| {
            let band = s.band();
            AirMarker {
                sample,
                band,
                circle: CircleMarker::new(s.location(), AIR_RADIUS_M, band.color(), 0.8),
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{AirSample, Hotspot, MapConfig, Secrets};

    pub(crate) fn sample_dataset() -> Dataset {
        Dataset {
            hotspots: vec![Hotspot { lat: 48.2, lng: 16.37 }],
            air_samples: vec![
                AirSample {
                    lat: 48.1,
                    lon: 16.3,
                    pm10: 20.0,
                    o3: None,
                    no2: Some(130.0),
                    pm25: Some(12.0),
                    pm1: None,
                },
                AirSample {
                    lat: 48.3,
                    lon: 16.4,
                    pm10: 450.0,
                    o3: None,
                    no2: None,
                    pm25: None,
                    pm1: None,
                },
            ],
            accidents: vec![],
            map_config: MapConfig {
                center_lat: 48.2082,
                center_lng: 16.3738,
                selected_layer: Default::default(),
                selected_air: None,
                mode_of_transport: Default::default(),
                default_location: ", Wien".to_string(),
            },
            secrets: Secrets::default(),
        }
    }

    #[test]
    fn test_accident_marker_colors() {
        let at = Coordinate::new(0.0, 0.0);
        assert_eq!(CircleMarker::accident(at, AccidentCategory::Fatal).fill_color, "red");
        assert_eq!(
            CircleMarker::accident(at, AccidentCategory::SevereInjury).stroke_color,
            "orangered"
        );
        let light = CircleMarker::accident(at, AccidentCategory::LightInjury);
        assert_eq!(light.fill_color, "orange");
        assert_eq!(light.radius_m, 10.0);
    }

    #[test]
    fn test_wifi_layer_uses_configured_radius() {
        let layer = wifi_layer(&sample_dataset(), 50.0);
        assert_eq!(layer.len(), 1);
        assert_eq!(layer[0].radius_m, 50.0);
        assert_eq!(layer[0].fill_color, "deepskyblue");
        assert_eq!(layer[0].stroke_opacity, 0.5);
    }

    #[test]
    fn test_air_layer_bands() {
        let layer = air_layer(&sample_dataset());
        assert_eq!(layer.len(), 2);
        assert_eq!(layer[0].band, AirQualityBand::Poor);
        assert_eq!(layer[0].circle.fill_color, "orange");
        assert_eq!(layer[1].band, AirQualityBand::Hazardous);
        assert_eq!(layer[1].sample, 1);
        assert_eq!(layer[1].circle.radius_m, 625.0);
    }
}
