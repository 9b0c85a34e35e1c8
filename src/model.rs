use std::fmt;
use std::str::FromStr;

use geo::Point;
use serde::{Deserialize, Deserializer, Serialize};

/// A WGS84 position. `geo` points are (x = lng, y = lat).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(deserialize_with = "lenient_f64")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(c: Coordinate) -> Self {
        Point::new(c.lng, c.lat)
    }
}

impl From<Point<f64>> for Coordinate {
    fn from(p: Point<f64>) -> Self {
        Coordinate::new(p.y(), p.x())
    }
}

/// A fixed-location wireless access point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    #[serde(deserialize_with = "lenient_f64")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub lng: f64,
}

impl Hotspot {
    pub fn location(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// One air-quality sensor reading. Only `pm10` is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirSample {
    #[serde(deserialize_with = "lenient_f64")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub lon: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub pm10: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub o3: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub no2: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub pm25: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub pm1: Option<f64>,
}

impl AirSample {
    pub fn location(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    /// Worst pollutant value; missing ozone / nitrogen dioxide count as 0.
    pub fn severity(&self) -> f64 {
        self.pm10
            .max(self.o3.unwrap_or(0.0))
            .max(self.no2.unwrap_or(0.0))
    }
}

/// Accident severity. The discriminant is the category number in the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "NumberOrString", into = "u8")]
pub enum AccidentCategory {
    Fatal = 1,
    SevereInjury = 2,
    LightInjury = 3,
}

impl AccidentCategory {
    /// Safety penalty: `4 - category`, so fatal accidents weigh the most.
    pub fn penalty(self) -> u32 {
        4 - self as u32
    }
}

impl From<AccidentCategory> for u8 {
    fn from(c: AccidentCategory) -> Self {
        c as u8
    }
}

impl TryFrom<i64> for AccidentCategory {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Fatal),
            2 => Ok(Self::SevereInjury),
            3 => Ok(Self::LightInjury),
            other => Err(format!("unknown accident category {other}")),
        }
    }
}

impl TryFrom<NumberOrString> for AccidentCategory {
    type Error = String;

    fn try_from(value: NumberOrString) -> Result<Self, Self::Error> {
        let n = value.as_f64().ok_or("accident category is not a number")?;
        if n.fract() != 0.0 {
            return Err(format!("accident category {n} is not an integer"));
        }
        Self::try_from(n as i64)
    }
}

/// A geolocated traffic incident.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccidentRecord {
    #[serde(deserialize_with = "lenient_f64")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub lng: f64,
    pub category: AccidentCategory,
}

impl AccidentRecord {
    pub fn location(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// The mutually exclusive overlays the map shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    #[default]
    Wifi,
    Safety,
    Accessibility,
    Air,
    Poi,
}

impl Layer {
    pub const ALL: [Layer; 5] = [
        Layer::Wifi,
        Layer::Safety,
        Layer::Accessibility,
        Layer::Air,
        Layer::Poi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Wifi => "wifi",
            Layer::Safety => "safety",
            Layer::Accessibility => "accessibility",
            Layer::Air => "air",
            Layer::Poi => "poi",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Walk,
    Bike,
    Car,
}

impl TravelMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TravelMode::Walk => "walk",
            TravelMode::Bike => "bike",
            TravelMode::Car => "car",
        }
    }

    /// Mode name understood by the directions service.
    pub fn service_mode(self) -> &'static str {
        match self {
            TravelMode::Walk => "walking",
            TravelMode::Bike => "bicycling",
            TravelMode::Car => "driving",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "walk" => Ok(TravelMode::Walk),
            "bike" => Ok(TravelMode::Bike),
            "car" => Ok(TravelMode::Car),
            other => Err(format!("unknown travel mode '{other}'")),
        }
    }
}

/// Startup configuration record shipped next to the datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    #[serde(rename = "lat", deserialize_with = "lenient_f64")]
    pub center_lat: f64,
    #[serde(rename = "lng", deserialize_with = "lenient_f64")]
    pub center_lng: f64,
    #[serde(default)]
    pub selected_layer: Layer,
    #[serde(rename = "selectedAQI", default)]
    pub selected_air: Option<AirSample>,
    #[serde(default)]
    pub mode_of_transport: TravelMode,
    /// Appended to queries that do not already mention it, e.g. ", Vienna".
    #[serde(default)]
    pub default_location: String,
}

impl MapConfig {
    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.center_lat, self.center_lng)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secrets {
    #[serde(default)]
    pub maps_api_key: String,
}

/// Numeric fields in the shipped data are a mix of JSON numbers and strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrString::Number(n) => Some(*n),
            NumberOrString::String(s) => s.trim().parse().ok(),
        }
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = NumberOrString::deserialize(deserializer)?;
    value
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| serde::de::Error::custom(format!("expected a number, got {value:?}")))
}

/// Absent, null, empty or unparseable values all read as `None`.
fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n: &f64| n.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_penalty_per_category() {
        assert_eq!(AccidentCategory::Fatal.penalty(), 3);
        assert_eq!(AccidentCategory::SevereInjury.penalty(), 2);
        assert_eq!(AccidentCategory::LightInjury.penalty(), 1);
    }

    #[test]
    fn test_accident_from_strings() {
        let record: AccidentRecord =
            serde_json::from_value(json!({"lat": "48.2", "lng": "16.37", "category": "2"}))
                .unwrap();
        assert_eq!(record.category, AccidentCategory::SevereInjury);
        assert_eq!(record.location(), Coordinate::new(48.2, 16.37));
    }

    #[test]
    fn test_accident_rejects_unknown_category() {
        let result: Result<AccidentRecord, _> =
            serde_json::from_value(json!({"lat": 1.0, "lng": 2.0, "category": 4}));
        assert!(result.is_err());
    }

    #[test]
    fn test_air_sample_missing_pollutants_read_as_zero() {
        let sample: AirSample =
            serde_json::from_value(json!({"lat": "48.2", "lon": "16.3", "pm10": "42"})).unwrap();
        assert_eq!(sample.o3, None);
        assert_eq!(sample.no2, None);
        assert_eq!(sample.severity(), 42.0);
    }

    #[test]
    fn test_air_sample_malformed_optional_is_none() {
        let sample: AirSample = serde_json::from_value(
            json!({"lat": 0, "lon": 0, "pm10": 10, "o3": "", "no2": "n/a", "pm25": null}),
        )
        .unwrap();
        assert_eq!(sample.o3, None);
        assert_eq!(sample.no2, None);
        assert_eq!(sample.pm25, None);
        assert_eq!(sample.severity(), 10.0);
    }

    #[test]
    fn test_air_sample_severity_is_max() {
        let sample: AirSample = serde_json::from_value(
            json!({"lat": 0, "lon": 0, "pm10": "30", "o3": "120", "no2": "80"}),
        )
        .unwrap();
        assert_eq!(sample.severity(), 120.0);
    }

    #[test]
    fn test_layer_and_mode_parse() {
        assert_eq!(serde_json::from_value::<Layer>(json!("air")).unwrap(), Layer::Air);
        assert!(serde_json::from_value::<Layer>(json!("traffic")).is_err());
        assert_eq!("bike".parse::<TravelMode>().unwrap(), TravelMode::Bike);
        assert_eq!(TravelMode::Car.service_mode(), "driving");
        assert_eq!(TravelMode::Walk.service_mode(), "walking");
    }

    #[test]
    fn test_map_config_from_json() {
        let config: MapConfig = serde_json::from_value(json!({
            "lat": 48.2082,
            "lng": 16.3738,
            "selectedLayer": "safety",
            "selectedAQI": null,
            "modeOfTransport": "bike",
            "defaultLocation": ", Wien"
        }))
        .unwrap();
        assert_eq!(config.selected_layer, Layer::Safety);
        assert_eq!(config.mode_of_transport, TravelMode::Bike);
        assert_eq!(config.selected_air, None);
        assert_eq!(config.center(), Coordinate::new(48.2082, 16.3738));
    }

    #[test]
    fn test_point_conversion_order() {
        let p: Point<f64> = Coordinate::new(48.0, 16.0).into();
        assert_eq!(p.x(), 16.0);
        assert_eq!(p.y(), 48.0);
        assert_eq!(Coordinate::from(p), Coordinate::new(48.0, 16.0));
    }
}
