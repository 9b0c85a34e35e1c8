//! The external mapping service: routing, geocoding and path geometry.
//!
//! [`MapService`] is the seam between the annotation logic and the network.
//! [`GoogleMapsService`] talks to the Directions and Geocoding JSON APIs;
//! tests swap in fakes.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::GeocodeError;
use crate::geometry;
use crate::model::{Coordinate, TravelMode};

/// First route returned by the directions service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResult {
    /// Overview path in encoded polyline form.
    pub encoded_polyline: String,
    /// Length of the first leg in meters.
    pub distance_m: f64,
    /// Human readable distance, as formatted by the service.
    pub distance_text: String,
    /// Human readable duration, as formatted by the service.
    pub duration_text: String,
}

/// First match returned by the geocoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeResult {
    pub location: Coordinate,
    pub formatted_address: String,
}

#[async_trait]
pub trait MapService: Send + Sync {
    /// Computes a route between two free-form place strings.
    async fn route(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<RouteResult, GeocodeError>;

    /// Resolves a free-form place string to a coordinate.
    async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeocodeError>;

    fn decode_path(&self, encoded: &str) -> crate::Result<Vec<Coordinate>> {
        geometry::decode_polyline(encoded)
    }

    /// Whether `location` lies within `tolerance` degrees of `path`.
    fn is_location_on_edge(&self, location: Coordinate, path: &[Coordinate], tolerance: f64) -> bool {
        geometry::is_location_on_edge(location, path, tolerance)
    }

    /// Great-circle distance in meters.
    fn distance_between(&self, a: Coordinate, b: Coordinate) -> f64 {
        geometry::haversine_distance(a, b)
    }
}

/// Google Maps web service client.
pub struct GoogleMapsService {
    client: reqwest::Client,
    directions_url: String,
    geocode_url: String,
    api_key: String,
}

impl GoogleMapsService {
    pub fn new(config: &ServiceConfig, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            directions_url: config.directions_url.clone(),
            geocode_url: config.geocode_url.clone(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl MapService for GoogleMapsService {
    async fn route(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<RouteResult, GeocodeError> {
        debug!(origin, destination, mode = %mode, "requesting directions");
        let body: serde_json::Value = self
            .client
            .get(&self.directions_url)
            .query(&[
                ("origin", origin),
                ("destination", destination),
                ("mode", mode.service_mode()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        parse_directions(&body)
    }

    async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        debug!(address, "geocoding");
        let body: serde_json::Value = self
            .client
            .get(&self.geocode_url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?
            .json()
            .await?;

        parse_geocode(&body)
    }
}

fn check_status(body: &serde_json::Value) -> Result<(), GeocodeError> {
    match body["status"].as_str() {
        Some("OK") => Ok(()),
        Some(status) => Err(GeocodeError::Status(status.to_string())),
        None => Err(GeocodeError::parse("response has no status")),
    }
}

/// An `OK` response with an empty list is reported like `ZERO_RESULTS`.
fn first_entry<'a>(
    body: &'a serde_json::Value,
    key: &str,
) -> Result<&'a serde_json::Value, GeocodeError> {
    body[key]
        .as_array()
        .and_then(|entries| entries.first())
        .ok_or_else(|| GeocodeError::Status("ZERO_RESULTS".to_string()))
}

fn parse_directions(body: &serde_json::Value) -> Result<RouteResult, GeocodeError> {
    check_status(body)?;

    let route = first_entry(body, "routes")?;
    let leg = &route["legs"][0];

    let encoded_polyline = route["overview_polyline"]["points"]
        .as_str()
        .ok_or_else(|| GeocodeError::parse("route has no overview polyline"))?
        .to_string();
    let distance_m = leg["distance"]["value"]
        .as_f64()
        .ok_or_else(|| GeocodeError::parse("route leg has no distance"))?;

    Ok(RouteResult {
        encoded_polyline,
        distance_m,
        distance_text: leg["distance"]["text"].as_str().unwrap_or_default().to_string(),
        duration_text: leg["duration"]["text"].as_str().unwrap_or_default().to_string(),
    })
}

fn parse_geocode(body: &serde_json::Value) -> Result<GeocodeResult, GeocodeError> {
    check_status(body)?;

    let first = first_entry(body, "results")?;
    let location = &first["geometry"]["location"];
    let (Some(lat), Some(lng)) = (location["lat"].as_f64(), location["lng"].as_f64()) else {
        return Err(GeocodeError::parse("geocode result has no location"));
    };

    Ok(GeocodeResult {
        location: Coordinate::new(lat, lng),
        formatted_address: first["formatted_address"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
    })
}
