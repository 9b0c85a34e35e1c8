//! Per-user map state: selection, view and the current query's annotations.
//!
//! Every route or place query clears the previous annotations before it is
//! sent. Each query is tagged with a generation number; a result whose
//! generation is no longer the latest is discarded, so the last request
//! issued wins even if an older response arrives later.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::data::Dataset;
use crate::display::DisplayState;
use crate::error::{Error, GeocodeError, Result};
use crate::model::{AirSample, Coordinate, Layer, TravelMode};
use crate::overlay::{CircleMarker, PlaceMarker};
use crate::proximity::{self, AccidentTally, ProximityMatches};
use crate::service::{GeocodeResult, MapService, RouteResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    pub center: Coordinate,
    pub zoom: u8,
}

/// What happened to a completed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOutcome {
    /// Results were applied to the session.
    Applied,
    /// A newer query was issued meanwhile; results were dropped.
    Stale,
    /// The map service could not resolve the query; nothing was added.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub path: Vec<Coordinate>,
    pub distance_m: f64,
    pub distance_text: String,
    pub duration_text: String,
    pub safety_score: f64,
}

/// Derived state of the latest query. Replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Annotations {
    pub route: Option<RouteSummary>,
    pub place: Option<PlaceMarker>,
    pub matches: ProximityMatches,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteQuery {
    pub generation: u64,
    pub origin: String,
    pub destination: String,
    pub mode: TravelMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceQuery {
    pub generation: u64,
    pub address: String,
}

/// Values shown in the statistics panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    #[serde(flatten)]
    pub accidents: AccidentTally,
    pub wifi_nearby: usize,
    pub wifi_total: usize,
    pub route_distance: Option<String>,
    pub route_duration: Option<String>,
    pub route_safety: Option<f64>,
}

/// Everything a front end needs to draw the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub view: MapView,
    pub selected_layer: Layer,
    pub travel_mode: TravelMode,
    pub display: DisplayState,
    pub statistics: Statistics,
    pub route: Option<RouteSummary>,
    pub place: Option<PlaceMarker>,
    pub accident_markers: Vec<CircleMarker>,
    pub wifi_markers: Vec<CircleMarker>,
    pub inspected_air: Option<AirSample>,
}

pub struct MapSession {
    dataset: Arc<Dataset>,
    config: Arc<AppConfig>,
    service: Arc<dyn MapService>,
    selected_layer: Layer,
    travel_mode: TravelMode,
    inspected_air: Option<AirSample>,
    view: MapView,
    annotations: Annotations,
    generation: u64,
}

impl MapSession {
    pub fn new(dataset: Arc<Dataset>, config: Arc<AppConfig>, service: Arc<dyn MapService>) -> Self {
        let map_config = &dataset.map_config;
        Self {
            selected_layer: map_config.selected_layer,
            travel_mode: map_config.mode_of_transport,
            inspected_air: map_config.selected_air.clone(),
            view: MapView {
                center: map_config.center(),
                zoom: config.view.zoom,
            },
            annotations: Annotations::default(),
            generation: 0,
            dataset,
            config,
            service,
        }
    }

    pub fn service(&self) -> Arc<dyn MapService> {
        Arc::clone(&self.service)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn selected_layer(&self) -> Layer {
        self.selected_layer
    }

    pub fn travel_mode(&self) -> TravelMode {
        self.travel_mode
    }

    pub fn view(&self) -> MapView {
        self.view
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn inspected_air(&self) -> Option<&AirSample> {
        self.inspected_air.as_ref()
    }

    pub fn select_layer(&mut self, layer: Layer) {
        debug!(%layer, "layer selected");
        self.selected_layer = layer;
    }

    pub fn select_travel_mode(&mut self, mode: TravelMode) {
        debug!(%mode, "travel mode selected");
        self.travel_mode = mode;
    }

    /// Inspect the air sample at `index`, as when its circle is clicked.
    pub fn select_air_sample(&mut self, index: usize) -> Result<&AirSample> {
        let sample = self
            .dataset
            .air_samples
            .get(index)
            .ok_or(Error::UnknownAirSample(index))?;
        Ok(self.inspected_air.insert(sample.clone()))
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState::compute(
            self.selected_layer,
            self.annotations.route.is_some(),
            self.annotations.place.is_some(),
            self.inspected_air.as_ref(),
        )
    }

    /// Drop every marker, the route and the place pin, and zero all counts.
    pub fn clear(&mut self) {
        if self.annotations.place.is_some() {
            self.view.zoom = self.config.view.zoom;
        }
        self.annotations = Annotations::default();
    }

    /// Validate and issue a route query, clearing the previous annotations.
    pub fn begin_route(&mut self, start: &str, destination: &str) -> Result<RouteQuery> {
        let start = required("start", start)?;
        let destination = required("destination", destination)?;
        let suffix = &self.dataset.map_config.default_location;
        let origin = with_suffix(start, suffix, "");
        let destination = with_suffix(destination, suffix, "");

        self.clear();
        self.generation += 1;
        Ok(RouteQuery {
            generation: self.generation,
            origin,
            destination,
            mode: self.travel_mode,
        })
    }

    /// Validate and issue a place query. Switches to the point-of-interest layer.
    pub fn begin_place(&mut self, place: &str) -> Result<PlaceQuery> {
        let place = required("place", place)?;
        let address = with_suffix(place, &self.dataset.map_config.default_location, " ");

        self.clear();
        self.selected_layer = Layer::Poi;
        self.generation += 1;
        Ok(PlaceQuery {
            generation: self.generation,
            address,
        })
    }

    pub fn complete_route(
        &mut self,
        generation: u64,
        result: std::result::Result<RouteResult, GeocodeError>,
    ) -> QueryOutcome {
        if generation != self.generation {
            debug!(generation, latest = self.generation, "dropping stale route result");
            return QueryOutcome::Stale;
        }
        let route = match result {
            Ok(route) => route,
            Err(e) => {
                debug!(error = %e, "route not resolved");
                return QueryOutcome::Unresolved;
            }
        };
        let path = match self.service.decode_path(&route.encoded_polyline) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "route polyline could not be decoded");
                return QueryOutcome::Unresolved;
            }
        };

        let annotation = proximity::annotate_route(
            self.service.as_ref(),
            &self.dataset,
            &path,
            route.distance_m,
            &self.config.thresholds,
            self.config.view.wifi_radius_m,
        );
        info!(
            distance = %route.distance_text,
            duration = %route.duration_text,
            safety_score = annotation.safety_score,
            "route displayed"
        );

        self.annotations = Annotations {
            route: Some(RouteSummary {
                path,
                distance_m: route.distance_m,
                distance_text: route.distance_text,
                duration_text: route.duration_text,
                safety_score: annotation.safety_score,
            }),
            place: None,
            matches: annotation.matches,
        };
        QueryOutcome::Applied
    }

    pub fn complete_place(
        &mut self,
        generation: u64,
        result: std::result::Result<GeocodeResult, GeocodeError>,
    ) -> QueryOutcome {
        if generation != self.generation {
            debug!(generation, latest = self.generation, "dropping stale place result");
            return QueryOutcome::Stale;
        }
        let place = match result {
            Ok(place) => place,
            Err(e) => {
                debug!(error = %e, "place not resolved");
                return QueryOutcome::Unresolved;
            }
        };

        let matches = proximity::annotate_place(
            self.service.as_ref(),
            &self.dataset,
            place.location,
            &self.config.thresholds,
            self.config.view.wifi_radius_m,
        );
        info!(address = %place.formatted_address, "place displayed");

        self.view = MapView {
            center: place.location,
            zoom: self.config.view.place_zoom,
        };
        self.annotations = Annotations {
            route: None,
            place: Some(PlaceMarker {
                position: place.location,
                title: place.formatted_address,
            }),
            matches,
        };
        QueryOutcome::Applied
    }

    /// Run a route query end to end while holding the session exclusively.
    pub async fn display_route(&mut self, start: &str, destination: &str) -> Result<QueryOutcome> {
        let query = self.begin_route(start, destination)?;
        let result = self
            .service
            .route(&query.origin, &query.destination, query.mode)
            .await;
        Ok(self.complete_route(query.generation, result))
    }

    /// Run a place query end to end while holding the session exclusively.
    pub async fn show_place_pois(&mut self, place: &str) -> Result<QueryOutcome> {
        let query = self.begin_place(place)?;
        let result = self.service.geocode(&query.address).await;
        Ok(self.complete_place(query.generation, result))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let a = &self.annotations;
        let route = a.route.as_ref();
        SessionSnapshot {
            view: self.view,
            selected_layer: self.selected_layer,
            travel_mode: self.travel_mode,
            display: self.display_state(),
            statistics: Statistics {
                accidents: a.matches.accidents,
                wifi_nearby: a.matches.wifi_count,
                wifi_total: self.dataset.wifi_count(),
                route_distance: route.map(|r| r.distance_text.clone()),
                route_duration: route.map(|r| r.duration_text.clone()),
                route_safety: route.map(|r| r.safety_score),
            },
            route: a.route.clone(),
            place: a.place.clone(),
            accident_markers: a.matches.accident_markers.clone(),
            wifi_markers: a.matches.wifi_markers.clone(),
            inspected_air: self.inspected_air.clone(),
        }
    }
}

/// A session shared between concurrent request handlers.
///
/// The lock is held to begin and to complete a query, never across the
/// call to the map service.
#[derive(Clone)]
pub struct SharedSession(Arc<Mutex<MapSession>>);

impl SharedSession {
    pub fn new(session: MapSession) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    pub async fn lock(&self) -> MutexGuard<'_, MapSession> {
        self.0.lock().await
    }

    pub async fn display_route(&self, start: &str, destination: &str) -> Result<QueryOutcome> {
        let (query, service) = {
            let mut session = self.lock().await;
            (session.begin_route(start, destination)?, session.service())
        };
        let result = service
            .route(&query.origin, &query.destination, query.mode)
            .await;
        Ok(self.lock().await.complete_route(query.generation, result))
    }

    pub async fn show_place_pois(&self, place: &str) -> Result<QueryOutcome> {
        let (query, service) = {
            let mut session = self.lock().await;
            (session.begin_place(place)?, session.service())
        };
        let result = service.geocode(&query.address).await;
        Ok(self.lock().await.complete_place(query.generation, result))
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::MissingField(field));
    }
    Ok(trimmed)
}

/// Appends the default location unless the query already mentions it.
fn with_suffix(query: &str, suffix: &str, separator: &str) -> String {
    if query.contains(suffix) {
        query.to_string()
    } else {
        format!("{query}{separator}{suffix}")
    }
}
