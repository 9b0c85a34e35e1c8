//! Proximity filters: which accidents and hotspots are near a route or place.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Thresholds;
use crate::data::Dataset;
use crate::model::{AccidentCategory, Coordinate};
use crate::overlay::CircleMarker;
use crate::service::MapService;

/// Accident counts by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccidentTally {
    pub deaths: u32,
    pub severe_injuries: u32,
    pub light_injuries: u32,
}

impl AccidentTally {
    pub fn record(&mut self, category: AccidentCategory) {
        match category {
            AccidentCategory::Fatal => self.deaths += 1,
            AccidentCategory::SevereInjury => self.severe_injuries += 1,
            AccidentCategory::LightInjury => self.light_injuries += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.deaths + self.severe_injuries + self.light_injuries
    }
}

/// Everything found near one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProximityMatches {
    pub accidents: AccidentTally,
    /// Sum of `4 - category` over matched accidents.
    pub penalty: u32,
    pub wifi_count: usize,
    pub accident_markers: Vec<CircleMarker>,
    pub wifi_markers: Vec<CircleMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteAnnotation {
    pub matches: ProximityMatches,
    pub safety_score: f64,
}

/// Penalty per kilometer of route. Zero-length routes score 0.
pub fn safety_score(penalty: u32, length_m: f64) -> f64 {
    if length_m <= 0.0 || !length_m.is_finite() {
        if penalty > 0 {
            warn!(penalty, length_m, "route has no usable length, safety score set to 0");
        }
        return 0.0;
    }
    f64::from(penalty) * 1000.0 / length_m
}

fn scan(
    dataset: &Dataset,
    wifi_radius_m: f64,
    accident_near: impl Fn(Coordinate) -> bool,
    hotspot_near: impl Fn(Coordinate) -> bool,
) -> ProximityMatches {
    let mut matches = ProximityMatches::default();

    for accident in &dataset.accidents {
        let location = accident.location();
        if accident_near(location) {
            matches.accidents.record(accident.category);
            matches.penalty += accident.category.penalty();
            matches
                .accident_markers
                .push(CircleMarker::accident(location, accident.category));
        }
    }

    for hotspot in &dataset.hotspots {
        let location = hotspot.location();
        if hotspot_near(location) {
            matches.wifi_count += 1;
            matches
                .wifi_markers
                .push(CircleMarker::wifi(location, wifi_radius_m));
        }
    }

    matches
}

/// Annotates a decoded route path of `length_m` meters.
pub fn annotate_route(
    service: &dyn MapService,
    dataset: &Dataset,
    path: &[Coordinate],
    length_m: f64,
    thresholds: &Thresholds,
    wifi_radius_m: f64,
) -> RouteAnnotation {
    let matches = scan(
        dataset,
        wifi_radius_m,
        |location| service.is_location_on_edge(location, path, thresholds.route_accident_tolerance),
        |location| service.is_location_on_edge(location, path, thresholds.route_wifi_tolerance),
    );
    let safety_score = safety_score(matches.penalty, length_m);

    debug!(
        points = path.len(),
        accidents = matches.accidents.total(),
        wifi = matches.wifi_count,
        safety_score,
        "route annotated"
    );
    RouteAnnotation {
        matches,
        safety_score,
    }
}

/// Annotates everything within the place radius of `center`.
pub fn annotate_place(
    service: &dyn MapService,
    dataset: &Dataset,
    center: Coordinate,
    thresholds: &Thresholds,
    wifi_radius_m: f64,
) -> ProximityMatches {
    let within = |location: Coordinate| service.distance_between(location, center) <= thresholds.place_radius_m;
    let matches = scan(dataset, wifi_radius_m, within, within);

    debug!(
        accidents = matches.accidents.total(),
        wifi = matches.wifi_count,
        "place annotated"
    );
    matches
}
