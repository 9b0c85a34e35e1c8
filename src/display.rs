use serde::Serialize;

use crate::model::{AirSample, Layer};

/// Which overlays and panels are visible. Always derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub wifi_layer_active: bool,
    pub safety_layer_active: bool,
    pub accessibility_layer_active: bool,
    pub air_layer_active: bool,
    pub poi_layer_active: bool,
    pub route_active: bool,
    pub place_active: bool,
    pub pm25_active: bool,
    pub pm10_active: bool,
    pub pm1_active: bool,
    pub o3_active: bool,
    pub no2_active: bool,
}

impl DisplayState {
    pub fn compute(
        layer: Layer,
        has_route: bool,
        has_place: bool,
        inspected: Option<&AirSample>,
    ) -> Self {
        let has = |field: fn(&AirSample) -> bool| inspected.is_some_and(field);

        Self {
            wifi_layer_active: layer == Layer::Wifi,
            safety_layer_active: layer == Layer::Safety,
            accessibility_layer_active: layer == Layer::Accessibility,
            air_layer_active: layer == Layer::Air,
            poi_layer_active: layer == Layer::Poi,
            route_active: has_route,
            place_active: has_place,
            pm25_active: has(|s| s.pm25.is_some()),
            pm10_active: inspected.is_some(),
            pm1_active: has(|s| s.pm1.is_some()),
            o3_active: has(|s| s.o3.is_some()),
            no2_active: has(|s| s.no2.is_some()),
        }
    }
}
