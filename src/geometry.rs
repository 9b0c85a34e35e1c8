//! Local geometry used by the map service: polyline codec, great-circle
//! distance and the "is this point on the path" test.

use geo::prelude::*;
use geo::{Line, Point};
use itertools::Itertools;

use crate::error::{Error, Result};
use crate::model::Coordinate;

/// Google polyline precision (5 decimal places).
const POLYLINE_FACTOR: f64 = 1e5;

/// Decodes a Google encoded polyline into coordinates.
///
/// # Errors
///
/// Returns [`Error::InvalidPolyline`] for characters outside the encoding
/// alphabet or a chunk that ends mid-value.
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut path = Vec::new();

    while index < bytes.len() {
        lat = accumulate(lat, next_value(bytes, &mut index)?, index)?;
        lng = accumulate(lng, next_value(bytes, &mut index)?, index)?;
        path.push(Coordinate::new(
            lat as f64 / POLYLINE_FACTOR,
            lng as f64 / POLYLINE_FACTOR,
        ));
    }

    Ok(path)
}

fn accumulate(total: i64, delta: i64, offset: usize) -> Result<i64> {
    total.checked_add(delta).ok_or_else(|| Error::InvalidPolyline {
        message: format!("coordinate out of range at offset {offset}"),
    })
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(Error::InvalidPolyline {
                message: format!("truncated value at offset {}", *index),
            });
        };
        if !(63..=126).contains(&byte) || shift > 60 {
            return Err(Error::InvalidPolyline {
                message: format!("unexpected byte {byte:#x} at offset {}", *index),
            });
        }
        *index += 1;

        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 == 1 { !(result >> 1) } else { result >> 1 })
}

/// Encodes coordinates with the Google polyline algorithm.
pub fn encode_polyline(path: &[Coordinate]) -> String {
    let mut out = String::new();
    let mut prev_lat = 0;
    let mut prev_lng = 0;

    for c in path {
        let lat = (c.lat * POLYLINE_FACTOR).round() as i64;
        let lng = (c.lng * POLYLINE_FACTOR).round() as i64;
        push_value(&mut out, lat - prev_lat);
        push_value(&mut out, lng - prev_lng);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn push_value(out: &mut String, value: i64) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        out.push(char::from((0x20 | (v & 0x1f)) as u8 + 63));
        v >>= 5;
    }
    out.push(char::from(v as u8 + 63));
}

/// Great-circle distance in meters.
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    Point::from(a).haversine_distance(&Point::from(b))
}

/// Whether `location` lies within `tolerance` degrees of `path`.
///
/// The distance is planar in lat/lng space, the same test the mapping
/// library applies to non-geodesic polylines.
pub fn is_location_on_edge(location: Coordinate, path: &[Coordinate], tolerance: f64) -> bool {
    let point = Point::from(location);

    match path {
        [] => false,
        [only] => point.euclidean_distance(&Point::from(*only)) <= tolerance,
        _ => path.iter().tuple_windows().any(|(&a, &b)| {
            let segment = Line::new(Point::from(a), Point::from(b));
            point.euclidean_distance(&segment) <= tolerance
        }),
    }
}
