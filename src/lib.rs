//! Map annotation service.
//!
//! Overlays static wifi hotspot, air quality and traffic accident datasets on
//! a map, and annotates routes and places with what lies near them: accident
//! counts by severity, a length-normalized safety score and nearby hotspots.
//! Routing and geocoding go through a [`service::MapService`].

pub mod air;
pub mod config;
pub mod data;
pub mod display;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod overlay;
pub mod proximity;
pub mod server;
pub mod service;
pub mod session;

pub use error::{Error, GeocodeError, Result};
