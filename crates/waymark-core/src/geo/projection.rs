//! Great-circle distance and the local tangent-plane projection.
//!
//! The projection is a local equirectangular approximation with a single
//! `cos(origin latitude)` correction, valid for spans small relative to
//! Earth's radius (tens of kilometers).

use crate::geo::position::GeoPosition;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two coordinates, in meters.
pub fn great_circle_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Offset in meters within the render frame: +X east, +Y up, +Z toward the
/// viewer, so true north maps to -Z ("into the screen").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalOffset {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Project a target coordinate into the local frame centered on `origin`.
pub fn project_to_local_frame(
    origin: &GeoPosition,
    latitude: f64,
    longitude: f64,
    altitude: f64,
) -> LocalOffset {
    let d_lat = (latitude - origin.latitude).to_radians();
    let d_lng = (longitude - origin.longitude).to_radians();

    LocalOffset {
        x: d_lng * EARTH_RADIUS_M * origin.latitude.to_radians().cos(),
        y: altitude - origin.altitude,
        z: -d_lat * EARTH_RADIUS_M,
    }
}

// ============================================================================
// Tests
// ============================================================================
