//! Device position fixes, orientation samples, and sensor error categories.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One GPS fix. Replaced wholesale on every sensor update, never partially
/// updated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy: f64,
    /// Altitude in meters; sensors without an altitude channel report 0.
    pub altitude: f64,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: 0.0,
            altitude: 0.0,
        }
    }
}

/// Substitute origin used when no real fix has ever been obtained, so the
/// system still produces a renderable point set.
pub const FALLBACK_ORIGIN: GeoPosition = GeoPosition {
    latitude: 40.7128,
    longitude: -74.0060,
    accuracy: 10.0,
    altitude: 0.0,
};

/// Device orientation sample in degrees: compass heading, pitch, roll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

/// Why the positioning collaborator could not deliver a fix.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    Unavailable,

    #[error("timed out waiting for a position fix")]
    Timeout,
}

impl PositionError {
    /// Human-readable category string for status displays.
    pub fn category(&self) -> &'static str {
        match self {
            PositionError::PermissionDenied => "permission denied",
            PositionError::Unavailable => "unavailable",
            PositionError::Timeout => "timeout",
        }
    }
}
