//! Geo projection and visibility filtering for location-anchored points.
//!
//! This module maintains a local tangent-plane coordinate system centered
//! on the device's current position and projects points of interest into
//! it for rendering. The render set is re-derived in full on every
//! position fix; before the first fix a fixed fallback origin keeps the
//! scene renderable.

pub mod filter;
pub mod poi;
pub mod position;
pub mod projection;
pub mod tracker;

pub use filter::{filter_visible, ProjectedPoint};
pub use poi::{Category, PointOfInterest};
pub use position::{GeoPosition, Orientation, PositionError, FALLBACK_ORIGIN};
pub use projection::{great_circle_distance, project_to_local_frame, LocalOffset, EARTH_RADIUS_M};
pub use tracker::{Frame, PoiScene, PoiTracker, RangeConfig, SensorEvent, SensorHandle};
