//! Distance-window visibility filtering and render scaling.

use crate::geo::poi::PointOfInterest;
use crate::geo::position::GeoPosition;
use crate::geo::projection::{great_circle_distance, project_to_local_frame, LocalOffset};

/// Render scale bounds; nearer points render larger, capped both ways.
const MIN_SCALE: f64 = 0.5;
const MAX_SCALE: f64 = 2.0;

/// A point of interest placed in the local frame for the current fix.
/// Derived and ephemeral: rebuilt in full on every position update.
#[derive(Debug, Clone)]
pub struct ProjectedPoint {
    pub point: PointOfInterest,
    pub offset: LocalOffset,
    /// Great-circle distance from the current origin, in meters.
    pub distance: f64,
    pub scale: f64,
}

/// Project every point within the distance window. A point is visible iff
/// `min_distance <= distance <= max_distance`; everything else is excluded
/// from the output entirely, not hidden.
pub fn filter_visible(
    origin: &GeoPosition,
    points: &[PointOfInterest],
    min_distance: f64,
    max_distance: f64,
) -> Vec<ProjectedPoint> {
    points
        .iter()
        .filter_map(|point| {
            let distance = great_circle_distance(
                origin.latitude,
                origin.longitude,
                point.latitude,
                point.longitude,
            );
            if !(min_distance..=max_distance).contains(&distance) {
                return None;
            }

            let offset =
                project_to_local_frame(origin, point.latitude, point.longitude, point.altitude);
            let scale = ((max_distance - distance) / max_distance).clamp(MIN_SCALE, MAX_SCALE);

            Some(ProjectedPoint {
                point: point.clone(),
                offset,
                distance,
                scale,
            })
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::poi::Category;
    use crate::geo::projection::EARTH_RADIUS_M;

    fn origin() -> GeoPosition {
        GeoPosition::new(40.7128, -74.0060)
    }

    /// A point due north of the origin at (near-exactly) the given
    /// great-circle distance: for a pure latitude offset the haversine
    /// reduces to arc length.
    fn point_at(id: i64, origin: &GeoPosition, meters: f64) -> PointOfInterest {
        let d_lat = (meters / EARTH_RADIUS_M).to_degrees();
        PointOfInterest {
            id,
            name: format!("point-{}", id),
            description: String::new(),
            latitude: origin.latitude + d_lat,
            longitude: origin.longitude,
            altitude: 0.0,
            category: Category::Poi,
            icon: String::new(),
        }
    }

    #[test]
    fn test_distance_window() {
        let origin = origin();
        let points = vec![
            point_at(1, &origin, 5.0),
            point_at(2, &origin, 500.0),
            point_at(3, &origin, 1500.0),
        ];

        let visible = filter_visible(&origin, &points, 10.0, 1000.0);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].point.id, 2);
        assert!((visible[0].distance - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_midrange_scale_is_exact() {
        let origin = origin();
        let points = vec![point_at(1, &origin, 500.0)];

        let visible = filter_visible(&origin, &points, 10.0, 1000.0);
        assert!((visible[0].scale - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_scale_clamps_near_and_far() {
        let origin = origin();
        // 900 m out: raw (1000-900)/1000 = 0.1, clamped up to 0.5.
        let far = filter_visible(&origin, &[point_at(1, &origin, 900.0)], 10.0, 1000.0);
        assert!((far[0].scale - 0.5).abs() < 1e-9);

        // 50 m out: raw 0.95, within bounds.
        let near = filter_visible(&origin, &[point_at(2, &origin, 50.0)], 10.0, 1000.0);
        assert!((near[0].scale - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let origin = origin();
        let point = point_at(1, &origin, 500.0);
        let d = great_circle_distance(
            origin.latitude,
            origin.longitude,
            point.latitude,
            point.longitude,
        );

        // A point exactly on either bound is visible.
        assert_eq!(filter_visible(&origin, &[point.clone()], d, 1000.0).len(), 1);
        assert_eq!(filter_visible(&origin, &[point], 0.0, d).len(), 1);
    }

    #[test]
    fn test_projection_carried_into_output() {
        let origin = origin();
        let visible = filter_visible(&origin, &[point_at(1, &origin, 500.0)], 10.0, 1000.0);
        // Due north: -Z, no east component.
        assert!(visible[0].offset.z < 0.0);
        assert!(visible[0].offset.x.abs() < 1e-6);
    }
}
