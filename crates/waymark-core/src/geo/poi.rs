//! Points of interest eligible for AR annotation.

use serde::{Deserialize, Serialize};

use crate::geo::position::GeoPosition;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Poi,
    Restaurant,
    Park,
    Museum,
    Other,
}

/// A named real-world location. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above the reference surface.
    pub altitude: f64,
    pub category: Category,
    pub icon: String,
}

impl PointOfInterest {
    /// The built-in demo set: four points placed a few hundred meters
    /// around the given origin.
    pub fn demo_set(origin: &GeoPosition) -> Vec<Self> {
        vec![
            Self {
                id: 1,
                name: "Overlook".to_string(),
                description: "Observation deck with a view over the district".to_string(),
                latitude: origin.latitude + 0.001,
                longitude: origin.longitude + 0.001,
                altitude: 10.0,
                category: Category::Poi,
                icon: "🏢".to_string(),
            },
            Self {
                id: 2,
                name: "Restaurant".to_string(),
                description: "Local restaurant".to_string(),
                latitude: origin.latitude - 0.0015,
                longitude: origin.longitude + 0.0008,
                altitude: 5.0,
                category: Category::Restaurant,
                icon: "🍽️".to_string(),
            },
            Self {
                id: 3,
                name: "Park".to_string(),
                description: "Quiet park two blocks away".to_string(),
                latitude: origin.latitude + 0.0008,
                longitude: origin.longitude - 0.0012,
                altitude: 0.0,
                category: Category::Park,
                icon: "🌳".to_string(),
            },
            Self {
                id: 4,
                name: "Museum".to_string(),
                description: "Museum of contemporary art".to_string(),
                latitude: origin.latitude - 0.0005,
                longitude: origin.longitude - 0.0018,
                altitude: 15.0,
                category: Category::Museum,
                icon: "🏛️".to_string(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::position::FALLBACK_ORIGIN;

    #[test]
    fn test_demo_set_surrounds_origin() {
        let points = PointOfInterest::demo_set(&FALLBACK_ORIGIN);
        assert_eq!(points.len(), 4);
        for point in &points {
            assert!((point.latitude - FALLBACK_ORIGIN.latitude).abs() < 0.01);
            assert!((point.longitude - FALLBACK_ORIGIN.longitude).abs() < 0.01);
        }
    }

    #[test]
    fn test_category_wire_format() {
        let json = serde_json::to_string(&Category::Restaurant).expect("serialize");
        assert_eq!(json, "\"restaurant\"");
    }
}
