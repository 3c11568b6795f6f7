// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Axis-aligned bounding boxes in lon/lat (CRS84)

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A bounding region `[min_x, min_y, max_x, max_y]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", from = "[f64; 4]")]
pub struct Extent {
    /// Western bound
    pub min_x: f64,
    /// Southern bound
    pub min_y: f64,
    /// Eastern bound
    pub max_x: f64,
    /// Northern bound
    pub max_y: f64,
}

impl Extent {
    /// The whole lon/lat plane
    pub const WORLD: Self = Self {
        min_x: -180.0,
        min_y: -90.0,
        max_x: 180.0,
        max_y: 90.0,
    };

    /// Build an extent, rejecting inverted or non-finite bounds
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when a bound is NaN/infinite or
    /// a minimum exceeds its maximum.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, String> {
        if [min_x, min_y, max_x, max_y].iter().any(|v| !v.is_finite()) {
            return Err("extent bounds must be finite numbers".to_string());
        }
        if min_x > max_x || min_y > max_y {
            return Err(format!(
                "extent minimum exceeds maximum: [{min_x}, {min_y}, {max_x}, {max_y}]"
            ));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Whether two extents share at least one point
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Bounds of a GeoJSON geometry object, or `None` when it has no coordinates
    pub fn of_geometry(geometry: &Value) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        if let Some(geometries) = geometry.get("geometries").and_then(Value::as_array) {
            for member in geometries {
                if let Some(member_bounds) = Self::of_geometry(member) {
                    bounds = Some(bounds.map_or(member_bounds, |b| b.union(&member_bounds)));
                }
            }
            return bounds;
        }
        collect_positions(geometry.get("coordinates")?, &mut bounds);
        bounds
    }

    fn union(&self, other: &Extent) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    fn include(bounds: &mut Option<Self>, x: f64, y: f64) {
        let point = Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        };
        *bounds = Some(bounds.map_or(point, |b| b.union(&point)));
    }
}

fn collect_positions(coordinates: &Value, bounds: &mut Option<Extent>) {
    let Some(items) = coordinates.as_array() else {
        return;
    };
    // A position is an array whose first two members are numbers
    if let (Some(x), Some(y)) = (
        items.first().and_then(Value::as_f64),
        items.get(1).and_then(Value::as_f64),
    ) {
        Extent::include(bounds, x, y);
        return;
    }
    for item in items {
        collect_positions(item, bounds);
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::WORLD
    }
}

impl From<Extent> for [f64; 4] {
    fn from(e: Extent) -> Self {
        [e.min_x, e.min_y, e.max_x, e.max_y]
    }
}

impl From<[f64; 4]> for Extent {
    fn from(b: [f64; 4]) -> Self {
        Self {
            min_x: b[0],
            min_y: b[1],
            max_x: b[2],
            max_y: b[3],
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rejects_inverted_bounds() {
        assert!(Extent::new(10.0, 0.0, 0.0, 1.0).is_err());
        assert!(Extent::new(0.0, 5.0, 1.0, 1.0).is_err());
        assert!(Extent::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
        assert!(Extent::new(0.0, 0.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn intersection_includes_touching_edges() {
        let a = Extent::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = Extent::new(1.0, 1.0, 2.0, 2.0).unwrap();
        let c = Extent::new(1.5, 1.5, 2.0, 2.0).unwrap();
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn geometry_bounds() {
        let line = json!({"type": "LineString", "coordinates": [[1.0, 2.0], [3.0, -1.0]]});
        assert_eq!(
            Extent::of_geometry(&line),
            Some(Extent::new(1.0, -1.0, 3.0, 2.0).unwrap())
        );

        let collection = json!({
            "type": "GeometryCollection",
            "geometries": [
                {"type": "Point", "coordinates": [5.0, 5.0]},
                {"type": "Point", "coordinates": [-5.0, 0.0]}
            ]
        });
        assert_eq!(
            Extent::of_geometry(&collection),
            Some(Extent::new(-5.0, 0.0, 5.0, 5.0).unwrap())
        );

        assert_eq!(Extent::of_geometry(&Value::Null), None);
    }

    #[test]
    fn serializes_as_array() {
        let extent = Extent::new(-1.0, -2.0, 3.0, 4.0).unwrap();
        assert_eq!(serde_json::to_value(extent).unwrap(), json!([-1.0, -2.0, 3.0, 4.0]));
    }
}
