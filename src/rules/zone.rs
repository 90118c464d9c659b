// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Zones - static regions of interest within a camera frame

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::inference::BoundingBox;

/// Zone identifier, unique per camera
pub type ZoneId = u32;

/// Zone geometry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Axis-aligned rectangle, x1 <= x2 and y1 <= y2
    Rectangle { x1: i32, y1: i32, x2: i32, y2: i32 },
    /// Simple polygon, boundary inclusive
    Polygon { points: Vec<[i32; 2]> },
}

impl Shape {
    /// Inclusive point containment
    pub fn contains_point(&self, x: i64, y: i64) -> bool {
        match self {
            Shape::Rectangle { x1, y1, x2, y2 } => {
                (*x1 as i64) <= x && x <= (*x2 as i64) && (*y1 as i64) <= y && y <= (*y2 as i64)
            }
            Shape::Polygon { points } => polygon_contains(points, x, y),
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        match self {
            Shape::Rectangle { x1, y1, x2, y2 } => {
                if x1 > x2 {
                    return Err(Error::invalid_zone(name, format!("x1 ({}) > x2 ({})", x1, x2)));
                }
                if y1 > y2 {
                    return Err(Error::invalid_zone(name, format!("y1 ({}) > y2 ({})", y1, y2)));
                }
                Ok(())
            }
            Shape::Polygon { points } => {
                if points.len() < 3 {
                    return Err(Error::invalid_zone(
                        name,
                        format!("polygon needs at least 3 points, got {}", points.len()),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// A configured region of interest
///
/// Construction validates the geometry, so a `Zone` that exists is always
/// well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Zone {
    id: ZoneId,
    name: String,
    shape: Shape,
}

impl Zone {
    pub fn new(id: ZoneId, name: &str, shape: Shape) -> Result<Self> {
        shape.validate(name)?;
        Ok(Self {
            id,
            name: name.to_string(),
            shape,
        })
    }

    pub fn rectangle(id: ZoneId, name: &str, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self> {
        Self::new(id, name, Shape::Rectangle { x1, y1, x2, y2 })
    }

    pub fn polygon(id: ZoneId, name: &str, points: Vec<[i32; 2]>) -> Result<Self> {
        Self::new(id, name, Shape::Polygon { points })
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// True when the floor-divided center of `bbox` lies inside the zone
    pub fn contains(&self, bbox: &BoundingBox) -> bool {
        let (cx, cy) = bbox.center();
        self.shape.contains_point(cx, cy)
    }
}

fn polygon_contains(points: &[[i32; 2]], x: i64, y: i64) -> bool {
    let n = points.len();

    // Edges count as inside
    for i in 0..n {
        let [ax, ay] = points[i];
        let [bx, by] = points[(i + 1) % n];
        if on_segment((ax as i64, ay as i64), (bx as i64, by as i64), (x, y)) {
            return true;
        }
    }

    let (px, py) = (x as f64, y as f64);
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (points[i][0] as f64, points[i][1] as f64);
        let (xj, yj) = (points[j][0] as f64, points[j][1] as f64);
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn on_segment(a: (i64, i64), b: (i64, i64), p: (i64, i64)) -> bool {
    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    cross == 0
        && p.0 >= a.0.min(b.0)
        && p.0 <= a.0.max(b.0)
        && p.1 >= a.1.min(b.1)
        && p.1 <= a.1.max(b.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restricted() -> Zone {
        Zone::rectangle(1, "Restricted Area", 200, 200, 600, 600).unwrap()
    }

    #[test]
    fn test_center_on_corner_is_inside() {
        assert!(restricted().contains(&BoundingBox::new(190, 190, 210, 210)));
    }

    #[test]
    fn test_center_outside() {
        assert!(!restricted().contains(&BoundingBox::new(0, 0, 198, 198)));
    }

    #[test]
    fn test_truncated_center_decides() {
        let zone = restricted();
        // (199 + 202) / 2 = 200.5 -> 200, inside
        assert!(zone.contains(&BoundingBox::new(199, 300, 202, 300)));
        // (598 + 605) / 2 = 601.5 -> 601, outside
        assert!(!zone.contains(&BoundingBox::new(598, 300, 605, 300)));
        assert!(zone.contains(&BoundingBox::new(598, 300, 603, 300)));
    }

    #[test]
    fn test_rejects_inverted_rectangle() {
        let err = Zone::rectangle(2, "bad", 600, 200, 200, 600).unwrap_err();
        assert!(matches!(err, Error::InvalidZone { .. }));
        assert!(Zone::rectangle(3, "bad", 0, 10, 10, 0).is_err());
    }

    #[test]
    fn test_degenerate_rectangle_is_a_point() {
        let zone = Zone::rectangle(4, "point", 50, 50, 50, 50).unwrap();
        assert!(zone.contains(&BoundingBox::new(40, 40, 60, 60)));
        assert!(!zone.contains(&BoundingBox::new(40, 40, 62, 62)));
    }

    #[test]
    fn test_polygon_containment() {
        let tri = Zone::polygon(5, "triangle", vec![[0, 0], [100, 0], [0, 100]]).unwrap();
        assert!(tri.contains(&BoundingBox::new(10, 10, 30, 30)));
        assert!(!tri.contains(&BoundingBox::new(70, 70, 90, 90)));
        // Center (50, 50) sits on the hypotenuse
        assert!(tri.contains(&BoundingBox::new(40, 40, 60, 60)));
        // Vertex
        assert!(tri.contains(&BoundingBox::new(0, 0, 0, 0)));
    }

    #[test]
    fn test_polygon_needs_three_points() {
        assert!(Zone::polygon(6, "line", vec![[0, 0], [10, 10]]).is_err());
    }
}
