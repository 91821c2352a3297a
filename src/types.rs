use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

/// A mutable 2D coordinate in map units. Cluster centroids are updated
/// in place, so points are plain public fields rather than an opaque
/// wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn origin() -> Self {
        Point { x: 0.0, y: 0.0 }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        self.square_distance(other).sqrt()
    }

    /// Squared distance. All nearest-cluster comparisons use this to
    /// keep the square root off the hot path; the root is taken once,
    /// when a true distance is needed for the threshold check.
    pub fn square_distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// The clustering input unit: a point plus a positive weight ("value").
/// Immutable once ingested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub point: Point,
    pub value: f64,
}

impl Feature {
    pub fn new(point: Point, value: f64) -> Self {
        Feature { point, value }
    }
}

/// Real-world bounding box of the dataset. Fixed for the lifetime of
/// an assembler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self> {
        if xmin > xmax {
            return Err(Error::extent(format!("xmin {} > xmax {}", xmin, xmax)));
        }
        if ymin > ymax {
            return Err(Error::extent(format!("ymin {} > ymax {}", ymin, ymax)));
        }
        Ok(Extent { xmin, ymin, xmax, ymax })
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn distance_and_square_distance_agree() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);
        assert_relative_eq!(a.square_distance(&b), 25.0);
        assert_relative_eq!(a.distance(&b), 5.0);
        assert_relative_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn extent_rejects_inverted_bounds() {
        assert!(Extent::new(10.0, 0.0, 0.0, 10.0).is_err());
        assert!(Extent::new(0.0, 10.0, 10.0, 0.0).is_err());
        let e = Extent::new(0.0, 0.0, 100.0, 50.0).unwrap();
        assert_relative_eq!(e.width(), 100.0);
        assert_relative_eq!(e.height(), 50.0);
    }

    #[test]
    fn degenerate_extent_is_allowed() {
        // A single-point extent is legal; the grid degenerates to one cell.
        assert!(Extent::new(5.0, 5.0, 5.0, 5.0).is_ok());
    }
}
