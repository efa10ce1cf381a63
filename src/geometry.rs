//! Screen geometry and percent/pixel coordinate conversion.

use serde::{Deserialize, Serialize};

use crate::error::{AhkError, Result};

/// How a coordinate given to or returned from the engine is expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Positioning {
    /// Absolute screen pixels.
    #[default]
    Pixels,
    /// Percentage of the screen width/height (0..=100).
    Percent,
}

/// A screen coordinate pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self {
            x: f64::from(x),
            y: f64::from(y),
        }
    }
}

/// An inclusive screen rectangle from `(x1, y1)` to `(x2, y2)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Region {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Whether the point lies inside the rectangle, edges included.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x1 && point.x <= self.x2 && point.y >= self.y1 && point.y <= self.y2
    }
}

/// Screen dimensions reported by the engine during the handshake.
///
/// Established once per session and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 768,
        }
    }
}

impl Geometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse the initialization payload sent by the runner script.
    ///
    /// The payload is a JSON object containing at least `width` and
    /// `height`; any other fields are ignored.
    pub fn from_handshake(payload: &str) -> Result<Self> {
        let geometry: Self = serde_json::from_str(payload.trim())
            .map_err(|e| AhkError::handshake(format!("invalid payload '{}': {}", payload, e)))?;

        if geometry.width == 0 || geometry.height == 0 {
            return Err(AhkError::handshake(format!(
                "screen size {}x{} is empty",
                geometry.width, geometry.height
            )));
        }

        Ok(geometry)
    }

    /// Convert a percent coordinate into pixels.
    pub fn to_px(&self, point: Point) -> Point {
        Point {
            x: point.x / 100.0 * f64::from(self.width),
            y: point.y / 100.0 * f64::from(self.height),
        }
    }

    /// Convert a pixel coordinate into percent of the screen.
    pub fn to_percent(&self, point: Point) -> Point {
        Point {
            x: point.x * 100.0 / f64::from(self.width),
            y: point.y * 100.0 / f64::from(self.height),
        }
    }

    /// Resolve a coordinate to whole pixels the way the engine expects them.
    pub fn resolve(&self, point: Point, positioning: Positioning) -> (i64, i64) {
        let px = match positioning {
            Positioning::Pixels => point,
            Positioning::Percent => self.to_px(point),
        };
        (px.x.floor() as i64, px.y.floor() as i64)
    }

    /// Resolve both corners of a region to whole pixels.
    pub fn resolve_region(&self, region: Region, positioning: Positioning) -> (i64, i64, i64, i64) {
        let (x1, y1) = self.resolve(Point::new(region.x1, region.y1), positioning);
        let (x2, y2) = self.resolve(Point::new(region.x2, region.y2), positioning);
        (x1, y1, x2, y2)
    }

    /// Express a pixel coordinate returned by the engine in the caller's positioning.
    pub fn present(&self, point: Point, positioning: Positioning) -> Point {
        match positioning {
            Positioning::Pixels => point,
            Positioning::Percent => self.to_percent(point),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_percent_round_trip() {
        let geometry = Geometry::new(1920, 1080);
        for &(x, y) in &[(0.0, 0.0), (50.0, 50.0), (12.5, 99.9), (100.0, 33.3)] {
            let back = geometry.to_percent(geometry.to_px(Point::new(x, y)));
            assert!(close(back.x, x), "x: {} != {}", back.x, x);
            assert!(close(back.y, y), "y: {} != {}", back.y, y);
        }
    }

    #[test]
    fn test_resolve_floors_percent() {
        let geometry = Geometry::new(1366, 768);
        assert_eq!(
            geometry.resolve(Point::new(50.0, 50.0), Positioning::Percent),
            (683, 384)
        );
        assert_eq!(
            geometry.resolve(Point::new(33.3, 10.0), Positioning::Percent),
            (454, 76)
        );
        assert_eq!(
            geometry.resolve(Point::new(10.7, 20.2), Positioning::Pixels),
            (10, 20)
        );
    }

    #[test]
    fn test_handshake_payload() {
        let geometry =
            Geometry::from_handshake(r#"{"width":2560,"height":1440,"dpi":96}"#).unwrap();
        assert_eq!(geometry, Geometry::new(2560, 1440));

        assert!(Geometry::from_handshake("not json").is_err());
        assert!(Geometry::from_handshake(r#"{"width":1920}"#).is_err());
        assert!(Geometry::from_handshake(r#"{"width":0,"height":1080}"#).is_err());
    }

    #[test]
    fn test_region_contains_edges() {
        let region = Region::new(10.0, 10.0, 20.0, 20.0);
        assert!(region.contains(Point::new(10.0, 20.0)));
        assert!(region.contains(Point::new(15.0, 15.0)));
        assert!(!region.contains(Point::new(21.0, 15.0)));
    }
}
