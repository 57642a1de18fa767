#![forbid(unsafe_code)]

//! Pixel geometry for grid feedback.
//!
//! Coordinates are logical pixels with the origin at the top-left corner of
//! the grid being dragged. Positions may be negative or fractional while a
//! pointer is in flight.

use serde::{Deserialize, Serialize};

/// A point in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate by an offset.
    #[inline]
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Edge length of one square grid cell, always finite and > 0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct CellSize(f64);

impl CellSize {
    /// Create a cell size, rejecting zero, negative, and non-finite values.
    #[must_use]
    pub fn new(size: f64) -> Option<Self> {
        (size.is_finite() && size > 0.0).then_some(Self(size))
    }

    /// Raw size in pixels.
    #[inline]
    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for CellSize {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("cell size must be finite and > 0, got {value}"))
    }
}

impl From<CellSize> for f64 {
    fn from(size: CellSize) -> Self {
        size.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_size_rejects_degenerate_values() {
        assert!(CellSize::new(0.0).is_none());
        assert!(CellSize::new(-4.0).is_none());
        assert!(CellSize::new(f64::NAN).is_none());
        assert!(CellSize::new(f64::INFINITY).is_none());
        assert_eq!(CellSize::new(48.0).map(CellSize::get), Some(48.0));
    }

    #[test]
    fn cell_size_deserialization_validates() {
        let ok: CellSize = serde_json::from_str("12.5").unwrap();
        assert_eq!(ok.get(), 12.5);
        assert!(serde_json::from_str::<CellSize>("0.0").is_err());
    }

    #[test]
    fn point_offset() {
        let p = Point::new(1.0, 2.0).offset(3.0, -1.0);
        assert_eq!(p, Point::new(4.0, 1.0));
    }
}
