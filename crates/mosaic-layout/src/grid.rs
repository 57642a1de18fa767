//! Order ↔ pixel arithmetic for fixed-column grids.
//!
//! Items in a drag-enabled grid carry a linear *order*. With `columns`
//! cells per row and square cells of `cell_size` pixels, order `n` sits at
//! column `n % columns`, row `n / columns`. The inverse snaps a pixel
//! position to the nearest cell.
//!
//! `columns` must be ≥ 1; sections guarantee this, so it is only checked in
//! debug builds.
//!
//! The round trip `order_from_position(position_from_order(n))` is exact for
//! every `n < MAX_EXACT_ORDER`. Beyond that, `f64` pixel coordinates can no
//! longer tell neighbouring rows apart.

use mosaic_core::geometry::{CellSize, Point};

/// Exclusive upper bound on orders that survive a pixel round trip.
pub const MAX_EXACT_ORDER: usize = 1 << 48;

/// Top-left pixel position of the cell holding `order`.
#[must_use]
pub fn position_from_order(order: usize, columns: usize, cell_size: CellSize) -> Point {
    debug_assert!(columns >= 1, "grid columns must be >= 1");
    let size = cell_size.get();
    Point::new(
        (order % columns) as f64 * size,
        (order / columns) as f64 * size,
    )
}

/// Order of the cell nearest to `(x, y)`.
///
/// Negative coordinates snap to the first row/column. The result may lie
/// past the last occupied order; callers decide how to treat it.
#[must_use]
pub fn order_from_position(x: f64, y: f64, columns: usize, cell_size: CellSize) -> usize {
    debug_assert!(columns >= 1, "grid columns must be >= 1");
    let size = cell_size.get();
    // `as usize` saturates: negatives and NaN become 0.
    let col = (x / size).round() as usize;
    let row = (y / size).round() as usize;
    row.saturating_mul(columns).saturating_add(col)
}

/// A grid's shape: column count plus cell size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    columns: usize,
    cell_size: CellSize,
}

impl GridGeometry {
    /// Create a geometry; `columns` is raised to at least 1.
    #[must_use]
    pub fn new(columns: usize, cell_size: CellSize) -> Self {
        Self {
            columns: columns.max(1),
            cell_size,
        }
    }

    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub const fn cell_size(&self) -> CellSize {
        self.cell_size
    }

    #[must_use]
    pub fn position_of(&self, order: usize) -> Point {
        position_from_order(order, self.columns, self.cell_size)
    }

    #[must_use]
    pub fn order_at(&self, point: Point) -> usize {
        order_from_position(point.x, point.y, self.columns, self.cell_size)
    }

    /// Number of rows needed for `count` items.
    #[must_use]
    pub fn rows_for(&self, count: usize) -> usize {
        count.div_ceil(self.columns)
    }

    /// Number of cells in the rows needed for `count` items, including the
    /// empty trailing cells of a short last row.
    #[must_use]
    pub fn capacity_for(&self, count: usize) -> usize {
        self.rows_for(count) * self.columns
    }
}
