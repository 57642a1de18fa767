//! Press-and-hold drag reordering for one grid.
//!
//! [`DragReorderController`] keeps every item's linear order. While a drag is
//! active, each pointer update is snapped to a cell with
//! [`GridGeometry::order_at`]; when the cell belongs to another item, the two
//! items **swap** orders. Nothing else moves, so the rest of the grid stays
//! visually still for the whole gesture.
//!
//! # Invariants
//!
//! 1. `slots[order]` and `orders[key]` always describe the same permutation.
//! 2. A swap changes the order of exactly two items.
//! 3. Pointer updates allocate nothing unless a swap is reported.
//!
//! # Trailing drop
//!
//! Cells past the last item have no occupant, so hovering them never swaps.
//! At gesture end, a drop on an empty cell of the last row moves the dragged
//! item to the final order (swapping with the current last item). Drops
//! further out leave the order untouched.
//!
//! # Discarding a gesture
//!
//! There is no cancel. A host that abandons a drag calls [`end`] and ignores
//! the returned [`Reorder`]; the persisted order only changes when the host
//! applies it.
//!
//! [`end`]: DragReorderController::end

use std::hash::Hash;

use mosaic_core::geometry::{CellSize, Point};
use mosaic_core::logging::debug;
use rustc_hash::FxHashMap;

use crate::grid::GridGeometry;

/// One swap performed during a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSwap<K> {
    pub dragged: K,
    pub displaced: K,
    /// Order the dragged item left (now held by `displaced`).
    pub from: usize,
    /// Order the dragged item took.
    pub to: usize,
}

/// Committed `key → order` mapping emitted at gesture end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reorder<K> {
    sequence: Vec<K>,
}

impl<K: Eq + Hash + Clone> Reorder<K> {
    /// Build from keys listed in their new order.
    #[must_use]
    pub fn from_sequence(sequence: Vec<K>) -> Self {
        Self { sequence }
    }

    /// `(key, order)` pairs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, usize)> {
        self.sequence.iter().enumerate().map(|(order, key)| (key, order))
    }

    #[must_use]
    pub fn order_of(&self, key: &K) -> Option<usize> {
        self.sequence.iter().position(|k| k == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[K] {
        &self.sequence
    }

    /// `items` rearranged into committed order.
    ///
    /// Returns `None` unless `items` holds exactly the reordered keys, which
    /// happens when the grid changed underneath the drag.
    #[must_use]
    pub fn apply_to(&self, items: &[K]) -> Option<Vec<K>> {
        if items.len() != self.sequence.len() {
            return None;
        }
        let mut remaining: FxHashMap<&K, usize> = FxHashMap::default();
        for item in items {
            *remaining.entry(item).or_insert(0) += 1;
        }
        for key in &self.sequence {
            let count = remaining.get_mut(key)?;
            if *count == 0 {
                return None;
            }
            *count -= 1;
        }
        Some(self.sequence.clone())
    }
}

#[derive(Debug, Clone)]
struct ActiveDrag {
    order: usize,
    last: Option<Point>,
}

/// Swap-based reorder state for one fixed-column grid.
#[derive(Debug, Clone)]
pub struct DragReorderController<K> {
    geometry: GridGeometry,
    slots: Vec<K>,
    orders: FxHashMap<K, usize>,
    allow_trailing_drop: bool,
    active: Option<ActiveDrag>,
}

impl<K: Eq + Hash + Clone> DragReorderController<K> {
    /// Track `keys` in their current order.
    ///
    /// Keys must be unique.
    pub fn new(keys: impl IntoIterator<Item = K>, columns: usize, cell_size: CellSize) -> Self {
        let slots: Vec<K> = keys.into_iter().collect();
        let mut orders = FxHashMap::default();
        orders.reserve(slots.len());
        for (order, key) in slots.iter().enumerate() {
            orders.insert(key.clone(), order);
        }
        debug_assert_eq!(orders.len(), slots.len(), "drag keys must be unique");
        Self {
            geometry: GridGeometry::new(columns, cell_size),
            slots,
            orders,
            allow_trailing_drop: true,
            active: None,
        }
    }

    /// Enable or disable dropping into the empty cells of the last row.
    #[must_use]
    pub fn with_trailing_drop(mut self, allow: bool) -> Self {
        self.allow_trailing_drop = allow;
        self
    }

    #[must_use]
    pub const fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn order_of(&self, key: &K) -> Option<usize> {
        self.orders.get(key).copied()
    }

    /// Resting position of `key` at its current order.
    #[must_use]
    pub fn position_of(&self, key: &K) -> Option<Point> {
        self.order_of(key).map(|order| self.geometry.position_of(order))
    }

    /// Keys by current order.
    #[must_use]
    pub fn sequence(&self) -> &[K] {
        &self.slots
    }

    /// Start dragging `key`. Returns `false` if it is unknown or a drag is
    /// already in progress.
    pub fn begin(&mut self, key: &K) -> bool {
        if self.active.is_some() {
            return false;
        }
        let Some(order) = self.order_of(key) else {
            return false;
        };
        self.active = Some(ActiveDrag { order, last: None });
        true
    }

    /// Feed a pointer position (top-left of the dragged cell, in grid
    /// pixels).
    pub fn update(&mut self, point: Point) -> Option<DragSwap<K>> {
        let active = self.active.as_mut()?;
        active.last = Some(point);
        let proposed = self.geometry.order_at(point);
        let from = active.order;
        if proposed == from || proposed >= self.slots.len() {
            return None;
        }
        active.order = proposed;
        Some(self.swap(from, proposed))
    }

    /// Finish the gesture and emit the committed order.
    ///
    /// Returns `None` when no drag was active.
    pub fn end(&mut self) -> Option<Reorder<K>> {
        let active = self.active.take()?;
        if let Some(point) = active.last
            && self.allow_trailing_drop
        {
            let len = self.slots.len();
            let proposed = self.geometry.order_at(point);
            let last = len.saturating_sub(1);
            if proposed >= len && proposed < self.geometry.capacity_for(len) && active.order != last
            {
                debug!(from = active.order, to = last, "drag trailing drop");
                self.swap_slots(active.order, last);
            }
        }
        debug!(items = self.slots.len(), "drag reorder committed");
        Some(Reorder::from_sequence(self.slots.clone()))
    }

    fn swap(&mut self, from: usize, to: usize) -> DragSwap<K> {
        self.swap_slots(from, to);
        debug!(from, to, "drag swap");
        DragSwap {
            dragged: self.slots[to].clone(),
            displaced: self.slots[from].clone(),
            from,
            to,
        }
    }

    /// Exchange two slots and keep `orders` in step.
    fn swap_slots(&mut self, from: usize, to: usize) {
        self.slots.swap(from, to);
        if let Some(order) = self.orders.get_mut(&self.slots[to]) {
            *order = to;
        }
        if let Some(order) = self.orders.get_mut(&self.slots[from]) {
            *order = from;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(n: usize, columns: usize) -> DragReorderController<char> {
        let keys = (0..n).map(|i| (b'a' + i as u8) as char);
        DragReorderController::new(keys, columns, CellSize::new(10.0).unwrap())
    }

    fn seq(c: &DragReorderController<char>) -> String {
        c.sequence().iter().collect()
    }

    #[test]
    fn update_without_begin_is_inert() {
        let mut c = controller(4, 2);
        assert_eq!(c.update(Point::new(10.0, 10.0)), None);
        assert_eq!(c.end(), None);
    }

    #[test]
    fn hovering_another_cell_swaps_two_items() {
        let mut c = controller(6, 3);
        assert!(c.begin(&'a'));
        let swap = c.update(Point::new(11.0, 11.0)).unwrap();
        assert_eq!(swap.dragged, 'a');
        assert_eq!(swap.displaced, 'e');
        assert_eq!((swap.from, swap.to), (0, 4));
        assert_eq!(seq(&c), "ebcdaf");
        assert_eq!(c.order_of(&'a'), Some(4));
        assert_eq!(c.order_of(&'e'), Some(0));
    }

    #[test]
    fn staying_in_cell_does_not_swap() {
        let mut c = controller(4, 2);
        c.begin(&'b');
        assert_eq!(c.update(Point::new(12.0, 3.0)), None);
        assert_eq!(seq(&c), "abcd");
    }

    #[test]
    fn consecutive_swaps_walk_the_dragged_item() {
        let mut c = controller(4, 4);
        c.begin(&'a');
        c.update(Point::new(10.0, 0.0));
        c.update(Point::new(20.0, 0.0));
        c.update(Point::new(30.0, 0.0));
        assert_eq!(seq(&c), "bcda");
        let reorder = c.end().unwrap();
        assert_eq!(reorder.as_slice(), &['b', 'c', 'd', 'a']);
        assert_eq!(reorder.order_of(&'a'), Some(3));
    }

    #[test]
    fn empty_cell_hover_is_ignored_until_drop() {
        let mut c = controller(5, 3);
        c.begin(&'a');
        // Order 5 is the empty trailing cell of row 1.
        assert_eq!(c.update(Point::new(20.0, 10.0)), None);
        assert_eq!(seq(&c), "abcde");
        let reorder = c.end().unwrap();
        assert_eq!(reorder.as_slice(), &['e', 'b', 'c', 'd', 'a']);
    }

    #[test]
    fn drop_beyond_last_row_keeps_order() {
        let mut c = controller(5, 3);
        c.begin(&'a');
        c.update(Point::new(0.0, 90.0));
        let reorder = c.end().unwrap();
        assert_eq!(reorder.as_slice(), &['a', 'b', 'c', 'd', 'e']);
    }

    #[test]
    fn trailing_drop_can_be_disabled() {
        let mut c = controller(5, 3).with_trailing_drop(false);
        c.begin(&'a');
        c.update(Point::new(20.0, 10.0));
        assert_eq!(c.end().unwrap().as_slice(), &['a', 'b', 'c', 'd', 'e']);
    }

    #[test]
    fn trailing_drop_keeps_lookup_in_step() {
        let mut c = controller(5, 3);
        c.begin(&'b');
        c.update(Point::new(20.0, 10.0));
        let reorder = c.end().unwrap();
        assert_eq!(reorder.as_slice(), &['a', 'e', 'c', 'd', 'b']);
        assert_eq!(c.order_of(&'b'), Some(4));
        assert_eq!(c.order_of(&'e'), Some(1));
        assert_eq!(c.position_of(&'b'), Some(Point::new(10.0, 10.0)));
        for (order, key) in c.sequence().iter().enumerate() {
            assert_eq!(c.order_of(key), Some(order));
        }
    }

    #[test]
    fn begin_rejects_unknown_and_nested() {
        let mut c = controller(3, 3);
        assert!(!c.begin(&'z'));
        assert!(c.begin(&'a'));
        assert!(!c.begin(&'b'));
    }

    #[test]
    fn position_of_follows_order() {
        let mut c = controller(4, 2);
        assert_eq!(c.position_of(&'d'), Some(Point::new(10.0, 10.0)));
        c.begin(&'a');
        c.update(Point::new(10.0, 10.0));
        assert_eq!(c.position_of(&'a'), Some(Point::new(10.0, 10.0)));
        assert_eq!(c.position_of(&'d'), Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn reorder_apply_to_checks_membership() {
        let reorder = Reorder::from_sequence(vec!['b', 'a', 'c']);
        assert_eq!(reorder.apply_to(&['a', 'b', 'c']), Some(vec!['b', 'a', 'c']));
        assert_eq!(reorder.apply_to(&['a', 'b']), None);
        assert_eq!(reorder.apply_to(&['a', 'b', 'd']), None);
    }
}
