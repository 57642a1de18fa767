//! Merging whitespace cells into a run of tokens.
//!
//! Whitespace offsets are positions in the *final* list. They are replayed
//! in the order given: the `k`-th offset (0-based) inserts one block at
//! `offset + k`, because each earlier insertion shifted the remaining tokens
//! right by one. Offsets are not sorted first; descending input is applied
//! as-is.
//!
//! An offset that lands past the current end appends instead of failing.

use mosaic_core::ids::IdAllocator;
use mosaic_core::logging::warn;

use crate::item::{Item, WhitespaceBlock};

/// Interleave `items` with whitespace blocks at `offsets`.
pub fn insert_whitespace<T, A>(
    items: impl IntoIterator<Item = T>,
    offsets: &[usize],
    ids: &mut A,
) -> Vec<Item<T>>
where
    A: IdAllocator + ?Sized,
{
    let items = items.into_iter();
    let mut out: Vec<Item<T>> = Vec::with_capacity(items.size_hint().0 + offsets.len());
    out.extend(items.map(Item::Token));

    for (inserted, &offset) in offsets.iter().enumerate() {
        let block = Item::Whitespace(WhitespaceBlock::new(ids.whitespace_id()));
        let at = offset.saturating_add(inserted);
        if at > out.len() {
            warn!(
                offset,
                at,
                len = out.len(),
                "whitespace offset past end of section; appending"
            );
            out.push(block);
        } else {
            out.insert(at, block);
        }
    }
    out
}

/// Offsets, in the replay convention above, of every whitespace cell in
/// `items`.
///
/// This is the inverse of [`insert_whitespace`]: replaying the result over
/// the tokens of `items` rebuilds the same cell layout.
#[must_use]
pub fn whitespace_offsets<T>(items: &[Item<T>]) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_whitespace())
        .enumerate()
        .map(|(seen, (index, _))| index - seen)
        .collect()
}
