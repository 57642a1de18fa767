//! Sections → flat tokens + descriptor.
//!
//! The inverse of [`crate::parser`]. Sections are walked in order; each
//! token is appended to the flat list, each section records the flat index
//! where it starts, and whitespace cells are recorded as replay offsets.
//! Sections without tokens are dropped, whitespace and all.
//!
//! For any structure built through the staging store,
//! `parse(encode(x))` reproduces `x` up to freshly allocated ids.

use mosaic_core::ids::TokenId;
use mosaic_core::logging::trace_span;
use serde::{Deserialize, Serialize};

use crate::descriptor::{LayoutDescriptor, SectionLayout};
use crate::item::Item;
use crate::parser::ParsedLayout;
use crate::staging::StagedCollection;
use crate::whitespace::whitespace_offsets;

/// Persistable pair handed to the host's save routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedLayout<T = TokenId> {
    pub tokens: Vec<T>,
    pub layout: LayoutDescriptor,
}

impl<T> Default for EncodedLayout<T> {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            layout: LayoutDescriptor::default(),
        }
    }
}

/// Encode `(columns, items)` pairs in display order.
pub fn encode_sections<'a, T, I>(sections: I) -> EncodedLayout<T>
where
    T: Clone + 'a,
    I: IntoIterator<Item = (usize, &'a [Item<T>])>,
{
    let mut encoded = EncodedLayout::default();
    for (columns, items) in sections {
        let start = encoded.tokens.len();
        encoded
            .tokens
            .extend(items.iter().filter_map(Item::as_token).cloned());
        if encoded.tokens.len() == start {
            continue;
        }
        encoded.layout.sections.push(start);
        encoded
            .layout
            .section_layout
            .push(SectionLayout::new(columns.max(1)).with_whitespace(whitespace_offsets(items)));
    }
    encoded
}

/// Encode a staged collection.
#[must_use]
pub fn encode(staged: &StagedCollection) -> EncodedLayout {
    let _span = trace_span!(
        "layout.encode",
        collection = %staged.id(),
        sections = staged.sections().len()
    )
    .entered();
    encode_sections(
        staged
            .sections()
            .iter()
            .map(|section| (section.columns(), section.items())),
    )
}

/// Encode a parsed layout, e.g. to normalize a healed descriptor.
#[must_use]
pub fn encode_parsed<T: Clone>(parsed: &ParsedLayout<T>) -> EncodedLayout<T> {
    let flattened: Vec<(usize, Vec<Item<T>>)> = parsed
        .sections
        .iter()
        .map(|section| (section.columns, section.items().cloned().collect()))
        .collect();
    encode_sections(
        flattened
            .iter()
            .map(|(columns, items)| (*columns, items.as_slice())),
    )
}
