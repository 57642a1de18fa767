//! Descriptor → sections → rows.
//!
//! [`LayoutParser::parse`] splits the flat token list at the descriptor's
//! section offsets, interleaves each span with its whitespace, and chunks the
//! result into rows of `columns` cells for a virtualized list.
//!
//! # Healing
//!
//! Parsing never fails. A malformed descriptor renders as a degraded but
//! complete layout, and every token appears exactly once:
//!
//! - empty `sections` with tokens present: one section covering everything;
//! - first offset ≠ 0: treated as 0;
//! - offsets past the end or not increasing: clamped into `[previous, len]`;
//! - spans left with zero tokens: skipped;
//! - missing layout entry, absent or zero `columns`: fallback columns;
//! - whitespace offsets past the end: appended.
//!
//! # Identifiers
//!
//! Section, row, and whitespace ids come from the caller's [`IdAllocator`].
//! Passing a fresh allocator with the same seed reproduces identical ids, which
//! keeps repeated parses of unchanged input referentially stable.

use mosaic_core::ids::{IdAllocator, RowId, SectionId, TokenId};
use mosaic_core::logging::{trace_span, warn};

use crate::descriptor::LayoutDescriptor;
use crate::item::{Item, TokenLike};
use crate::policy::EditorPolicy;
use crate::whitespace::{insert_whitespace, whitespace_offsets};

/// A fixed-width chunk of a section.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<T> {
    pub id: RowId,
    pub items: Vec<Item<T>>,
    /// First row of the whole collection.
    pub is_first: bool,
    /// Last row of the whole collection.
    pub is_last: bool,
}

/// One section of a parsed collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<T> {
    pub id: SectionId,
    pub columns: usize,
    pub rows: Vec<Row<T>>,
}

impl<T> Section<T> {
    /// All cells in order.
    pub fn items(&self) -> impl Iterator<Item = &Item<T>> {
        self.rows.iter().flat_map(|row| row.items.iter())
    }

    /// Tokens in order, skipping whitespace.
    pub fn tokens(&self) -> impl Iterator<Item = &T> {
        self.items().filter_map(Item::as_token)
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.rows.iter().map(|row| row.items.len()).sum()
    }

    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens().count()
    }

    /// Whitespace offsets in persisted form.
    #[must_use]
    pub fn whitespace_offsets(&self) -> Vec<usize>
    where
        T: Clone,
    {
        let items: Vec<Item<T>> = self.items().cloned().collect();
        whitespace_offsets(&items)
    }
}

/// Parser output: sections in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLayout<T> {
    pub sections: Vec<Section<T>>,
}

impl<T> ParsedLayout<T> {
    /// Every row in display order, paired with its section.
    pub fn rows(&self) -> impl Iterator<Item = (&Section<T>, &Row<T>)> {
        self.sections
            .iter()
            .flat_map(|section| section.rows.iter().map(move |row| (section, row)))
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.sections.iter().map(|section| section.rows.len()).sum()
    }

    /// All tokens in collection order.
    pub fn tokens(&self) -> impl Iterator<Item = &T> {
        self.sections.iter().flat_map(Section::tokens)
    }
}

impl<T: TokenLike> ParsedLayout<T> {
    /// Position of the section holding `token`, if any.
    #[must_use]
    pub fn section_of(&self, token: &TokenId) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| section.tokens().any(|t| t.token_id() == token))
    }
}

/// Descriptor parser configured by an [`EditorPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutParser {
    empty_section_columns: usize,
    fallback_columns: usize,
}

impl Default for LayoutParser {
    fn default() -> Self {
        Self::new(&EditorPolicy::default())
    }
}

impl LayoutParser {
    #[must_use]
    pub fn new(policy: &EditorPolicy) -> Self {
        Self {
            empty_section_columns: policy.empty_section_columns.max(1),
            fallback_columns: policy.fallback_columns.max(1),
        }
    }

    /// Parse `tokens` against `layout`.
    pub fn parse<T, A>(
        &self,
        tokens: &[T],
        layout: &LayoutDescriptor,
        ids: &mut A,
    ) -> ParsedLayout<T>
    where
        T: Clone,
        A: IdAllocator + ?Sized,
    {
        let _span = trace_span!(
            "layout.parse",
            tokens = tokens.len(),
            sections = layout.sections.len()
        )
        .entered();

        if tokens.is_empty() {
            return ParsedLayout {
                sections: vec![Section {
                    id: ids.section_id(),
                    columns: self.empty_section_columns,
                    rows: Vec::new(),
                }],
            };
        }

        if layout.sections.len() != layout.section_layout.len() {
            warn!(
                sections = layout.sections.len(),
                section_layout = layout.section_layout.len(),
                "layout descriptor length mismatch"
            );
        }

        let spans = self.spans(tokens.len(), layout);
        let mut sections = Vec::with_capacity(spans.len());
        for (index, start, end) in spans {
            let entry = layout.section_layout.get(index);
            let columns = match entry.and_then(|e| e.columns) {
                Some(columns) if columns >= 1 => columns,
                other => {
                    warn!(section = index, columns = ?other, "section columns healed to fallback");
                    self.fallback_columns
                }
            };
            let whitespace = entry.map_or(&[][..], |e| e.whitespace.as_slice());
            let items = insert_whitespace(tokens[start..end].iter().cloned(), whitespace, ids);
            sections.push(Section {
                id: ids.section_id(),
                columns,
                rows: chunk_rows(items, columns, ids),
            });
        }

        mark_boundaries(&mut sections);
        ParsedLayout { sections }
    }

    /// Healed `(layout index, start, end)` token spans, skipping empty ones.
    fn spans(&self, len: usize, layout: &LayoutDescriptor) -> Vec<(usize, usize, usize)> {
        if layout.sections.is_empty() {
            warn!("layout descriptor has no sections; using one section");
            return vec![(0, 0, len)];
        }

        let mut starts = Vec::with_capacity(layout.sections.len());
        let mut prev = 0;
        for (index, &raw) in layout.sections.iter().enumerate() {
            let start = if index == 0 { 0 } else { raw.clamp(prev, len) };
            if start != raw {
                warn!(section = index, raw, healed = start, "section offset healed");
            }
            starts.push(start);
            prev = start;
        }

        let mut spans = Vec::with_capacity(starts.len());
        for (index, &start) in starts.iter().enumerate() {
            let end = starts.get(index + 1).copied().unwrap_or(len);
            if end > start {
                spans.push((index, start, end));
            }
        }
        spans
    }
}

/// Parse with the default policy.
pub fn parse_layout<T, A>(tokens: &[T], layout: &LayoutDescriptor, ids: &mut A) -> ParsedLayout<T>
where
    T: Clone,
    A: IdAllocator + ?Sized,
{
    LayoutParser::default().parse(tokens, layout, ids)
}

fn chunk_rows<T, A>(items: Vec<Item<T>>, columns: usize, ids: &mut A) -> Vec<Row<T>>
where
    A: IdAllocator + ?Sized,
{
    let mut rows = Vec::with_capacity(items.len().div_ceil(columns));
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        rows.push(Row {
            id: ids.row_id(),
            items: items.by_ref().take(columns).collect(),
            is_first: false,
            is_last: false,
        });
    }
    rows
}

fn mark_boundaries<T>(sections: &mut [Section<T>]) {
    if let Some(row) = sections.iter_mut().flat_map(|s| s.rows.iter_mut()).next() {
        row.is_first = true;
    }
    if let Some(row) = sections
        .iter_mut()
        .rev()
        .flat_map(|s| s.rows.iter_mut().rev())
        .next()
    {
        row.is_last = true;
    }
}
