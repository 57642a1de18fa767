//! In-memory editing model for collections.
//!
//! A [`StagingStore`] owns the staged mirror of one or more collections while
//! the user edits them. Each [`StagedSection`] stores a flat item list and a
//! column count; rows are derived on demand by chunking, so they can never
//! drift from their section. Rows are addressed positionally by
//! [`RowRef`].
//!
//! Mutations are expressed as [`StagingAction`] values and applied with
//! [`StagingStore::apply`]. Each call fully applies before returning. An
//! action naming an unknown collection, section, row, or whitespace cell is
//! a no-op reported as [`StagingOutcome::Ignored`].
//!
//! # Invariants
//!
//! 1. A token appears at most once across all sections of a collection.
//! 2. Every section has `columns >= 1`.
//! 3. Sections emptied by an action collapse, unless they are the last
//!    section of their collection.
//!
//! # Editing focus
//!
//! ```text
//! Idle ──select section──▶ SectionSelected ──select row──▶ RowSelected
//!   ▲                                                          │
//!   └──────────────────────────── deselect ────────────────────┘
//! ```
//!
//! Selecting a row while another is selected replaces it; there is no
//! multi-select.

use std::fmt;
use std::ops::Range;

use mosaic_core::geometry::CellSize;
use mosaic_core::ids::{CollectionId, IdAllocator, SectionId, SequentialIds, TokenId, WhitespaceId};
use mosaic_core::logging::debug;
use rustc_hash::FxHashSet;

use crate::descriptor::LayoutDescriptor;
use crate::drag::{DragReorderController, Reorder};
use crate::encoder::{EncodedLayout, encode};
use crate::item::{Item, TokenLike, WhitespaceBlock};
use crate::parser::{LayoutParser, ParsedLayout};
use crate::policy::EditorPolicy;

// =========================================================================
// Staged structure
// =========================================================================

/// Positional address of a derived row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowRef {
    pub section: SectionId,
    pub index: usize,
}

impl RowRef {
    #[must_use]
    pub const fn new(section: SectionId, index: usize) -> Self {
        Self { section, index }
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/row-{}", self.section, self.index)
    }
}

/// A row view over a staged section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagedRow<'a> {
    pub row: RowRef,
    pub items: &'a [Item],
}

/// Editable section: flat items plus column count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSection {
    id: SectionId,
    columns: usize,
    items: Vec<Item>,
}

impl StagedSection {
    /// Create a section; `columns` is raised to at least 1.
    #[must_use]
    pub fn new(id: SectionId, columns: usize, items: Vec<Item>) -> Self {
        Self {
            id,
            columns: columns.max(1),
            items,
        }
    }

    #[must_use]
    pub const fn id(&self) -> SectionId {
        self.id
    }

    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.items.len().div_ceil(self.columns)
    }

    /// Rows derived from the current items and column count.
    pub fn rows(&self) -> impl Iterator<Item = StagedRow<'_>> {
        self.items
            .chunks(self.columns)
            .enumerate()
            .map(|(index, items)| StagedRow {
                row: RowRef::new(self.id, index),
                items,
            })
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<StagedRow<'_>> {
        let range = self.row_range(index)?;
        Some(StagedRow {
            row: RowRef::new(self.id, index),
            items: &self.items[range],
        })
    }

    /// Item range covered by row `index`.
    #[must_use]
    pub fn row_range(&self, index: usize) -> Option<Range<usize>> {
        if index >= self.row_count() {
            return None;
        }
        let start = index * self.columns;
        Some(start..(start + self.columns).min(self.items.len()))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TokenId> {
        self.items.iter().filter_map(Item::token_id)
    }

    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens().count()
    }

    #[must_use]
    pub fn position_of_token(&self, token: &TokenId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.token_id() == Some(token))
    }

    #[must_use]
    pub fn position_of_whitespace(&self, id: WhitespaceId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| matches!(item, Item::Whitespace(block) if block.id == id))
    }
}

/// Editable collection: ordered sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedCollection {
    id: CollectionId,
    sections: Vec<StagedSection>,
}

impl StagedCollection {
    #[must_use]
    pub fn new(id: CollectionId, sections: Vec<StagedSection>) -> Self {
        Self { id, sections }
    }

    /// Stage a parsed layout, keeping its section and whitespace ids.
    #[must_use]
    pub fn from_parsed<T: TokenLike>(id: CollectionId, parsed: &ParsedLayout<T>) -> Self {
        let sections = parsed
            .sections
            .iter()
            .map(|section| {
                let items = section
                    .items()
                    .map(|item| match item {
                        Item::Token(token) => Item::Token(token.token_id().clone()),
                        Item::Whitespace(block) => Item::Whitespace(*block),
                    })
                    .collect();
                StagedSection::new(section.id, section.columns, items)
            })
            .collect();
        Self { id, sections }
    }

    #[must_use]
    pub const fn id(&self) -> CollectionId {
        self.id
    }

    #[must_use]
    pub fn sections(&self) -> &[StagedSection] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, id: SectionId) -> Option<&StagedSection> {
        self.sections.iter().find(|section| section.id == id)
    }

    /// All tokens in collection order.
    pub fn token_ids(&self) -> impl Iterator<Item = &TokenId> {
        self.sections.iter().flat_map(StagedSection::tokens)
    }

    #[must_use]
    pub fn token_count(&self) -> usize {
        self.token_ids().count()
    }

    /// `(section index, item index)` of `token`.
    #[must_use]
    pub fn locate_token(&self, token: &TokenId) -> Option<(usize, usize)> {
        self.sections
            .iter()
            .enumerate()
            .find_map(|(s, section)| section.position_of_token(token).map(|i| (s, i)))
    }

    #[must_use]
    pub fn contains_row(&self, row: RowRef) -> bool {
        self.section(row.section)
            .is_some_and(|section| row.index < section.row_count())
    }

    /// Persistable form of this collection.
    #[must_use]
    pub fn encode(&self) -> EncodedLayout {
        encode(self)
    }

    fn section_index(&self, id: SectionId) -> Option<usize> {
        self.sections.iter().position(|section| section.id == id)
    }

    /// Drop sections in `candidates` that ended up empty, keeping at least
    /// one section.
    fn collapse_empty(&mut self, candidates: &[SectionId]) -> Vec<SectionId> {
        let mut removed = Vec::new();
        for &id in candidates {
            if self.sections.len() <= 1 {
                break;
            }
            if let Some(index) = self.section_index(id)
                && self.sections[index].is_empty()
            {
                self.sections.remove(index);
                removed.push(id);
            }
        }
        removed
    }
}

// =========================================================================
// Editing focus
// =========================================================================

/// Which part of the active collection the user is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditFocus {
    #[default]
    Idle,
    SectionSelected(SectionId),
    RowSelected(RowRef),
}

impl EditFocus {
    #[must_use]
    pub const fn select_section(self, section: SectionId) -> Self {
        Self::SectionSelected(section)
    }

    /// Select `row`, replacing any previous row selection.
    #[must_use]
    pub const fn select_row(self, row: RowRef) -> Self {
        Self::RowSelected(row)
    }

    #[must_use]
    pub const fn clear(self) -> Self {
        Self::Idle
    }

    /// Section implied by the focus.
    #[must_use]
    pub const fn section(self) -> Option<SectionId> {
        match self {
            Self::Idle => None,
            Self::SectionSelected(section) => Some(section),
            Self::RowSelected(row) => Some(row.section),
        }
    }
}

/// Selection state owned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub collection: Option<CollectionId>,
    pub focus: EditFocus,
}

// =========================================================================
// Actions and outcomes
// =========================================================================

/// A mutation or selection change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingAction {
    /// Move a row's items next to `target`.
    ///
    /// Within one section the row lands after a later target or before an
    /// earlier one. Across sections it lands before `target`; a target index
    /// equal to the section's row count appends.
    MoveRow { row: RowRef, target: RowRef },
    /// Move a section to the position currently held by `target`.
    MoveSection {
        section: SectionId,
        target: SectionId,
    },
    IncrementColumns { section: SectionId },
    DecrementColumns { section: SectionId },
    /// Set columns, clamped to `[1, max_columns]`.
    SetColumns { section: SectionId, columns: usize },
    /// Add absent tokens to the focused row or section, move tokens held by
    /// other sections there, and remove tokens already in it.
    ToggleTokens { tokens: Vec<TokenId> },
    /// Insert an empty section after `after` (or at the end).
    AddSection {
        after: Option<SectionId>,
        columns: Option<usize>,
    },
    /// Remove a section and the tokens it holds.
    RemoveSection { section: SectionId },
    /// Insert whitespace at `index`, clamped to the end of the section.
    InsertWhitespace { section: SectionId, index: usize },
    RemoveWhitespace {
        section: SectionId,
        whitespace: WhitespaceId,
    },
    /// Commit a drag reorder for one section.
    ApplyOrder {
        section: SectionId,
        order: Reorder<Item>,
    },
    ActivateCollection { collection: CollectionId },
    ActivateSection { section: SectionId },
    SelectRow { row: RowRef },
    Deselect,
}

/// Action family, for logs and outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagingActionKind {
    MoveRow,
    MoveSection,
    IncrementColumns,
    DecrementColumns,
    SetColumns,
    ToggleTokens,
    AddSection,
    RemoveSection,
    InsertWhitespace,
    RemoveWhitespace,
    ApplyOrder,
    ActivateCollection,
    ActivateSection,
    SelectRow,
    Deselect,
}

impl StagingAction {
    #[must_use]
    pub const fn kind(&self) -> StagingActionKind {
        match self {
            Self::MoveRow { .. } => StagingActionKind::MoveRow,
            Self::MoveSection { .. } => StagingActionKind::MoveSection,
            Self::IncrementColumns { .. } => StagingActionKind::IncrementColumns,
            Self::DecrementColumns { .. } => StagingActionKind::DecrementColumns,
            Self::SetColumns { .. } => StagingActionKind::SetColumns,
            Self::ToggleTokens { .. } => StagingActionKind::ToggleTokens,
            Self::AddSection { .. } => StagingActionKind::AddSection,
            Self::RemoveSection { .. } => StagingActionKind::RemoveSection,
            Self::InsertWhitespace { .. } => StagingActionKind::InsertWhitespace,
            Self::RemoveWhitespace { .. } => StagingActionKind::RemoveWhitespace,
            Self::ApplyOrder { .. } => StagingActionKind::ApplyOrder,
            Self::ActivateCollection { .. } => StagingActionKind::ActivateCollection,
            Self::ActivateSection { .. } => StagingActionKind::ActivateSection,
            Self::SelectRow { .. } => StagingActionKind::SelectRow,
            Self::Deselect => StagingActionKind::Deselect,
        }
    }
}

/// Why an action had no effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoredReason {
    NoActiveCollection,
    UnknownCollection(CollectionId),
    UnknownSection(SectionId),
    UnknownRow(RowRef),
    UnknownWhitespace(WhitespaceId),
    /// The reorder no longer matches the section's items.
    StaleOrder(SectionId),
    /// The action would not change anything.
    NoChange,
}

impl fmt::Display for IgnoredReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveCollection => write!(f, "no active collection"),
            Self::UnknownCollection(id) => write!(f, "unknown {id}"),
            Self::UnknownSection(id) => write!(f, "unknown {id}"),
            Self::UnknownRow(row) => write!(f, "unknown {row}"),
            Self::UnknownWhitespace(id) => write!(f, "unknown {id}"),
            Self::StaleOrder(id) => write!(f, "stale reorder for {id}"),
            Self::NoChange => write!(f, "no change"),
        }
    }
}

/// Entity created by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Created {
    Section(SectionId),
    Whitespace(WhitespaceId),
}

/// Result of [`StagingStore::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingOutcome {
    Applied {
        kind: StagingActionKind,
        /// Sections whose items, columns, or position changed.
        touched: Vec<SectionId>,
        /// Sections removed because they became empty or were deleted.
        collapsed: Vec<SectionId>,
        created: Option<Created>,
    },
    Ignored {
        kind: StagingActionKind,
        reason: IgnoredReason,
    },
}

impl StagingOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    #[must_use]
    pub const fn kind(&self) -> StagingActionKind {
        match self {
            Self::Applied { kind, .. } | Self::Ignored { kind, .. } => *kind,
        }
    }

    #[must_use]
    pub const fn created(&self) -> Option<Created> {
        match self {
            Self::Applied { created, .. } => *created,
            Self::Ignored { .. } => None,
        }
    }
}

/// Successful mutation details, before the outcome is assembled.
#[derive(Debug, Default)]
struct Effect {
    touched: Vec<SectionId>,
    collapsed: Vec<SectionId>,
    created: Option<Created>,
}

impl Effect {
    fn touched(touched: Vec<SectionId>) -> Self {
        Self {
            touched,
            ..Self::default()
        }
    }
}

// =========================================================================
// Store
// =========================================================================

/// Owner of staged collections and the editing selection.
#[derive(Debug, Clone)]
pub struct StagingStore {
    policy: EditorPolicy,
    parser: LayoutParser,
    ids: SequentialIds,
    collections: Vec<StagedCollection>,
    selection: Selection,
}

impl Default for StagingStore {
    fn default() -> Self {
        Self::new(EditorPolicy::default())
    }
}

impl StagingStore {
    #[must_use]
    pub fn new(policy: EditorPolicy) -> Self {
        Self {
            parser: LayoutParser::new(&policy),
            policy,
            ids: SequentialIds::default(),
            collections: Vec::new(),
            selection: Selection::default(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &EditorPolicy {
        &self.policy
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection
    }

    #[must_use]
    pub fn focus(&self) -> EditFocus {
        self.selection.focus
    }

    #[must_use]
    pub fn collections(&self) -> &[StagedCollection] {
        &self.collections
    }

    #[must_use]
    pub fn collection(&self, id: CollectionId) -> Option<&StagedCollection> {
        self.collections.iter().find(|c| c.id == id)
    }

    /// The collection actions apply to.
    #[must_use]
    pub fn active_collection(&self) -> Option<&StagedCollection> {
        self.selection.collection.and_then(|id| self.collection(id))
    }

    /// Parse and stage a collection. The first loaded collection becomes
    /// active.
    pub fn load_collection<T: TokenLike + Clone>(
        &mut self,
        tokens: &[T],
        layout: &LayoutDescriptor,
    ) -> CollectionId {
        let id = self.ids.collection_id();
        let parsed = self.parser.parse(tokens, layout, &mut self.ids);
        self.collections
            .push(StagedCollection::from_parsed(id, &parsed));
        if self.active_collection().is_none() {
            self.selection = Selection {
                collection: Some(id),
                focus: EditFocus::Idle,
            };
        }
        id
    }

    /// Drop a staged collection without committing it.
    pub fn discard_collection(&mut self, id: CollectionId) -> bool {
        let before = self.collections.len();
        self.collections.retain(|c| c.id != id);
        if self.selection.collection == Some(id) {
            self.selection = Selection::default();
        }
        self.collections.len() != before
    }

    /// Encode a collection for persistence.
    #[must_use]
    pub fn commit(&self, id: CollectionId) -> Option<EncodedLayout> {
        let encoded = self.collection(id)?.encode();
        debug!(
            collection = %id,
            tokens = encoded.tokens.len(),
            sections = encoded.layout.sections.len(),
            "collection encoded for commit"
        );
        Some(encoded)
    }

    /// Token ids of a collection in order.
    #[must_use]
    pub fn staged_token_ids(&self, id: CollectionId) -> Vec<TokenId> {
        self.collection(id)
            .map(|c| c.token_ids().cloned().collect())
            .unwrap_or_default()
    }

    /// Drag controller over one section of the active collection.
    #[must_use]
    pub fn drag_controller(&self, section: SectionId) -> Option<DragReorderController<Item>> {
        let section = self.active_collection()?.section(section)?;
        let cell_size = self
            .policy
            .drag
            .cell_size()
            .or_else(|| CellSize::new(1.0))?;
        Some(
            DragReorderController::new(section.items.iter().cloned(), section.columns, cell_size)
                .with_trailing_drop(self.policy.drag.allow_trailing_drop),
        )
    }

    // ---- convenience wrappers ----

    pub fn move_row(&mut self, row: RowRef, target: RowRef) -> StagingOutcome {
        self.apply(StagingAction::MoveRow { row, target })
    }

    pub fn move_section(&mut self, section: SectionId, target: SectionId) -> StagingOutcome {
        self.apply(StagingAction::MoveSection { section, target })
    }

    pub fn increment_columns(&mut self, section: SectionId) -> StagingOutcome {
        self.apply(StagingAction::IncrementColumns { section })
    }

    pub fn decrement_columns(&mut self, section: SectionId) -> StagingOutcome {
        self.apply(StagingAction::DecrementColumns { section })
    }

    pub fn toggle_tokens_staged(
        &mut self,
        tokens: impl IntoIterator<Item = TokenId>,
    ) -> StagingOutcome {
        self.apply(StagingAction::ToggleTokens {
            tokens: tokens.into_iter().collect(),
        })
    }

    pub fn add_section(&mut self, after: Option<SectionId>) -> Option<SectionId> {
        match self
            .apply(StagingAction::AddSection {
                after,
                columns: None,
            })
            .created()
        {
            Some(Created::Section(id)) => Some(id),
            _ => None,
        }
    }

    pub fn insert_whitespace(&mut self, section: SectionId, index: usize) -> Option<WhitespaceId> {
        match self
            .apply(StagingAction::InsertWhitespace { section, index })
            .created()
        {
            Some(Created::Whitespace(id)) => Some(id),
            _ => None,
        }
    }

    pub fn activate_collection(&mut self, collection: CollectionId) -> StagingOutcome {
        self.apply(StagingAction::ActivateCollection { collection })
    }

    pub fn activate_section(&mut self, section: SectionId) -> StagingOutcome {
        self.apply(StagingAction::ActivateSection { section })
    }

    pub fn select_row(&mut self, row: RowRef) -> StagingOutcome {
        self.apply(StagingAction::SelectRow { row })
    }

    pub fn deselect(&mut self) -> StagingOutcome {
        self.apply(StagingAction::Deselect)
    }

    // ---- reducer ----

    /// Apply one action to the active collection.
    pub fn apply(&mut self, action: StagingAction) -> StagingOutcome {
        let kind = action.kind();
        let outcome = match self.apply_inner(action) {
            Ok(effect) => StagingOutcome::Applied {
                kind,
                touched: effect.touched,
                collapsed: effect.collapsed,
                created: effect.created,
            },
            Err(reason) => {
                debug!(?kind, %reason, "staging action ignored");
                StagingOutcome::Ignored { kind, reason }
            }
        };
        self.reconcile_focus();
        outcome
    }

    fn apply_inner(&mut self, action: StagingAction) -> Result<Effect, IgnoredReason> {
        match action {
            StagingAction::ActivateCollection { collection } => {
                if self.collection(collection).is_none() {
                    return Err(IgnoredReason::UnknownCollection(collection));
                }
                self.selection = Selection {
                    collection: Some(collection),
                    focus: EditFocus::Idle,
                };
                Ok(Effect::default())
            }
            StagingAction::ActivateSection { section } => {
                self.active()?
                    .section(section)
                    .ok_or(IgnoredReason::UnknownSection(section))?;
                self.selection.focus = self.selection.focus.select_section(section);
                Ok(Effect::default())
            }
            StagingAction::SelectRow { row } => {
                if !self.active()?.contains_row(row) {
                    return Err(IgnoredReason::UnknownRow(row));
                }
                self.selection.focus = self.selection.focus.select_row(row);
                Ok(Effect::default())
            }
            StagingAction::Deselect => {
                self.selection.focus = self.selection.focus.clear();
                Ok(Effect::default())
            }
            StagingAction::MoveRow { row, target } => self.move_row_inner(row, target),
            StagingAction::MoveSection { section, target } => {
                let collection = self.active_mut()?;
                let from = collection
                    .section_index(section)
                    .ok_or(IgnoredReason::UnknownSection(section))?;
                let to = collection
                    .section_index(target)
                    .ok_or(IgnoredReason::UnknownSection(target))?;
                if from == to {
                    return Err(IgnoredReason::NoChange);
                }
                let moved = collection.sections.remove(from);
                collection.sections.insert(to, moved);
                Ok(Effect::touched(vec![section, target]))
            }
            StagingAction::IncrementColumns { section } => {
                let max = self.policy.max_columns.max(1);
                let current = self.section_ref(section)?.columns;
                if current >= max {
                    return Err(IgnoredReason::NoChange);
                }
                self.set_columns(section, current + 1)
            }
            StagingAction::DecrementColumns { section } => {
                let current = self.section_ref(section)?.columns;
                if current <= 1 {
                    return Err(IgnoredReason::NoChange);
                }
                let columns = self.policy.clamp_columns(current - 1);
                self.set_columns(section, columns)
            }
            StagingAction::SetColumns { section, columns } => {
                let columns = self.policy.clamp_columns(columns);
                self.set_columns(section, columns)
            }
            StagingAction::ToggleTokens { tokens } => self.toggle_tokens_inner(tokens),
            StagingAction::AddSection { after, columns } => {
                let columns = self
                    .policy
                    .clamp_columns(columns.unwrap_or(self.policy.new_section_columns));
                let id = self.ids.section_id();
                let collection = self.active_mut()?;
                let at = match after {
                    Some(after) => {
                        collection
                            .section_index(after)
                            .ok_or(IgnoredReason::UnknownSection(after))?
                            + 1
                    }
                    None => collection.sections.len(),
                };
                collection
                    .sections
                    .insert(at, StagedSection::new(id, columns, Vec::new()));
                Ok(Effect {
                    touched: vec![id],
                    collapsed: Vec::new(),
                    created: Some(Created::Section(id)),
                })
            }
            StagingAction::RemoveSection { section } => {
                let collection = self.active_mut()?;
                let index = collection
                    .section_index(section)
                    .ok_or(IgnoredReason::UnknownSection(section))?;
                collection.sections.remove(index);
                Ok(Effect {
                    collapsed: vec![section],
                    ..Effect::default()
                })
            }
            StagingAction::InsertWhitespace { section, index } => {
                let id = self.ids.whitespace_id();
                let target = self.section_mut(section)?;
                let at = index.min(target.items.len());
                target
                    .items
                    .insert(at, Item::Whitespace(WhitespaceBlock::new(id)));
                Ok(Effect {
                    touched: vec![section],
                    collapsed: Vec::new(),
                    created: Some(Created::Whitespace(id)),
                })
            }
            StagingAction::RemoveWhitespace {
                section,
                whitespace,
            } => {
                let target = self.section_mut(section)?;
                let at = target
                    .position_of_whitespace(whitespace)
                    .ok_or(IgnoredReason::UnknownWhitespace(whitespace))?;
                target.items.remove(at);
                let collapsed = self.active_mut()?.collapse_empty(&[section]);
                Ok(Effect {
                    touched: vec![section],
                    collapsed,
                    created: None,
                })
            }
            StagingAction::ApplyOrder { section, order } => {
                let target = self.section_mut(section)?;
                let items = order
                    .apply_to(&target.items)
                    .ok_or(IgnoredReason::StaleOrder(section))?;
                if items == target.items {
                    return Err(IgnoredReason::NoChange);
                }
                target.items = items;
                Ok(Effect::touched(vec![section]))
            }
        }
    }

    fn move_row_inner(&mut self, row: RowRef, target: RowRef) -> Result<Effect, IgnoredReason> {
        if row == target {
            return Err(IgnoredReason::NoChange);
        }
        let collection = self.active_mut()?;
        let from = collection
            .section_index(row.section)
            .ok_or(IgnoredReason::UnknownSection(row.section))?;
        let to = collection
            .section_index(target.section)
            .ok_or(IgnoredReason::UnknownSection(target.section))?;
        let source_range = collection.sections[from]
            .row_range(row.index)
            .ok_or(IgnoredReason::UnknownRow(row))?;
        let target_section = &collection.sections[to];
        if target.index > target_section.row_count() {
            return Err(IgnoredReason::UnknownRow(target));
        }
        let target_start = (target.index * target_section.columns).min(target_section.items.len());
        let target_end = target_section
            .row_range(target.index)
            .map_or(target_start, |range| range.end);
        if from == to
            && target.index == target_section.row_count()
            && row.index + 1 == target.index
        {
            // The last row already sits at the end of its section.
            return Err(IgnoredReason::NoChange);
        }

        let moved: Vec<Item> = collection.sections[from].items.drain(source_range).collect();
        let at = if from != to || row.index > target.index {
            target_start
        } else {
            // Moving down within a section: land after the target row, whose
            // items shifted left by the removed row.
            target_end - moved.len()
        };
        let destination = &mut collection.sections[to].items;
        let at = at.min(destination.len());
        destination.splice(at..at, moved);

        let collapsed = collection.collapse_empty(&[row.section]);
        Ok(Effect {
            touched: vec![row.section, target.section],
            collapsed,
            created: None,
        })
    }

    fn toggle_tokens_inner(&mut self, tokens: Vec<TokenId>) -> Result<Effect, IgnoredReason> {
        if tokens.is_empty() {
            return Err(IgnoredReason::NoChange);
        }
        let focus = self.selection.focus;
        let new_section_columns = self.policy.clamp_columns(self.policy.new_section_columns);
        let fresh_id = self.ids.section_id();
        let collection = self.active_mut()?;

        // Resolve the destination before anything moves.
        let target = match focus.section() {
            Some(id) => collection
                .section_index(id)
                .map(|_| id)
                .ok_or(IgnoredReason::UnknownSection(id))?,
            None => match collection.sections.last() {
                Some(section) => section.id,
                None => {
                    collection
                        .sections
                        .push(StagedSection::new(fresh_id, new_section_columns, Vec::new()));
                    fresh_id
                }
            },
        };

        let mut seen: FxHashSet<TokenId> = FxHashSet::default();
        let mut incoming: Vec<Item> = Vec::new();
        let mut touched = vec![target];
        for token in tokens {
            if !seen.insert(token.clone()) {
                continue;
            }
            match collection.locate_token(&token) {
                Some((s, i)) => {
                    let source = &mut collection.sections[s];
                    source.items.remove(i);
                    if source.id != target {
                        if !touched.contains(&source.id) {
                            touched.push(source.id);
                        }
                        incoming.push(Item::Token(token));
                    }
                }
                None => incoming.push(Item::Token(token)),
            }
        }

        let destination = collection
            .section_index(target)
            .map(|index| &mut collection.sections[index])
            .ok_or(IgnoredReason::UnknownSection(target))?;
        let at = match focus {
            EditFocus::RowSelected(row) => destination
                .row_range(row.index)
                .map_or(destination.items.len(), |range| range.end),
            _ => destination.items.len(),
        };
        destination.items.splice(at..at, incoming);

        // The target empties when every token in it was toggled off.
        let collapsed = collection.collapse_empty(&touched);
        Ok(Effect {
            touched,
            collapsed,
            created: None,
        })
    }

    fn set_columns(&mut self, section: SectionId, columns: usize) -> Result<Effect, IgnoredReason> {
        let target = self.section_mut(section)?;
        if target.columns == columns {
            return Err(IgnoredReason::NoChange);
        }
        target.columns = columns.max(1);
        Ok(Effect::touched(vec![section]))
    }

    fn active(&self) -> Result<&StagedCollection, IgnoredReason> {
        let id = self
            .selection
            .collection
            .ok_or(IgnoredReason::NoActiveCollection)?;
        self.collection(id)
            .ok_or(IgnoredReason::UnknownCollection(id))
    }

    fn active_mut(&mut self) -> Result<&mut StagedCollection, IgnoredReason> {
        let id = self
            .selection
            .collection
            .ok_or(IgnoredReason::NoActiveCollection)?;
        self.collections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(IgnoredReason::UnknownCollection(id))
    }

    fn section_ref(&self, section: SectionId) -> Result<&StagedSection, IgnoredReason> {
        self.active()?
            .section(section)
            .ok_or(IgnoredReason::UnknownSection(section))
    }

    fn section_mut(&mut self, section: SectionId) -> Result<&mut StagedSection, IgnoredReason> {
        self.active_mut()?
            .sections
            .iter_mut()
            .find(|s| s.id == section)
            .ok_or(IgnoredReason::UnknownSection(section))
    }

    /// Demote focus that points at rows or sections which no longer exist.
    fn reconcile_focus(&mut self) {
        let focus = self.selection.focus;
        let demoted = match (self.active_collection(), focus) {
            (None, _) => EditFocus::Idle,
            (Some(_), EditFocus::Idle) => EditFocus::Idle,
            (Some(c), EditFocus::SectionSelected(s)) => {
                if c.section(s).is_some() {
                    focus
                } else {
                    EditFocus::Idle
                }
            }
            (Some(c), EditFocus::RowSelected(row)) => {
                if c.contains_row(row) {
                    focus
                } else if c.section(row.section).is_some() {
                    EditFocus::SectionSelected(row.section)
                } else {
                    EditFocus::Idle
                }
            }
        };
        self.selection.focus = demoted;
    }
}
