#![forbid(unsafe_code)]

//! Collection layout engine: parsing, encoding, staging, and drag reordering.
//!
//! A collection is persisted as a flat token list plus a compact
//! [`LayoutDescriptor`]. [`LayoutParser`] turns that pair into sections of
//! fixed-column rows with whitespace cells, [`StagingStore`] edits the result,
//! and [`encode`] turns it back into the persisted pair.
//! [`DragReorderController`] translates pointer positions into swap-based
//! reorders that the store applies with [`StagingAction::ApplyOrder`].
//!
//! ```rust
//! use mosaic_core::ids::TokenId;
//! use mosaic_layout::{LayoutDescriptor, SectionLayout, StagingStore};
//!
//! let tokens: Vec<TokenId> = ["a", "b", "c"].into_iter().map(TokenId::from).collect();
//! let layout = LayoutDescriptor {
//!     sections: vec![0],
//!     section_layout: vec![SectionLayout::new(2).with_whitespace([1])],
//! };
//!
//! let mut store = StagingStore::default();
//! let id = store.load_collection(&tokens, &layout);
//! let encoded = store.commit(id).unwrap();
//! assert_eq!(encoded.tokens, tokens);
//! assert_eq!(encoded.layout, layout);
//! ```

pub mod descriptor;
pub mod drag;
pub mod encoder;
pub mod grid;
pub mod item;
pub mod parser;
pub mod policy;
pub mod staging;
pub mod whitespace;

pub use descriptor::{
    DescriptorError, DescriptorIssue, DescriptorIssueCode, DescriptorReport, LayoutDescriptor,
    SectionLayout,
};
pub use drag::{DragReorderController, DragSwap, Reorder};
pub use encoder::{EncodedLayout, encode, encode_parsed, encode_sections};
pub use grid::{GridGeometry, MAX_EXACT_ORDER, order_from_position, position_from_order};
pub use item::{Item, TokenLike, WhitespaceBlock};
pub use parser::{LayoutParser, ParsedLayout, Row, Section, parse_layout};
pub use policy::{DragPolicy, EditorPolicy, PolicyError};
pub use staging::{
    Created, EditFocus, IgnoredReason, RowRef, Selection, StagedCollection, StagedRow,
    StagedSection, StagingAction, StagingActionKind, StagingOutcome, StagingStore,
};
pub use whitespace::{insert_whitespace, whitespace_offsets};
