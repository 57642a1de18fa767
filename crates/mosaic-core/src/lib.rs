#![forbid(unsafe_code)]

//! Core: identifiers, pixel geometry, and logging for Mosaic.
//!
//! # Role in Mosaic
//! `mosaic-core` holds the vocabulary shared by the layout engine and its
//! hosts: token and structural identifiers, the deterministic
//! [`IdAllocator`](ids::IdAllocator), pixel [`Point`](geometry::Point)s fed in
//! by gesture recognizers, and the tracing facade.
//!
//! # How it fits in the system
//! `mosaic-layout` consumes these types to parse persisted descriptors,
//! stage edits, and translate pointer positions into grid slots. The host
//! application owns data fetching, gesture recognition, and persistence.

pub mod geometry;
pub mod ids;
pub mod logging;

pub use geometry::{CellSize, Point};
pub use ids::{
    CollectionId, IdAllocator, IdError, RowId, SectionId, SequentialIds, TokenId, WhitespaceId,
};
