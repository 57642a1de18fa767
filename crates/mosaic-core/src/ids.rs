//! Identifiers for collection entities.
//!
//! Tokens carry identifiers minted by the external data layer, so
//! [`TokenId`] wraps an opaque string. Every structural entity the engine
//! synthesizes (sections, rows, whitespace cells, collections) uses a
//! non-zero `u64` drawn from an [`IdAllocator`]. Keeping these as distinct
//! types means a whitespace cell can never be confused with a token.
//!
//! Allocation is deterministic: two [`SequentialIds`] created with the same
//! seed hand out the same sequence, so repeated parses of unchanged input
//! produce identical structures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a token, as supplied by the data layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    /// Wrap an external identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for TokenId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Errors raised when constructing or allocating numeric identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdError {
    /// `0` is reserved and never a valid identifier.
    Zero,
    /// The allocator ran past `u64::MAX`.
    Exhausted,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "identifier 0 is invalid"),
            Self::Exhausted => write!(f, "identifier space exhausted"),
        }
    }
}

impl std::error::Error for IdError {}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create an identifier, rejecting 0.
            pub fn new(raw: u64) -> Result<Self, IdError> {
                if raw == 0 {
                    return Err(IdError::Zero);
                }
                Ok(Self(raw))
            }

            /// Get the raw numeric value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a section within a parsed or staged collection.
    SectionId,
    "section"
);
numeric_id!(
    /// Identifier of a row produced by the parser.
    RowId,
    "row"
);
numeric_id!(
    /// Identifier of a whitespace cell. Never persisted.
    WhitespaceId,
    "ws"
);
numeric_id!(
    /// Identifier of a staged collection.
    CollectionId,
    "collection"
);

/// Source of fresh structural identifiers.
///
/// Implementations must never return 0 and must not repeat a value within
/// their lifetime.
pub trait IdAllocator {
    /// Produce the next raw identifier.
    fn allocate(&mut self) -> u64;

    /// Next id as a [`SectionId`].
    ///
    /// Debug builds panic if [`allocate`](Self::allocate) breaks the
    /// non-zero contract.
    fn section_id(&mut self) -> SectionId {
        SectionId(nonzero(self.allocate()))
    }

    /// Next id as a [`RowId`]. Same contract as [`section_id`](Self::section_id).
    fn row_id(&mut self) -> RowId {
        RowId(nonzero(self.allocate()))
    }

    /// Next id as a [`WhitespaceId`]. Same contract as [`section_id`](Self::section_id).
    fn whitespace_id(&mut self) -> WhitespaceId {
        WhitespaceId(nonzero(self.allocate()))
    }

    /// Next id as a [`CollectionId`]. Same contract as [`section_id`](Self::section_id).
    fn collection_id(&mut self) -> CollectionId {
        CollectionId(nonzero(self.allocate()))
    }
}

#[inline]
fn nonzero(raw: u64) -> u64 {
    debug_assert_ne!(raw, 0, "IdAllocator::allocate returned 0");
    raw
}

/// Monotonic counter allocator.
///
/// Starts at the seed (default 1) and increments by one. On exhaustion it
/// saturates at `u64::MAX`; use [`SequentialIds::try_allocate`] to observe
/// the overflow instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    /// Start allocating from `seed`.
    pub fn starting_at(seed: u64) -> Result<Self, IdError> {
        if seed == 0 {
            return Err(IdError::Zero);
        }
        Ok(Self { next: seed })
    }

    /// Peek at the value the next allocation returns.
    #[must_use]
    pub const fn peek(&self) -> u64 {
        self.next
    }

    /// Allocate, reporting exhaustion.
    pub fn try_allocate(&mut self) -> Result<u64, IdError> {
        let current = self.next;
        let Some(next) = current.checked_add(1) else {
            return Err(IdError::Exhausted);
        };
        self.next = next;
        Ok(current)
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator for SequentialIds {
    fn allocate(&mut self) -> u64 {
        self.try_allocate().unwrap_or(u64::MAX)
    }
}
