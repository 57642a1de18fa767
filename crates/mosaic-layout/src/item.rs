//! Grid cell contents.

use mosaic_core::ids::{TokenId, WhitespaceId};
use serde::{Deserialize, Serialize};

/// Anything that can stand in for a token: the engine only needs its id.
pub trait TokenLike {
    fn token_id(&self) -> &TokenId;
}

impl TokenLike for TokenId {
    fn token_id(&self) -> &TokenId {
        self
    }
}

impl<T: TokenLike + ?Sized> TokenLike for &T {
    fn token_id(&self) -> &TokenId {
        (**self).token_id()
    }
}

/// Placeholder reserving one empty grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WhitespaceBlock {
    pub id: WhitespaceId,
}

impl WhitespaceBlock {
    #[must_use]
    pub const fn new(id: WhitespaceId) -> Self {
        Self { id }
    }
}

/// One cell of a section: a token or deliberate whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Item<T = TokenId> {
    Token(T),
    Whitespace(WhitespaceBlock),
}

impl<T> Item<T> {
    #[must_use]
    pub const fn is_whitespace(&self) -> bool {
        matches!(self, Self::Whitespace(_))
    }

    #[must_use]
    pub const fn as_token(&self) -> Option<&T> {
        match self {
            Self::Token(token) => Some(token),
            Self::Whitespace(_) => None,
        }
    }

    /// Map the token payload, keeping whitespace untouched.
    pub fn map_token<U>(self, f: impl FnOnce(T) -> U) -> Item<U> {
        match self {
            Self::Token(token) => Item::Token(f(token)),
            Self::Whitespace(block) => Item::Whitespace(block),
        }
    }
}

impl<T: TokenLike> Item<T> {
    /// Token id, or `None` for whitespace.
    #[must_use]
    pub fn token_id(&self) -> Option<&TokenId> {
        self.as_token().map(TokenLike::token_id)
    }
}
