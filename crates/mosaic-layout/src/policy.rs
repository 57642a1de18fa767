//! Editor policy: tunables supplied by the host.
//!
//! `max_columns` comes from the host's entitlement resolver; the remaining
//! fields default to the values the editor has always used, so
//! `EditorPolicy::default()` needs no configuration file.
//!
//! # Loading
//!
//! ```toml
//! # mosaic-policy.toml
//! max_columns = 8
//! new_section_columns = 4
//!
//! [drag]
//! cell_size = 96.0
//! ```
//!
//! ```rust,ignore
//! let policy = EditorPolicy::from_toml_file("mosaic-policy.toml")?;
//! let policy = EditorPolicy::from_json_str(json)?;
//! ```

use std::fmt;
#[cfg(feature = "policy-config")]
use std::path::Path;

use mosaic_core::geometry::CellSize;
use serde::{Deserialize, Serialize};

/// Columns of the section synthesized for an empty collection.
pub const DEFAULT_EMPTY_SECTION_COLUMNS: usize = 3;
/// Columns assumed when a descriptor entry omits them.
pub const DEFAULT_FALLBACK_COLUMNS: usize = 1;
/// Upper bound on section columns absent an entitlement.
pub const DEFAULT_MAX_COLUMNS: usize = 6;

/// Drag-feedback tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragPolicy {
    /// Edge length of one grid cell in logical pixels.
    pub cell_size: f64,
    /// Whether dropping on an empty cell of the last row moves the item to
    /// the final position.
    pub allow_trailing_drop: bool,
}

impl Default for DragPolicy {
    fn default() -> Self {
        Self {
            cell_size: 100.0,
            allow_trailing_drop: true,
        }
    }
}

impl DragPolicy {
    /// Validated cell size, if finite and positive.
    #[must_use]
    pub fn cell_size(&self) -> Option<CellSize> {
        CellSize::new(self.cell_size)
    }
}

/// Tunables for parsing and staging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorPolicy {
    /// Highest column count a section may be given (≥ 1).
    pub max_columns: usize,
    /// Columns of the single section produced for an empty token list.
    pub empty_section_columns: usize,
    /// Columns used when a descriptor entry is missing or zero.
    pub fallback_columns: usize,
    /// Columns of sections created while editing.
    pub new_section_columns: usize,
    pub drag: DragPolicy,
}

impl Default for EditorPolicy {
    fn default() -> Self {
        Self {
            max_columns: DEFAULT_MAX_COLUMNS,
            empty_section_columns: DEFAULT_EMPTY_SECTION_COLUMNS,
            fallback_columns: DEFAULT_FALLBACK_COLUMNS,
            new_section_columns: DEFAULT_EMPTY_SECTION_COLUMNS,
            drag: DragPolicy::default(),
        }
    }
}

impl EditorPolicy {
    /// Override the column ceiling.
    #[must_use]
    pub fn with_max_columns(mut self, max_columns: usize) -> Self {
        self.max_columns = max_columns;
        self
    }

    /// Clamp a requested column count to `[1, max_columns]`.
    #[must_use]
    pub fn clamp_columns(&self, columns: usize) -> usize {
        columns.clamp(1, self.max_columns.max(1))
    }

    /// Validate all parameters.
    ///
    /// Returns a list of problems; an empty list means the policy is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_columns == 0 {
            errors.push("max_columns must be >= 1".to_string());
        }
        for (name, value) in [
            ("empty_section_columns", self.empty_section_columns),
            ("fallback_columns", self.fallback_columns),
            ("new_section_columns", self.new_section_columns),
        ] {
            if value == 0 {
                errors.push(format!("{name} must be >= 1"));
            }
        }
        if self.drag.cell_size().is_none() {
            errors.push(format!(
                "drag.cell_size must be finite and > 0, got {}",
                self.drag.cell_size
            ));
        }
        errors
    }

    /// Return the policy if it validates.
    pub fn validated(self) -> Result<Self, PolicyError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(PolicyError::Invalid(errors))
        }
    }

    /// Load from a TOML string.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, PolicyError> {
        let policy: Self = toml::from_str(s).map_err(PolicyError::Toml)?;
        policy.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PolicyError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(s: &str) -> Result<Self, PolicyError> {
        let policy: Self = serde_json::from_str(s).map_err(PolicyError::Json)?;
        policy.validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PolicyError::Io)?;
        Self::from_json_str(&content)
    }
}

/// Errors from loading or validating a policy.
#[derive(Debug)]
pub enum PolicyError {
    /// One or more parameters out of range.
    Invalid(Vec<String>),
    #[cfg(feature = "policy-config")]
    Io(std::io::Error),
    #[cfg(feature = "policy-config")]
    Toml(toml::de::Error),
    #[cfg(feature = "policy-config")]
    Json(serde_json::Error),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(errors) => write!(f, "invalid editor policy: {}", errors.join("; ")),
            #[cfg(feature = "policy-config")]
            Self::Io(e) => write!(f, "policy file I/O error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => write!(f, "policy TOML parse error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => write!(f, "policy JSON parse error: {e}"),
        }
    }
}

impl std::error::Error for PolicyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid(_) => None,
            #[cfg(feature = "policy-config")]
            Self::Io(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => Some(e),
        }
    }
}
