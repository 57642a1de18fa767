//! Persisted layout descriptor and its diagnostics.
//!
//! A [`LayoutDescriptor`] is the compact form stored next to a collection's
//! flat token list:
//!
//! ```json
//! {
//!   "sections": [0, 4],
//!   "sectionLayout": [
//!     { "columns": 2, "whitespace": [1] },
//!     { "columns": 3, "whitespace": [] }
//!   ]
//! }
//! ```
//!
//! `sections[i]` is the flat index where section `i` starts;
//! `sectionLayout[i]` holds its column count and whitespace offsets (see
//! [`crate::whitespace`] for the offset convention).
//!
//! The parser heals malformed descriptors instead of rejecting them.
//! [`LayoutDescriptor::report`] lists what it would heal, and
//! [`LayoutDescriptor::validate_strict`] turns the first finding into an
//! error for callers that prefer to refuse bad data.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-section persisted settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionLayout {
    /// Column count; absent in some legacy records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<usize>,
    /// Whitespace insertion offsets.
    #[serde(default)]
    pub whitespace: Vec<usize>,
}

impl SectionLayout {
    #[must_use]
    pub fn new(columns: usize) -> Self {
        Self {
            columns: Some(columns),
            whitespace: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_whitespace(mut self, whitespace: impl IntoIterator<Item = usize>) -> Self {
        self.whitespace = whitespace.into_iter().collect();
        self
    }
}

/// Section boundaries plus per-section layout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDescriptor {
    /// Start offsets into the flat token list, strictly increasing from 0.
    #[serde(default)]
    pub sections: Vec<usize>,
    /// Parallel to `sections`.
    #[serde(default)]
    pub section_layout: Vec<SectionLayout>,
}

impl LayoutDescriptor {
    /// One section starting at 0 with `columns` columns.
    #[must_use]
    pub fn single_section(columns: usize) -> Self {
        Self {
            sections: vec![0],
            section_layout: vec![SectionLayout::new(columns)],
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.section_layout.is_empty()
    }

    /// Every healing the parser would apply for a token list of
    /// `token_count` entries.
    #[must_use]
    pub fn report(&self, token_count: usize) -> DescriptorReport {
        let mut issues = Vec::new();

        if self.sections.len() != self.section_layout.len() {
            issues.push(DescriptorIssue {
                code: DescriptorIssueCode::LayoutLengthMismatch,
                section: None,
                message: format!(
                    "{} section offsets but {} layout entries",
                    self.sections.len(),
                    self.section_layout.len()
                ),
            });
        }

        if let Some(&first) = self.sections.first()
            && first != 0
        {
            issues.push(DescriptorIssue {
                code: DescriptorIssueCode::FirstOffsetNotZero,
                section: Some(0),
                message: format!("first section starts at {first}"),
            });
        }

        let mut prev: Option<usize> = None;
        for (index, &start) in self.sections.iter().enumerate() {
            if start > token_count {
                issues.push(DescriptorIssue {
                    code: DescriptorIssueCode::OffsetOutOfRange,
                    section: Some(index),
                    message: format!("offset {start} exceeds token count {token_count}"),
                });
            }
            if let Some(prev) = prev
                && start <= prev
            {
                issues.push(DescriptorIssue {
                    code: DescriptorIssueCode::NonIncreasingOffset,
                    section: Some(index),
                    message: format!("offset {start} does not exceed previous {prev}"),
                });
            }
            prev = Some(start);
        }

        for (index, layout) in self.section_layout.iter().enumerate() {
            match layout.columns {
                None => issues.push(DescriptorIssue {
                    code: DescriptorIssueCode::MissingColumns,
                    section: Some(index),
                    message: "columns absent".to_string(),
                }),
                Some(0) => issues.push(DescriptorIssue {
                    code: DescriptorIssueCode::ZeroColumns,
                    section: Some(index),
                    message: "columns is 0".to_string(),
                }),
                Some(_) => {}
            }

            if layout.whitespace.windows(2).any(|w| w[1] < w[0]) {
                issues.push(DescriptorIssue {
                    code: DescriptorIssueCode::WhitespaceNotAscending,
                    section: Some(index),
                    message: format!("whitespace offsets {:?} not ascending", layout.whitespace),
                });
            }

            let span = self.span_len(index, token_count);
            // The k-th insertion lands at offset + k in a list of span + k.
            for &offset in &layout.whitespace {
                if offset > span {
                    issues.push(DescriptorIssue {
                        code: DescriptorIssueCode::WhitespaceOffsetOutOfRange,
                        section: Some(index),
                        message: format!(
                            "whitespace offset {offset} past end of {span}-token section"
                        ),
                    });
                }
            }
        }

        DescriptorReport { issues }
    }

    /// Reject the descriptor on its first issue.
    pub fn validate_strict(&self, token_count: usize) -> Result<(), DescriptorError> {
        match self.report(token_count).issues.into_iter().next() {
            Some(issue) => Err(DescriptorError { issue }),
            None => Ok(()),
        }
    }

    /// Tokens in section `index` as the raw offsets describe it, clamped to
    /// the token list.
    fn span_len(&self, index: usize, token_count: usize) -> usize {
        let Some(&start) = self.sections.get(index) else {
            return 0;
        };
        let end = self
            .sections
            .get(index + 1)
            .copied()
            .unwrap_or(token_count)
            .min(token_count);
        end.saturating_sub(start.min(token_count))
    }
}

/// Machine-readable issue category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorIssueCode {
    FirstOffsetNotZero,
    NonIncreasingOffset,
    OffsetOutOfRange,
    LayoutLengthMismatch,
    MissingColumns,
    ZeroColumns,
    WhitespaceOffsetOutOfRange,
    WhitespaceNotAscending,
}

/// One finding from [`LayoutDescriptor::report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorIssue {
    pub code: DescriptorIssueCode,
    /// Index of the offending section, when the issue is section-scoped.
    pub section: Option<usize>,
    pub message: String,
}

/// All findings for one descriptor/token-count pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DescriptorReport {
    pub issues: Vec<DescriptorIssue>,
}

impl DescriptorReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    #[must_use]
    pub fn has(&self, code: DescriptorIssueCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}

/// Strict validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorError {
    pub issue: DescriptorIssue,
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.issue.section {
            Some(section) => write!(
                f,
                "invalid layout descriptor ({:?}, section {section}): {}",
                self.issue.code, self.issue.message
            ),
            None => write!(
                f,
                "invalid layout descriptor ({:?}): {}",
                self.issue.code, self.issue.message
            ),
        }
    }
}

impl std::error::Error for DescriptorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_matches_persisted_form() {
        let json = concat!(
            r#"{"sections":[0,4],"sectionLayout":"#,
            r#"[{"columns":2,"whitespace":[1]},{"columns":3,"whitespace":[]}]}"#,
        );
        let descriptor: LayoutDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.sections, vec![0, 4]);
        assert_eq!(descriptor.section_layout[0], SectionLayout::new(2).with_whitespace([1]));
        assert_eq!(serde_json::to_string(&descriptor).unwrap(), json);
    }

    #[test]
    fn missing_fields_default() {
        let descriptor: LayoutDescriptor =
            serde_json::from_str(r#"{"sectionLayout":[{}]}"#).unwrap();
        assert!(descriptor.sections.is_empty());
        assert_eq!(descriptor.section_layout[0].columns, None);
        assert!(descriptor.section_layout[0].whitespace.is_empty());
    }

    #[test]
    fn clean_descriptor_reports_nothing() {
        let descriptor = LayoutDescriptor {
            sections: vec![0, 3],
            section_layout: vec![
                SectionLayout::new(3).with_whitespace([0, 3]),
                SectionLayout::new(2),
            ],
        };
        assert!(descriptor.report(5).is_clean());
        assert!(descriptor.validate_strict(5).is_ok());
    }

    #[test]
    fn structural_issues_detected() {
        let descriptor = LayoutDescriptor {
            sections: vec![1, 1, 9],
            section_layout: vec![SectionLayout::default(), SectionLayout::new(0)],
        };
        let report = descriptor.report(4);
        assert!(report.has(DescriptorIssueCode::LayoutLengthMismatch));
        assert!(report.has(DescriptorIssueCode::FirstOffsetNotZero));
        assert!(report.has(DescriptorIssueCode::NonIncreasingOffset));
        assert!(report.has(DescriptorIssueCode::OffsetOutOfRange));
        assert!(report.has(DescriptorIssueCode::MissingColumns));
        assert!(report.has(DescriptorIssueCode::ZeroColumns));
    }

    #[test]
    fn whitespace_issues_detected() {
        let descriptor = LayoutDescriptor {
            sections: vec![0],
            section_layout: vec![SectionLayout::new(2).with_whitespace([3, 1])],
        };
        let report = descriptor.report(2);
        assert!(report.has(DescriptorIssueCode::WhitespaceNotAscending));
        assert!(report.has(DescriptorIssueCode::WhitespaceOffsetOutOfRange));
    }

    #[test]
    fn strict_validation_surfaces_first_issue() {
        let descriptor = LayoutDescriptor {
            sections: vec![0],
            section_layout: vec![],
        };
        let err = descriptor.validate_strict(2).unwrap_err();
        assert_eq!(err.issue.code, DescriptorIssueCode::LayoutLengthMismatch);
        assert!(err.to_string().contains("1 section offsets but 0 layout entries"));
    }
}
