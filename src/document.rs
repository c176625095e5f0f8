//! Documents, mentions, and character spans.
//!
//! All offsets in this crate are **character** offsets, not byte offsets.
//! Upstream recognizers report entity positions the way humans count them,
//! and char offsets stay stable across ASCII and non-ASCII text. Conversion
//! to byte boundaries happens inside the augmentation engine, at the last
//! possible moment.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A half-open `[start, end)` character range into a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Start position (character offset, inclusive).
    pub start: usize,
    /// End position (character offset, exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of characters covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True when the span covers no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Check if this span overlaps with another.
    #[must_use]
    pub fn overlaps(&self, other: &Span) -> bool {
        !(self.end <= other.start || other.end <= self.start)
    }

    /// Validate against a text of `char_len` characters.
    ///
    /// A valid span satisfies `start < end <= char_len`.
    pub fn validate(&self, char_len: usize) -> Result<()> {
        if self.start >= self.end {
            return Err(Error::invalid_span(format!(
                "empty or inverted span [{}, {})",
                self.start, self.end
            )));
        }
        if self.end > char_len {
            return Err(Error::invalid_span(format!(
                "span [{}, {}) exceeds text length {}",
                self.start, self.end, char_len
            )));
        }
        Ok(())
    }
}

/// A source document with its gold code labels.
///
/// Immutable input: augmentation and synthesis always produce a *new*
/// `Document`, never mutate one in place. Labels are kept sorted so that
/// per-document processing order is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier.
    pub id: String,
    /// Raw text.
    pub text: String,
    /// Gold code labels.
    pub labels: BTreeSet<String>,
}

impl Document {
    /// Create a new document.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        labels: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a document from a `;`-delimited label string.
    ///
    /// Empty fragments (from leading/trailing/doubled delimiters) are dropped.
    #[must_use]
    pub fn with_delimited_labels(
        id: impl Into<String>,
        text: impl Into<String>,
        labels: &str,
    ) -> Self {
        Self::new(id, text, split_labels(labels))
    }

    /// Number of characters in the text.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Derive a new document with rewritten text and labels, keeping the id.
    #[must_use]
    pub fn rewritten(&self, text: String, labels: BTreeSet<String>) -> Self {
        Self {
            id: self.id.clone(),
            text,
            labels,
        }
    }
}

/// Split a `;`-delimited label list, dropping empty fragments.
pub fn split_labels(labels: &str) -> impl Iterator<Item = &str> {
    labels
        .split(';')
        .map(str::trim)
        .filter(|label| !label.is_empty())
}

/// One recognized concept occurrence inside a document.
///
/// Mentions come from an upstream recognizer with spans already resolved to
/// character offsets. They are assumed individually valid but **not**
/// guaranteed non-overlapping or sorted; the synthesis driver enforces or
/// rejects that before any text is rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Concept identifier assigned by the recognizer.
    pub concept_id: String,
    /// Source code assigned to the mention.
    pub code: String,
    /// Character span into the document's text.
    pub span: Span,
    /// Candidate replacement strings supplied by the ontology collaborator.
    pub synonyms: Vec<String>,
}

impl Mention {
    /// Create a new mention.
    #[must_use]
    pub fn new(
        concept_id: impl Into<String>,
        code: impl Into<String>,
        span: Span,
        synonyms: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            concept_id: concept_id.into(),
            code: code.into(),
            span,
            synonyms: synonyms.into_iter().map(Into::into).collect(),
        }
    }

    /// Extract the mention's surface form from the document text.
    ///
    /// Returns `None` when the span does not fit the text.
    #[must_use]
    pub fn surface(&self, text: &str) -> Option<String> {
        if self.span.validate(text.chars().count()).is_err() {
            return None;
        }
        Some(
            text.chars()
                .skip(self.span.start)
                .take(self.span.len())
                .collect(),
        )
    }
}
