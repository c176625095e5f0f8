//! Span-accurate text substitution.
//!
//! The engine rewrites a string at multiple, possibly adjacent,
//! non-overlapping character ranges in a single pass. Everything outside the
//! given spans is preserved byte-identically, including the full trailing
//! remainder after the last span.
//!
//! # Example
//!
//! ```rust
//! use codegraft::{augment, Span};
//!
//! let out = augment("abcdef", &[Span::new(1, 3)], &["X"]).unwrap();
//! assert_eq!(out, "aXdef");
//! ```
//!
//! # Input contract
//!
//! Spans must be sorted ascending by start offset, pairwise non-overlapping,
//! in bounds, and matched one-to-one with replacements. Violations are
//! rejected up front with [`Error::InvalidSpan`] or [`Error::LengthMismatch`]
//! rather than silently corrupting the output.

use crate::{Error, Result, Span};

/// Rewrite `text`, replacing the content of each span with the corresponding
/// replacement string.
///
/// Spans are character offsets. The output is the concatenation of the filler
/// segments between span boundaries interleaved with the replacements:
/// `filler[0], replacement[0], filler[1], replacement[1], …, filler[n]`,
/// where `filler[0]` runs from position 0 to the first span's start and
/// `filler[n]` is the full remainder after the last span's end.
///
/// # Errors
///
/// Returns [`Error::LengthMismatch`] when `spans` and `replacements` differ
/// in length, and [`Error::InvalidSpan`] when any span is empty, inverted,
/// out of bounds, or when spans are unsorted or overlapping.
pub fn augment<S: AsRef<str>>(text: &str, spans: &[Span], replacements: &[S]) -> Result<String> {
    if spans.len() != replacements.len() {
        return Err(Error::LengthMismatch {
            spans: spans.len(),
            replacements: replacements.len(),
        });
    }
    if spans.is_empty() {
        return Ok(text.to_string());
    }

    // Byte offset of every char boundary; boundaries[char_len] == text.len().
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let mut previous_end = 0usize;
    for span in spans {
        span.validate(char_len)?;
        if span.start < previous_end {
            return Err(Error::invalid_span(format!(
                "span [{}, {}) overlaps or precedes span ending at {}",
                span.start, span.end, previous_end
            )));
        }
        previous_end = span.end;
    }

    let slice = |from: usize, to: usize| &text[boundaries[from]..boundaries[to]];

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for (span, replacement) in spans.iter().zip(replacements) {
        out.push_str(slice(cursor, span.start));
        out.push_str(replacement.as_ref());
        cursor = span.end;
    }
    // Trailing filler: the full remainder, not an off-by-one-truncated one.
    out.push_str(slice(cursor, char_len));
    Ok(out)
}
