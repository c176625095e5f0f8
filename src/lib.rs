//! # codegraft
//!
//! Synonym augmentation and sibling-code synthesis for coded clinical text.
//!
//! Given documents with gold diagnostic-code labels and externally supplied
//! mention spans, codegraft produces augmented/synthetic training rows by
//! rewriting mention text and, in synthesis mode, remapping the labels to
//! match.
//!
//! - **Augmentation**: substitute mentions with synonyms of their own code;
//!   labels never change.
//! - **Synthesis**: substitute "unspecified" mentions with phrasing of a
//!   hierarchically adjacent (sibling) code and remap the label set
//!   consistently.
//!
//! ## Pipeline
//!
//! | Stage | Entry point | Runs |
//! |-------|-------------|------|
//! | Family derivation | [`build_hierarchy`] | once, offline |
//! | Shot bucketing | [`classify_shots`] | once, offline |
//! | Conversion table | [`build_conversion_table`] | once, offline; persisted |
//! | Synonym augmentation | [`Augmenter`] | per document |
//! | Sibling-code synthesis | [`Synthesizer`] | per document |
//!
//! The conversion table is the only artifact shared between the offline
//! build and the per-document phase; serialize it with
//! [`ConversionTable::save`] and reload with [`ConversionTable::load`].
//!
//! ## Quick start
//!
//! ```rust
//! use codegraft::{augment, Span};
//!
//! // The span engine rewrites character ranges without touching anything else.
//! let rewritten = augment(
//!     "patient has type 2 diabetes",
//!     &[Span::new(19, 27)],
//!     &["diabetic neuropathy"],
//! )?;
//! assert_eq!(rewritten, "patient has type 2 diabetic neuropathy");
//! # Ok::<(), codegraft::Error>(())
//! ```
//!
//! ## Design notes
//!
//! - All spans are **character** offsets; see [`Span`].
//! - Randomness is explicit: drivers take a seed and draw through
//!   [`Sampler`], so a fixed seed and document order reproduce a corpus
//!   byte-identically.
//! - Synonym lookup is injected via the [`SynonymSource`] trait — no global
//!   ontology state.
//! - Collaborators returning "no data" (unknown code, empty candidate list)
//!   skip the mention; they never fail a run.

#![warn(missing_docs)]

pub mod augment;
pub mod conversion;
pub mod document;
mod error;
pub mod hierarchy;
pub mod sampler;
pub mod shots;
pub mod synthesis;

pub use augment::augment;
pub use conversion::{build_conversion_table, ConversionEntry, ConversionTable};
pub use document::{split_labels, Document, Mention, Span};
pub use error::{Error, Result};
pub use hierarchy::{build_hierarchy, FamilyEntry, FamilyTable, Taxonomy, TaxonomyNode};
pub use sampler::Sampler;
pub use shots::{classify_shots, ShotBucket, ShotSets, FEW_SHOT_MAX};
pub use synthesis::{
    merge_variants, AugmentReport, Augmenter, LabelMap, SynonymMap, SynonymSource, SynthesisReport,
    Synthesizer,
};
