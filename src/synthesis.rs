//! Per-document augmentation and sibling-code synthesis.
//!
//! Two independently usable drivers sit on top of the augmentation engine:
//!
//! | Driver | Text change | Label change |
//! |--------|-------------|--------------|
//! | [`Augmenter`] | synonyms of the mention's own code | never |
//! | [`Synthesizer`] | synonyms of the *replacement* code | remapped via the conversion table |
//!
//! Both process one document at a time with no shared mutable state beyond
//! their own sampler, so a corpus can be sharded across workers that each own
//! a driver and share the read-only conversion table and synonym source.
//!
//! # Example
//!
//! ```rust
//! use codegraft::{
//!     build_conversion_table, build_hierarchy, classify_shots, Document, Mention, Span,
//!     SynonymMap, Synthesizer, Taxonomy, TaxonomyNode,
//! };
//!
//! let mut taxonomy = Taxonomy::new();
//! taxonomy.insert(
//!     "250.60".into(),
//!     TaxonomyNode::new("250.6", "250", "Diabetes with unspecified complication"),
//! );
//! taxonomy.insert(
//!     "250.61".into(),
//!     TaxonomyNode::new("250.6", "250", "Diabetic neuropathy"),
//! );
//! let families = build_hierarchy(&taxonomy);
//!
//! let train: Vec<String> = std::iter::repeat("250.60".to_string())
//!     .take(6)
//!     .chain(std::iter::once("250.61".to_string()))
//!     .collect();
//! let shots = classify_shots(&train, &[], &[]);
//! let table = build_conversion_table(&families, &shots);
//!
//! let mut synonyms = SynonymMap::new();
//! synonyms.insert_delimited("250.61", "diabetic neuropathy");
//!
//! let doc = Document::new("1", "patient has type 2 diabetes with complications", ["250.60"]);
//! let mentions = vec![Mention::new(
//!     "C0011860",
//!     "250.60",
//!     Span::new(19, 46),
//!     ["diabetes with complications"],
//! )];
//!
//! let mut synthesizer = Synthesizer::new(&table, &synonyms, 42);
//! let out = synthesizer.synthesize_document(&doc, &mentions).unwrap().unwrap();
//! assert_eq!(out.text, "patient has type 2 diabetic neuropathy");
//! assert!(out.labels.contains("250.61"));
//! assert!(!out.labels.contains("250.60"));
//! ```

use crate::augment::augment;
use crate::conversion::ConversionTable;
use crate::document::{Document, Mention, Span};
use crate::sampler::Sampler;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-document mapping original label → replacement label.
///
/// Identity for unchanged labels. Built fresh per document, consumed
/// immediately, never persisted.
pub type LabelMap = BTreeMap<String, String>;

/// Synonym lookup collaborator.
///
/// Injected into the [`Synthesizer`] so tests can substitute a fake and so
/// no process-wide ontology singleton is needed. Returning `None` (unknown
/// code) or an empty list means "no replacement available" and is never an
/// error.
pub trait SynonymSource {
    /// Synonym strings for a code, or `None` when the code is unknown.
    fn synonyms(&self, code: &str) -> Option<Vec<String>>;
}

/// In-memory synonym table, one `|`-delimited synonym list per code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl SynonymMap {
    /// Create an empty synonym table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a code's synonyms from a `|`-delimited string.
    ///
    /// Empty fragments are dropped; inserting again replaces the old list.
    pub fn insert_delimited(&mut self, code: impl Into<String>, synonyms: &str) {
        let list: Vec<String> = synonyms
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        self.entries.insert(code.into(), list);
    }

    /// Number of codes with synonym lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no code has synonyms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SynonymSource for SynonymMap {
    fn synonyms(&self, code: &str) -> Option<Vec<String>> {
        self.entries.get(code).cloned()
    }
}

/// Tally of a synonym-augmentation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentReport {
    /// Documents processed.
    pub documents: usize,
    /// Documents whose text actually changed.
    pub changed: usize,
    /// Mentions rejected for malformed or conflicting spans.
    pub rejected_mentions: usize,
}

/// Tally of a sibling-code synthesis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisReport {
    /// Document passes attempted (documents × iterations).
    pub documents: usize,
    /// Synthetic rows emitted (after duplicate dropping).
    pub produced: usize,
    /// Passes where no mention yielded a usable synonym.
    pub no_synthesis: usize,
    /// Passes rejected for malformed or overlapping spans.
    pub rejected: usize,
    /// Emitted rows whose text differs from the source document.
    pub changed: usize,
    /// Exact-duplicate rows dropped at merge time.
    pub duplicates: usize,
}

/// Synonym-augmentation driver: rewrites mention spans with synonyms of the
/// mention's own code, leaving labels untouched.
#[derive(Debug, Clone)]
pub struct Augmenter {
    probability: f64,
    sampler: Sampler,
}

impl Augmenter {
    /// Create a driver substituting each eligible mention with the given
    /// independent probability, drawing from an explicitly seeded sampler.
    #[must_use]
    pub fn new(probability: f64, seed: u64) -> Self {
        Self {
            probability,
            sampler: Sampler::new(seed),
        }
    }

    /// Produce the augmented counterpart of one document.
    ///
    /// Eligible mentions are those whose assigned code is among the
    /// document's gold labels. Candidates case-insensitively equal to the
    /// original surface form are excluded; a mention with no remaining
    /// candidate is left untouched. Malformed or conflicting spans reject
    /// the mention, not the document.
    pub fn augment_document(
        &mut self,
        doc: &Document,
        mentions: &[Mention],
    ) -> Result<(Document, usize)> {
        let char_len = doc.char_len();
        let mut scheduled: Vec<(Span, String)> = Vec::new();
        let mut rejected = 0usize;

        for mention in mentions {
            if !doc.labels.contains(&mention.code) || !self.sampler.accept(self.probability) {
                continue;
            }
            if mention.span.validate(char_len).is_err() {
                rejected += 1;
                log::debug!(
                    "doc {}: dropping mention {} with bad span [{}, {})",
                    doc.id,
                    mention.concept_id,
                    mention.span.start,
                    mention.span.end
                );
                continue;
            }
            let surface = mention
                .surface(&doc.text)
                .unwrap_or_default()
                .to_lowercase();
            let candidates: Vec<&String> = mention
                .synonyms
                .iter()
                .filter(|candidate| candidate.to_lowercase() != surface)
                .collect();
            if let Some(replacement) = self.sampler.pick(&candidates) {
                scheduled.push((mention.span, (*replacement).clone()));
            }
        }

        scheduled.sort_by_key(|(span, _)| *span);
        let mut kept: Vec<(Span, String)> = Vec::new();
        for (span, replacement) in scheduled {
            match kept.last() {
                Some((previous, _)) if span.start < previous.end => {
                    rejected += 1;
                    log::debug!(
                        "doc {}: dropping span [{}, {}) overlapping [{}, {})",
                        doc.id,
                        span.start,
                        span.end,
                        previous.start,
                        previous.end
                    );
                }
                _ => kept.push((span, replacement)),
            }
        }

        let (spans, replacements): (Vec<Span>, Vec<String>) = kept.into_iter().unzip();
        let text = augment(&doc.text, &spans, &replacements)?;
        Ok((doc.rewritten(text, doc.labels.clone()), rejected))
    }

    /// Augment a whole corpus, one output row per input document.
    pub fn augment_corpus(
        &mut self,
        corpus: &[(Document, Vec<Mention>)],
    ) -> (Vec<Document>, AugmentReport) {
        let mut rows = Vec::with_capacity(corpus.len());
        let mut report = AugmentReport::default();
        for (doc, mentions) in corpus {
            report.documents += 1;
            match self.augment_document(doc, mentions) {
                Ok((row, rejected)) => {
                    report.rejected_mentions += rejected;
                    if row.text != doc.text {
                        report.changed += 1;
                    }
                    rows.push(row);
                }
                Err(err) => {
                    report.rejected_mentions += 1;
                    log::warn!("doc {}: augmentation failed: {err}", doc.id);
                    rows.push(doc.clone());
                }
            }
        }
        log::info!("{} augmented rows ({} changed)", rows.len(), report.changed);
        (rows, report)
    }
}

/// Sibling-code synthesis driver: rewrites unspecified mentions with
/// synonyms of a sibling code and remaps the gold labels to match.
#[derive(Debug)]
pub struct Synthesizer<'a, S: SynonymSource> {
    table: &'a ConversionTable,
    synonyms: &'a S,
    unspecified: BTreeSet<String>,
    sampler: Sampler,
}

impl<'a, S: SynonymSource> Synthesizer<'a, S> {
    /// Create a driver over a pre-built conversion table and an injected
    /// synonym source, drawing from an explicitly seeded sampler.
    ///
    /// The global unspecified-code list is derived from the table
    /// ([`ConversionTable::unspecified_codes`]).
    #[must_use]
    pub fn new(table: &'a ConversionTable, synonyms: &'a S, seed: u64) -> Self {
        Self {
            unspecified: table.unspecified_codes(),
            table,
            synonyms,
            sampler: Sampler::new(seed),
        }
    }

    /// Replace the derived global unspecified-code list.
    #[must_use]
    pub fn with_unspecified_codes(mut self, codes: BTreeSet<String>) -> Self {
        self.unspecified = codes;
        self
    }

    /// Compute the per-document label map.
    ///
    /// For each label present in the conversion table, the first bucket in
    /// `zero → few → normal` order with a viable sibling is probed; labels
    /// that are also globally unspecified and have such a bucket map to one
    /// sibling drawn uniformly at random, everything else to itself.
    pub fn convert_labels(&mut self, labels: &BTreeSet<String>) -> LabelMap {
        let mut map = LabelMap::new();
        for code in labels {
            let replacement = match self.table.viable_bucket(code) {
                Some(bucket) if self.unspecified.contains(code) => {
                    let siblings: Vec<&String> = self
                        .table
                        .siblings(code, bucket)
                        .map(|set| set.iter().collect())
                        .unwrap_or_default();
                    self.sampler
                        .pick(&siblings)
                        .map_or_else(|| code.clone(), |sibling| (*sibling).clone())
                }
                _ => code.clone(),
            };
            map.insert(code.clone(), replacement);
        }
        map
    }

    /// Attempt one synthesis pass over a document.
    ///
    /// Returns `Ok(None)` when no mention yields a usable synonym — an
    /// expected outcome, not an error. Returns an error when a scheduled
    /// span is malformed or overlaps another, rejecting the whole attempt;
    /// a label change without a matching text change is never emitted.
    pub fn synthesize_document(
        &mut self,
        doc: &Document,
        mentions: &[Mention],
    ) -> Result<Option<Document>> {
        let char_len = doc.char_len();
        let label_map = self.convert_labels(&doc.labels);

        let mut scheduled: Vec<(Span, String)> = Vec::new();
        let mut adjusted: BTreeSet<String> = BTreeSet::new();
        for mention in mentions {
            if !doc.labels.contains(&mention.code) || !self.unspecified.contains(&mention.code) {
                continue;
            }
            mention.span.validate(char_len)?;
            // Synonyms are looked up for the replacement code, not the
            // original: the rewritten text must describe the new label.
            let replacement_code = label_map
                .get(&mention.code)
                .cloned()
                .unwrap_or_else(|| mention.code.clone());
            let Some(candidates) = self.synonyms.synonyms(&replacement_code) else {
                continue;
            };
            if let Some(synonym) = self.sampler.pick(&candidates) {
                scheduled.push((mention.span, synonym.clone()));
                adjusted.insert(mention.code.clone());
            }
        }

        if scheduled.is_empty() {
            return Ok(None);
        }

        scheduled.sort_by_key(|(span, _)| *span);
        for window in scheduled.windows(2) {
            let (previous, _) = &window[0];
            let (span, _) = &window[1];
            if span.start < previous.end {
                return Err(Error::invalid_span(format!(
                    "doc {}: scheduled spans [{}, {}) and [{}, {}) overlap",
                    doc.id, previous.start, previous.end, span.start, span.end
                )));
            }
        }

        let (spans, replacements): (Vec<Span>, Vec<String>) = scheduled.into_iter().unzip();
        let text = augment(&doc.text, &spans, &replacements)?;

        let mut labels: BTreeSet<String> = doc.labels.difference(&adjusted).cloned().collect();
        for code in &adjusted {
            labels.insert(label_map.get(code).cloned().unwrap_or_else(|| code.clone()));
        }

        Ok(Some(doc.rewritten(text, labels)))
    }

    /// Run synthesis over a corpus, repeating `iters` times with independent
    /// draws so one source document can yield several distinct variants.
    ///
    /// Exact-duplicate rows (identical final text) are dropped. A failure on
    /// one document never aborts the rest; outcomes are tallied in the
    /// report.
    pub fn synthesize_corpus(
        &mut self,
        corpus: &[(Document, Vec<Mention>)],
        iters: usize,
    ) -> (Vec<Document>, SynthesisReport) {
        let mut rows: Vec<Document> = Vec::new();
        let mut seen_texts: BTreeSet<String> = BTreeSet::new();
        let mut report = SynthesisReport::default();

        for _ in 0..iters {
            for (doc, mentions) in corpus {
                report.documents += 1;
                match self.synthesize_document(doc, mentions) {
                    Ok(Some(row)) => {
                        if !seen_texts.insert(row.text.clone()) {
                            report.duplicates += 1;
                            continue;
                        }
                        if row.text != doc.text {
                            report.changed += 1;
                        }
                        report.produced += 1;
                        rows.push(row);
                    }
                    Ok(None) => report.no_synthesis += 1,
                    Err(err) => {
                        report.rejected += 1;
                        log::warn!("doc {}: synthesis rejected: {err}", doc.id);
                    }
                }
            }
        }

        log::info!(
            "{} synthetic rows ({} changed, {} duplicates dropped, {} without synthesis)",
            report.produced,
            report.changed,
            report.duplicates,
            report.no_synthesis
        );
        (rows, report)
    }
}

/// Merge output batches (e.g. from different NER methods), dropping
/// exact-duplicate rows by final text. Order of first appearance wins.
#[must_use]
pub fn merge_variants(batches: impl IntoIterator<Item = Vec<Document>>) -> Vec<Document> {
    let mut seen_texts: BTreeSet<String> = BTreeSet::new();
    let mut merged = Vec::new();
    for batch in batches {
        for row in batch {
            if seen_texts.insert(row.text.clone()) {
                merged.push(row);
            }
        }
    }
    merged
}
