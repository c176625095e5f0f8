//! The code conversion table: per code, which specified siblings are viable
//! in each shot bucket.
//!
//! Built once from the family table and the shot sets, then serialized and
//! reused across synthesis runs; rebuilding means re-scanning three label
//! splits and the whole taxonomy, so the table is the one artifact that
//! survives between the offline build phase and per-document synthesis.
//!
//! # Example
//!
//! ```rust
//! use codegraft::{build_conversion_table, build_hierarchy, classify_shots};
//! use codegraft::{Taxonomy, TaxonomyNode};
//!
//! let mut taxonomy = Taxonomy::new();
//! taxonomy.insert(
//!     "1.10".into(),
//!     TaxonomyNode::new("1.1", "1", "Disorder, unspecified"),
//! );
//! taxonomy.insert("1.11".into(), TaxonomyNode::new("1.1", "1", "Disorder A"));
//!
//! let families = build_hierarchy(&taxonomy);
//! let train: Vec<String> = vec!["1.10;1.10;1.10;1.10;1.10;1.10".into(), "1.11".into()];
//! let shots = classify_shots(&train, &[], &[]);
//! let table = build_conversion_table(&families, &shots);
//!
//! assert!(table.contains("1.10"));
//! ```

use crate::hierarchy::FamilyTable;
use crate::shots::{ShotBucket, ShotSets};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Per-code conversion data: the family partition plus the viable specified
/// siblings in each shot bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionEntry {
    /// Family members with a non-specific label.
    pub unspecified: BTreeSet<String>,
    /// Family members labelled "other" (excluding unspecified).
    pub other: BTreeSet<String>,
    /// Genuinely specified family members.
    pub specified: BTreeSet<String>,
    /// Specified siblings seen only in dev/test.
    pub zero: BTreeSet<String>,
    /// Specified siblings seen rarely in training.
    pub few: BTreeSet<String>,
    /// Specified siblings seen frequently in training.
    pub normal: BTreeSet<String>,
}

impl ConversionEntry {
    /// Viable specified siblings for one bucket.
    #[must_use]
    pub fn siblings(&self, bucket: ShotBucket) -> &BTreeSet<String> {
        match bucket {
            ShotBucket::Zero => &self.zero,
            ShotBucket::Few => &self.few,
            ShotBucket::Normal => &self.normal,
        }
    }
}

/// Lookup table code → {bucket → viable specified siblings}.
///
/// Immutable once built. A code never appears in its own sibling sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionTable {
    entries: BTreeMap<String, ConversionEntry>,
}

/// ICD-9 suffix shapes of unspecified codes (x.9 / x.x0 / x.x1 families).
static UNSPECIFIED_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.+\.((9.?)|(.0)|(.1))$").unwrap());

impl ConversionTable {
    /// Look up a code's entry.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&ConversionEntry> {
        self.entries.get(code)
    }

    /// True when the table has an entry for the code.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Number of codes in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConversionEntry)> {
        self.entries.iter()
    }

    /// Viable siblings for a code in one bucket, if the code is known.
    #[must_use]
    pub fn siblings(&self, code: &str, bucket: ShotBucket) -> Option<&BTreeSet<String>> {
        self.entries.get(code).map(|entry| entry.siblings(bucket))
    }

    /// The first bucket, in strict `zero → few → normal` priority order,
    /// holding at least one viable sibling for the code.
    #[must_use]
    pub fn viable_bucket(&self, code: &str) -> Option<ShotBucket> {
        let entry = self.entries.get(code)?;
        [ShotBucket::Zero, ShotBucket::Few, ShotBucket::Normal]
            .into_iter()
            .find(|bucket| !entry.siblings(*bucket).is_empty())
    }

    /// The global unspecified-code list: the union of the `unspecified`
    /// partitions across all entries, restricted to codes whose suffix shape
    /// matches the unspecified ICD-9 patterns.
    #[must_use]
    pub fn unspecified_codes(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .flat_map(|entry| entry.unspecified.iter())
            .filter(|code| UNSPECIFIED_SUFFIX.is_match(code))
            .cloned()
            .collect()
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the table to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a table back from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Build the conversion table from the family-annotated code table and the
/// shot sets.
///
/// Only codes seen frequently in training (`normal`) whose family has at
/// least one unspecified member are retained: a family without an
/// unspecified representative yields no remapping opportunity by
/// construction. Each retained code's bucket sets are `specified ∩ bucket`
/// with the code itself excluded.
#[must_use]
pub fn build_conversion_table(families: &FamilyTable, shots: &ShotSets) -> ConversionTable {
    let mut entries = BTreeMap::new();
    for (code, family) in families.iter() {
        if !shots.normal.contains(code) || family.unspecified.is_empty() {
            continue;
        }

        let bucket_set = |bucket: &BTreeSet<String>| -> BTreeSet<String> {
            family
                .specified
                .intersection(bucket)
                .filter(|sibling| *sibling != code)
                .cloned()
                .collect()
        };

        entries.insert(
            code.clone(),
            ConversionEntry {
                unspecified: family.unspecified.clone(),
                other: family.other.clone(),
                specified: family.specified.clone(),
                zero: bucket_set(&shots.zero),
                few: bucket_set(&shots.few),
                normal: bucket_set(&shots.normal),
            },
        );
    }

    log::debug!(
        "conversion table retained {} of {} considered codes",
        entries.len(),
        families.len()
    );
    ConversionTable { entries }
}
