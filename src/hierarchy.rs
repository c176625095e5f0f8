//! Code hierarchy and family/sibling derivation.
//!
//! Diagnostic codes form a strict three-level taxonomy: leaf codes roll up
//! to a parent, parents to a grandparent. The builder turns the raw
//! code → (parent, grandparent, label) mapping into per-code family sets and
//! the lexical `unspecified` / `other` / `specified` partition that drives
//! sibling-code synthesis.
//!
//! Only codes with a true parent/grandparent distinction are considered:
//! genuinely top-level entries (whose chain collapses onto themselves) have
//! no finer descendant to trade places with and are filtered out.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One taxonomy entry: a code's declared parent chain and human label text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    /// Immediate parent code (a parent-level code is its own parent).
    pub parent: String,
    /// Grandparent code.
    pub grandparent: String,
    /// Human-readable label text.
    pub label: String,
}

impl TaxonomyNode {
    /// Create a new taxonomy node.
    #[must_use]
    pub fn new(
        parent: impl Into<String>,
        grandparent: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            parent: parent.into(),
            grandparent: grandparent.into(),
            label: label.into(),
        }
    }
}

/// The taxonomy graph: code → parent chain and label.
pub type Taxonomy = BTreeMap<String, TaxonomyNode>;

/// Family-annotated entry for one considered code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyEntry {
    /// The code itself.
    pub code: String,
    /// Immediate parent code.
    pub parent: String,
    /// Grandparent code.
    pub grandparent: String,
    /// The conversion family: all considered codes under the grandparent for
    /// a parent-level code, the immediate siblings otherwise.
    pub family: BTreeSet<String>,
    /// Family members whose label denotes a non-specific variant.
    pub unspecified: BTreeSet<String>,
    /// Family members labelled "other", excluding the unspecified ones.
    pub other: BTreeSet<String>,
    /// The rest of the family: genuinely specified codes.
    pub specified: BTreeSet<String>,
}

/// Family-annotated code table produced by [`build_hierarchy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyTable {
    entries: BTreeMap<String, FamilyEntry>,
}

impl FamilyTable {
    /// Look up the entry for a code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&FamilyEntry> {
        self.entries.get(code)
    }

    /// True when the code is considered (has a true parent/grandparent
    /// distinction).
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Number of considered codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no code survived the consideration filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FamilyEntry)> {
        self.entries.iter()
    }
}

/// Label text denoting a non-specific diagnosis variant.
fn is_unspecified_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    lower.contains("unspecified") || lower.contains("not otherwise specified")
}

/// Label text denoting a catch-all "other" variant.
fn is_other_label(label: &str) -> bool {
    label.to_lowercase().contains("other")
}

/// Build the family-annotated code table from a taxonomy graph.
///
/// Deterministic given the taxonomy; no randomness, no I/O.
#[must_use]
pub fn build_hierarchy(taxonomy: &Taxonomy) -> FamilyTable {
    // A genuinely top-level entry collapses its chain onto itself.
    let considered: BTreeSet<&str> = taxonomy
        .iter()
        .filter(|(code, node)| node.grandparent != **code)
        .map(|(code, _)| code.as_str())
        .collect();

    let mut by_parent: HashMap<&str, BTreeSet<String>> = HashMap::new();
    let mut by_grandparent: HashMap<&str, BTreeSet<String>> = HashMap::new();
    for &code in &considered {
        let node = &taxonomy[code];
        by_parent
            .entry(node.parent.as_str())
            .or_default()
            .insert(code.to_string());
        by_grandparent
            .entry(node.grandparent.as_str())
            .or_default()
            .insert(code.to_string());
    }

    let empty = BTreeSet::new();
    let mut entries = BTreeMap::new();
    for &code in &considered {
        let node = &taxonomy[code];
        let family_all = by_grandparent
            .get(node.grandparent.as_str())
            .unwrap_or(&empty);
        let siblings = by_parent.get(node.parent.as_str()).unwrap_or(&empty);

        // Parent-level codes (their own parent) convert across the whole
        // grandparent family; leaves convert among immediate siblings.
        let family = if node.parent == code {
            family_all.clone()
        } else {
            siblings.clone()
        };

        let unspecified: BTreeSet<String> = family
            .iter()
            .filter(|member| is_unspecified_label(&taxonomy[member.as_str()].label))
            .cloned()
            .collect();
        let other: BTreeSet<String> = family
            .iter()
            .filter(|member| {
                !unspecified.contains(member.as_str())
                    && is_other_label(&taxonomy[member.as_str()].label)
            })
            .cloned()
            .collect();
        let specified: BTreeSet<String> = family
            .iter()
            .filter(|member| {
                !unspecified.contains(member.as_str()) && !other.contains(member.as_str())
            })
            .cloned()
            .collect();

        entries.insert(
            code.to_string(),
            FamilyEntry {
                code: code.to_string(),
                parent: node.parent.clone(),
                grandparent: node.grandparent.clone(),
                family,
                unspecified,
                other,
                specified,
            },
        );
    }

    FamilyTable { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(parent: &str, grandparent: &str, label: &str) -> TaxonomyNode {
        TaxonomyNode::new(parent, grandparent, label)
    }

    fn sample_taxonomy() -> Taxonomy {
        let mut t = Taxonomy::new();
        // Grandparent-level entry, filtered out.
        t.insert("250".into(), node("250", "250", "Diabetes mellitus"));
        // Parent-level entry (its own parent, distinct grandparent).
        t.insert(
            "250.6".into(),
            node("250.6", "250", "Diabetes with neurological manifestations"),
        );
        // Leaves under 250.6.
        t.insert(
            "250.60".into(),
            node("250.6", "250", "Diabetes with neurological manifestations, type II, unspecified"),
        );
        t.insert(
            "250.61".into(),
            node("250.6", "250", "Diabetes with neurological manifestations, type I"),
        );
        t.insert(
            "250.62".into(),
            node("250.6", "250", "Diabetes with other neurological manifestations"),
        );
        // A second parent with one leaf.
        t.insert(
            "250.7".into(),
            node("250.7", "250", "Diabetes with peripheral circulatory disorders"),
        );
        t.insert(
            "250.70".into(),
            node("250.7", "250", "Diabetes with peripheral circulatory disorders, unspecified"),
        );
        t
    }

    #[test]
    fn top_level_entries_are_filtered() {
        let table = build_hierarchy(&sample_taxonomy());
        assert!(!table.contains("250"));
        assert!(table.contains("250.6"));
        assert!(table.contains("250.60"));
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn leaf_family_is_sibling_set() {
        let table = build_hierarchy(&sample_taxonomy());
        let entry = table.get("250.60").unwrap();
        let expected: BTreeSet<String> = ["250.6", "250.60", "250.61", "250.62"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(entry.family, expected);
    }

    #[test]
    fn parent_level_family_spans_grandparent() {
        let table = build_hierarchy(&sample_taxonomy());
        let entry = table.get("250.6").unwrap();
        // 250.6 is its own parent, so its family covers everything under 250.
        assert!(entry.family.contains("250.70"));
        assert!(entry.family.contains("250.7"));
        assert_eq!(entry.family.len(), 6);
    }

    #[test]
    fn partitions_are_disjoint_and_cover_family() {
        let table = build_hierarchy(&sample_taxonomy());
        for (_, entry) in table.iter() {
            let mut union = BTreeSet::new();
            union.extend(entry.unspecified.iter().cloned());
            union.extend(entry.other.iter().cloned());
            union.extend(entry.specified.iter().cloned());
            assert_eq!(union, entry.family, "partition must cover family");

            assert!(entry.unspecified.is_disjoint(&entry.other));
            assert!(entry.unspecified.is_disjoint(&entry.specified));
            assert!(entry.other.is_disjoint(&entry.specified));
        }
    }

    #[test]
    fn unspecified_takes_priority_over_other() {
        let mut t = sample_taxonomy();
        t.insert(
            "250.63".into(),
            node("250.6", "250", "Other diabetic manifestation, unspecified"),
        );
        let table = build_hierarchy(&t);
        let entry = table.get("250.60").unwrap();
        assert!(entry.unspecified.contains("250.63"));
        assert!(!entry.other.contains("250.63"));
    }

    #[test]
    fn lexical_match_is_case_insensitive() {
        let mut t = Taxonomy::new();
        t.insert("1.0".into(), node("1.0", "1", "UNSPECIFIED disorder"));
        t.insert("1.1".into(), node("1.0", "1", "Disorder NOT OTHERWISE SPECIFIED"));
        t.insert("1.2".into(), node("1.0", "1", "Specific disorder"));
        let table = build_hierarchy(&t);
        let entry = table.get("1.2").unwrap();
        assert!(entry.unspecified.contains("1.0"));
        assert!(entry.unspecified.contains("1.1"));
        assert!(entry.specified.contains("1.2"));
    }
}
