//! Shot-frequency classification of codes across data splits.
//!
//! Codes are bucketed by how often they appear in the training split:
//! `Normal` (more than [`FEW_SHOT_MAX`] occurrences), `Few` (at least once,
//! at most [`FEW_SHOT_MAX`]), and `Zero` (present in dev or test but never
//! seen in training). The buckets are mutually exclusive.

use crate::document::split_labels;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Maximum training-split count for a code to stay in the few-shot bucket.
pub const FEW_SHOT_MAX: usize = 5;

/// Frequency class of a code across the data splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShotBucket {
    /// Never seen in training, present in dev or test.
    Zero,
    /// Seen 1..=[`FEW_SHOT_MAX`] times in training.
    Few,
    /// Seen more than [`FEW_SHOT_MAX`] times in training.
    Normal,
}

impl ShotBucket {
    /// Stable name for serialized artifacts and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ShotBucket::Zero => "zero",
            ShotBucket::Few => "few",
            ShotBucket::Normal => "normal",
        }
    }
}

impl std::fmt::Display for ShotBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three disjoint code sets produced by [`classify_shots`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotSets {
    /// Codes seen more than [`FEW_SHOT_MAX`] times in training.
    pub normal: BTreeSet<String>,
    /// Codes seen 1..=[`FEW_SHOT_MAX`] times in training.
    pub few: BTreeSet<String>,
    /// Codes observed only in dev/test.
    pub zero: BTreeSet<String>,
}

impl ShotSets {
    /// The bucket a code belongs to, or `None` if never observed.
    #[must_use]
    pub fn bucket_of(&self, code: &str) -> Option<ShotBucket> {
        if self.normal.contains(code) {
            Some(ShotBucket::Normal)
        } else if self.few.contains(code) {
            Some(ShotBucket::Few)
        } else if self.zero.contains(code) {
            Some(ShotBucket::Zero)
        } else {
            None
        }
    }

    /// The code set for one bucket.
    #[must_use]
    pub fn set(&self, bucket: ShotBucket) -> &BTreeSet<String> {
        match bucket {
            ShotBucket::Zero => &self.zero,
            ShotBucket::Few => &self.few,
            ShotBucket::Normal => &self.normal,
        }
    }
}

/// Partition codes into shot buckets from per-document `;`-delimited label
/// lists of the three splits.
///
/// Each document contributes one count per occurrence of a code in its label
/// list. Pure aggregation; deterministic.
#[must_use]
pub fn classify_shots(train: &[String], dev: &[String], test: &[String]) -> ShotSets {
    let mut train_counts: HashMap<&str, usize> = HashMap::new();
    for labels in train {
        for code in split_labels(labels) {
            *train_counts.entry(code).or_insert(0) += 1;
        }
    }

    let mut sets = ShotSets::default();
    for (code, count) in &train_counts {
        if *count > FEW_SHOT_MAX {
            sets.normal.insert((*code).to_string());
        } else {
            sets.few.insert((*code).to_string());
        }
    }

    for labels in dev.iter().chain(test) {
        for code in split_labels(labels) {
            if !train_counts.contains_key(code) {
                sets.zero.insert(code.to_string());
            }
        }
    }

    sets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn counts_every_occurrence_across_documents() {
        let train = strings(&[
            "401.9;250.60",
            "401.9",
            "401.9;401.9",
            "401.9",
            "401.9",
            "401.9",
        ]);
        let sets = classify_shots(&train, &[], &[]);
        // 401.9 appears 7 times, 250.60 once.
        assert!(sets.normal.contains("401.9"));
        assert!(sets.few.contains("250.60"));
    }

    #[test]
    fn boundary_count_stays_few_shot() {
        let train = strings(&["A;A;A;A;A"]); // exactly FEW_SHOT_MAX
        let sets = classify_shots(&train, &[], &[]);
        assert!(sets.few.contains("A"));
        assert!(!sets.normal.contains("A"));

        let train = strings(&["A;A;A;A;A;A"]); // one more
        let sets = classify_shots(&train, &[], &[]);
        assert!(sets.normal.contains("A"));
    }

    #[test]
    fn zero_shot_excludes_training_codes() {
        let train = strings(&["A;B"]);
        let dev = strings(&["B;C"]);
        let test = strings(&["D"]);
        let sets = classify_shots(&train, &dev, &test);
        let expected: BTreeSet<String> = ["C".to_string(), "D".to_string()].into_iter().collect();
        assert_eq!(sets.zero, expected);
    }

    #[test]
    fn buckets_are_mutually_exclusive() {
        let train = strings(&["A;A;A;A;A;A;B", "B;C"]);
        let dev = strings(&["C;D"]);
        let test = strings(&["A;E"]);
        let sets = classify_shots(&train, &dev, &test);

        for code in ["A", "B", "C", "D", "E"] {
            let memberships = [
                sets.normal.contains(code),
                sets.few.contains(code),
                sets.zero.contains(code),
            ]
            .iter()
            .filter(|m| **m)
            .count();
            assert_eq!(memberships, 1, "code {code} must be in exactly one bucket");
        }
    }

    #[test]
    fn empty_label_fragments_ignored() {
        let train = strings(&[";;", ""]);
        let sets = classify_shots(&train, &[], &[]);
        assert!(sets.few.is_empty());
        assert!(sets.normal.is_empty());
    }

    #[test]
    fn bucket_lookup() {
        let train = strings(&["A;A;A;A;A;A", "B"]);
        let dev = strings(&["C"]);
        let sets = classify_shots(&train, &dev, &[]);
        assert_eq!(sets.bucket_of("A"), Some(ShotBucket::Normal));
        assert_eq!(sets.bucket_of("B"), Some(ShotBucket::Few));
        assert_eq!(sets.bucket_of("C"), Some(ShotBucket::Zero));
        assert_eq!(sets.bucket_of("unknown"), None);
    }
}
