//! Deduplication index over accepted alternatives, keyed by source text

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::core::validate;

/// Per-batch and cross-run sets of already-produced alternatives.
///
/// Keys are the normalized, lowercased source texts; members are lowercased
/// normalized alternatives. The invariant enforced through this index: a
/// normalized alternative is never accepted twice for the same source text.
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    entries: HashMap<String, HashSet<String>>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn source_key(source: &str) -> String {
        validate::normalize(source).to_lowercase()
    }

    fn canonical(alternative: &str) -> String {
        alternative.trim().to_lowercase()
    }

    /// Record an accepted alternative. Returns false when it was already
    /// present (or blank).
    pub fn insert(&mut self, source: &str, alternative: &str) -> bool {
        let canonical = Self::canonical(alternative);
        if canonical.is_empty() {
            return false;
        }
        self.entries
            .entry(Self::source_key(source))
            .or_default()
            .insert(canonical)
    }

    pub fn contains(&self, source: &str, alternative: &str) -> bool {
        self.entries
            .get(&Self::source_key(source))
            .is_some_and(|set| set.contains(&Self::canonical(alternative)))
    }

    /// Alternatives already used for `source`, sorted so prompts are stable
    /// across runs.
    pub fn exclusions_for(&self, source: &str) -> Vec<String> {
        let mut list: Vec<String> = self
            .entries
            .get(&Self::source_key(source))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        list.sort();
        list
    }

    pub fn merge(&mut self, other: DedupIndex) {
        for (source, alternatives) in other.entries {
            self.entries.entry(source).or_default().extend(alternatives);
        }
    }

    pub fn source_count(&self) -> usize {
        self.entries.len()
    }

    /// Serializable snapshot with sorted keys and members, so the persisted
    /// form is deterministic.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        self.entries
            .iter()
            .map(|(source, alternatives)| {
                let mut list: Vec<String> = alternatives.iter().cloned().collect();
                list.sort();
                (source.clone(), list)
            })
            .collect()
    }

    pub fn from_snapshot(snapshot: BTreeMap<String, Vec<String>>) -> Self {
        let entries = snapshot
            .into_iter()
            .map(|(source, alternatives)| {
                let set = alternatives
                    .into_iter()
                    .map(|a| Self::canonical(&a))
                    .filter(|a| !a.is_empty())
                    .collect();
                (source, set)
            })
            .collect();
        Self { entries }
    }
}
