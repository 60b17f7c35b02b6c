//! Append-only fact store with exact-triple and time indexes.
//!
//! Facts live in one `Vec` and are addressed by position. Two secondary
//! indexes answer the queries the generator and the satisfaction search make:
//! exact `(head, relation, tail)` lookups and timestamp-range scans.
//! Inserting a fact whose `(head, relation, tail, t)` already exists merges
//! into the existing entry instead of appending.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::symbol::PatternId;

use super::Triple;

/// A time-stamped fact with its aggregated weight and pattern labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub triple: Triple,
    pub timestamp: u32,
    /// Number of times this exact fact was emitted.
    pub weight: u32,
    /// Emitted at least once as a random noise edge.
    pub noise: bool,
    /// Patterns this fact takes part in as a completed chain member.
    pub pattern_ids: BTreeSet<PatternId>,
}

impl Fact {
    /// A single unlabeled emission of `triple` at `timestamp`.
    pub fn new(triple: Triple, timestamp: u32) -> Self {
        Self {
            triple,
            timestamp,
            weight: 1,
            noise: false,
            pattern_ids: BTreeSet::new(),
        }
    }

    /// A single noise emission of `triple` at `timestamp`.
    pub fn noise(triple: Triple, timestamp: u32) -> Self {
        Self {
            noise: true,
            ..Self::new(triple, timestamp)
        }
    }

    fn absorb(&mut self, other: Fact) {
        self.weight += other.weight;
        self.noise |= other.noise;
        self.pattern_ids.extend(other.pattern_ids);
    }
}

/// Growable fact collection owned by a single generation run.
#[derive(Debug, Clone, Default)]
pub struct FactStore {
    facts: Vec<Fact>,
    /// `(triple, t)` → position, for merging duplicates.
    key_index: HashMap<(Triple, u32), usize>,
    /// Triple → positions, in insertion order.
    triple_index: HashMap<Triple, Vec<usize>>,
    /// Timestamp → positions.
    time_index: BTreeMap<u32, Vec<usize>>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Fact> {
        self.facts.get(idx)
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Insert a fact, merging it into an identical `(triple, t)` entry if one
    /// exists. Returns the fact's position.
    pub fn insert(&mut self, fact: Fact) -> usize {
        let key = (fact.triple, fact.timestamp);
        if let Some(&idx) = self.key_index.get(&key) {
            self.facts[idx].absorb(fact);
            return idx;
        }
        let idx = self.facts.len();
        self.key_index.insert(key, idx);
        self.triple_index.entry(fact.triple).or_default().push(idx);
        self.time_index.entry(fact.timestamp).or_default().push(idx);
        self.facts.push(fact);
        idx
    }

    /// Positions of facts with exactly `triple`, optionally restricted to an
    /// inclusive timestamp window.
    pub fn matching(
        &self,
        triple: &Triple,
        window: Option<RangeInclusive<u32>>,
    ) -> impl Iterator<Item = usize> + '_ {
        self.triple_index
            .get(triple)
            .map(|v| v.as_slice())
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(move |&idx| {
                window
                    .as_ref()
                    .is_none_or(|w| w.contains(&self.facts[idx].timestamp))
            })
    }

    /// Whether any fact with exactly `triple` lies in the window.
    pub fn contains_within(&self, triple: &Triple, window: RangeInclusive<u32>) -> bool {
        self.matching(triple, Some(window)).next().is_some()
    }

    /// Positions of all facts with a timestamp in `range`, in time order.
    pub fn in_time_range(&self, range: RangeInclusive<u32>) -> impl Iterator<Item = usize> + '_ {
        self.time_index
            .range(range)
            .flat_map(|(_, idxs)| idxs.iter().copied())
    }

    /// Distinct timestamps present in the store, ascending.
    pub fn timestamps(&self) -> impl Iterator<Item = u32> + '_ {
        self.time_index.keys().copied()
    }

    /// Attach a pattern label to the fact at `idx`.
    ///
    /// This is the only mutation allowed after construction; it never changes
    /// the fact's triple or timestamp, so the indexes stay valid.
    pub fn add_pattern_label(&mut self, idx: usize, pattern: PatternId) {
        if let Some(fact) = self.facts.get_mut(idx) {
            fact.pattern_ids.insert(pattern);
        }
    }

    /// Drop facts at or after `end` and reorder the rest by
    /// `(t, head, tail, relation)`, rebuilding every index.
    pub fn truncated(self, end: u32) -> Self {
        let mut facts: Vec<Fact> = self
            .facts
            .into_iter()
            .filter(|f| f.timestamp < end)
            .collect();
        facts.sort_by_key(|f| (f.timestamp, f.triple.head, f.triple.tail, f.triple.relation));

        let mut store = Self::new();
        for fact in facts {
            store.insert(fact);
        }
        store
    }
}
