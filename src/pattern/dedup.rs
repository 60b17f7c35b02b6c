//! Sub-pattern rejection and the set of accepted patterns.
//!
//! A candidate is rejected when its flattened antecedent+consequence
//! sequence occurs as a contiguous window of an accepted pattern's sequence.
//! Generating the largest hop count first means a short pattern can never be
//! accepted and later turn out to sit inside a longer one.

use crate::error::{PatternError, PatternResult};
use crate::graph::Triple;
use crate::symbol::PatternId;

use super::TemporalPattern;

/// Whether `candidate` is a contiguous window of any sequence in `existing`.
pub fn is_subpattern(candidate: &[Triple], existing: &[Vec<Triple>]) -> bool {
    let n = candidate.len();
    existing.iter().any(|seq| {
        seq.len() >= n && (n == 0 || seq.windows(n).any(|window| window == candidate))
    })
}

/// Accepted patterns in acceptance order; a pattern's position is its id.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<TemporalPattern>,
    quadruples: Vec<Vec<Triple>>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a set from pattern labels, in id order.
    pub fn from_labels<'s>(labels: impl IntoIterator<Item = &'s str>) -> PatternResult<Self> {
        let mut set = Self::new();
        for label in labels {
            let pattern: TemporalPattern = label.parse()?;
            set.quadruples.push(pattern.quadruples());
            set.patterns.push(pattern);
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, id: PatternId) -> Option<&TemporalPattern> {
        self.patterns.get(id.get() as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PatternId, &TemporalPattern)> {
        self.patterns
            .iter()
            .enumerate()
            .map(|(i, p)| (PatternId(i as u32), p))
    }

    /// Number of accepted patterns with the given hop count.
    pub fn count_hops(&self, n_hops: usize) -> usize {
        self.patterns.iter().filter(|p| p.n_hops == n_hops).count()
    }

    /// Accept `pattern` unless it is a sub-pattern of an accepted one.
    pub fn try_insert(&mut self, pattern: TemporalPattern) -> Option<PatternId> {
        let quadruples = pattern.quadruples();
        if is_subpattern(&quadruples, &self.quadruples) {
            return None;
        }
        let id = PatternId(self.patterns.len() as u32);
        self.patterns.push(pattern);
        self.quadruples.push(quadruples);
        Some(id)
    }

    /// Draw up to `max_retries` candidates and accept the first new one.
    ///
    /// Exhausting the attempts yields [`PatternError::RetriesExhausted`],
    /// which callers treat as "skip this slot". Errors from `draw` propagate
    /// immediately.
    pub fn add_new_pattern<F>(
        &mut self,
        n_hops: usize,
        max_retries: usize,
        mut draw: F,
    ) -> PatternResult<PatternId>
    where
        F: FnMut() -> PatternResult<TemporalPattern>,
    {
        for attempt in 1..=max_retries {
            let candidate = draw()?;
            if let Some(id) = self.try_insert(candidate) {
                tracing::trace!(n_hops, attempt, id = id.get(), "accepted pattern");
                return Ok(id);
            }
        }
        Err(PatternError::RetriesExhausted {
            n_hops,
            attempts: max_retries,
        })
    }
}
