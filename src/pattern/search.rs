//! Temporal chain matching against a fact store.
//!
//! [`satisfying_indices`] walks forward from every fact that matches the
//! first antecedent and keeps each path that ends in a matching consequence.
//! [`chain_completes_at`] answers the driver's narrower question, whether some
//! chain ends exactly in the window before `t`, by walking backward.

use std::collections::BTreeSet;

use crate::graph::store::FactStore;

use super::TemporalPattern;
use super::dedup::PatternSet;

/// Positions of every fact that takes part in at least one complete
/// instantiation of `pattern`: antecedents in order, each inside its lag
/// window after the previous one, and a consequence inside the final window.
///
/// All chains are explored; a fact shared by several chains appears once.
pub fn satisfying_indices(pattern: &TemporalPattern, store: &FactStore) -> BTreeSet<usize> {
    let Some(first) = pattern.antecedent.first() else {
        return BTreeSet::new();
    };
    store
        .matching(first, None)
        .flat_map(|idx| extend_chain(pattern, store, 1, &[idx]))
        .collect()
}

/// Extend `path` (the matched antecedents `0..depth`) by one level.
fn extend_chain(
    pattern: &TemporalPattern,
    store: &FactStore,
    depth: usize,
    path: &[usize],
) -> BTreeSet<usize> {
    let Some(&prev) = path.last() else {
        return BTreeSet::new();
    };
    let Some(lag) = pattern.time_lags.get(depth - 1) else {
        return BTreeSet::new();
    };
    let window = lag.window_after(store.facts()[prev].timestamp);

    if depth == pattern.antecedent.len() {
        let consequences: Vec<usize> = store.matching(&pattern.consequence, Some(window)).collect();
        if consequences.is_empty() {
            return BTreeSet::new();
        }
        return path.iter().copied().chain(consequences).collect();
    }

    store
        .matching(&pattern.antecedent[depth], Some(window))
        .flat_map(|idx| {
            let mut next = path.to_vec();
            next.push(idx);
            extend_chain(pattern, store, depth + 1, &next)
        })
        .collect()
}

/// Whether the store holds a full antecedent chain of `pattern` whose last
/// antecedent lies in the final lag window before `t`.
pub fn chain_completes_at(pattern: &TemporalPattern, store: &FactStore, t: u32) -> bool {
    match pattern.antecedent.len() {
        0 => false,
        n => completes_before(pattern, store, n - 1, t),
    }
}

fn completes_before(pattern: &TemporalPattern, store: &FactStore, pos: usize, next_t: u32) -> bool {
    let Some(window) = pattern
        .time_lags
        .get(pos)
        .and_then(|lag| lag.window_before(next_t))
    else {
        return false;
    };
    let triple = &pattern.antecedent[pos];
    if pos == 0 {
        return store.contains_within(triple, window);
    }
    store
        .matching(triple, Some(window))
        .any(|idx| completes_before(pattern, store, pos - 1, store.facts()[idx].timestamp))
}

/// Attach every pattern's id to the facts of its complete chains.
///
/// Returns the number of `(fact, pattern)` labels attached.
pub fn label_facts(store: &mut FactStore, patterns: &PatternSet) -> usize {
    let mut attached = 0;
    for (id, pattern) in patterns.iter() {
        let hits = satisfying_indices(pattern, store);
        tracing::debug!(pattern = id.get(), facts = hits.len(), "labeled pattern");
        attached += hits.len();
        for idx in hits {
            store.add_pattern_label(idx, id);
        }
    }
    attached
}
