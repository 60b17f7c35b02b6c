//! Temporal implication patterns.
//!
//! A [`TemporalPattern`] says: if the antecedent triples occur in order, each
//! within its time-lag window of the previous one, then the consequence
//! triple occurs within the last window after the final antecedent.
//!
//! - [`factory`]: constrained random generation of 1/2/3-hop patterns
//! - [`repair`]: seeded fixes applied when a random draw breaks a constraint
//! - [`lag`]: resolution of lag specs into concrete `(min, max)` bounds
//! - [`dedup`]: sub-pattern rejection and the accepted [`PatternSet`](dedup::PatternSet)
//! - [`search`]: finding every instantiation of a pattern in a fact store

pub mod dedup;
pub mod factory;
pub mod lag;
pub mod repair;
pub mod search;

use std::ops::RangeInclusive;
use std::str::FromStr;

use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

use crate::error::{PatternError, PatternResult};
use crate::graph::Triple;
use crate::symbol::EntityId;

/// Inclusive `(min, max)` bound on the time between two chained events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeLag {
    pub min: u32,
    pub max: u32,
}

impl TimeLag {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Timestamps allowed for the next event when the previous one is at `t`.
    pub fn window_after(&self, t: u32) -> RangeInclusive<u32> {
        t.saturating_add(self.min)..=t.saturating_add(self.max)
    }

    /// Timestamps allowed for the previous event when the next one is at `t`.
    /// `None` when even the minimum lag reaches before time zero.
    pub fn window_before(&self, t: u32) -> Option<RangeInclusive<u32>> {
        let latest = t.checked_sub(self.min)?;
        Some(t.saturating_sub(self.max)..=latest)
    }
}

/// A multi-hop implication template.
///
/// Invariants established by the factory and checked by the label parser:
/// `antecedent.len() == time_lags.len() == n_hops`, and every lag has
/// `min <= max`. `time_lags[i]` bounds the gap from antecedent `i` to
/// antecedent `i + 1`, or to the consequence for the last position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalPattern {
    pub antecedent: Vec<Triple>,
    pub consequence: Triple,
    pub time_lags: Vec<TimeLag>,
    pub n_hops: usize,
}

impl TemporalPattern {
    /// Antecedents followed by the consequence: the structural dedup key.
    pub fn quadruples(&self) -> Vec<Triple> {
        self.antecedent
            .iter()
            .copied()
            .chain(std::iter::once(self.consequence))
            .collect()
    }

    /// Compact, round-trippable label, e.g. `(0,1,2)(2,0,3)=>(0,0,3)|[0,5][1,4]|2`.
    pub fn label(&self) -> String {
        self.to_string()
    }

    /// Whether every entity and relation of the consequence appears in some
    /// antecedent.
    pub fn is_closed(&self) -> bool {
        let entity_known = |e: EntityId| self.antecedent.iter().any(|t| t.touches(e));
        entity_known(self.consequence.head)
            && entity_known(self.consequence.tail)
            && self
                .antecedent
                .iter()
                .any(|t| t.relation == self.consequence.relation)
    }

    /// Whether the antecedent triples form one connected entity graph.
    pub fn is_connected(&self) -> bool {
        let mut entities: Vec<EntityId> = self
            .antecedent
            .iter()
            .flat_map(|t| t.endpoints())
            .collect();
        entities.sort();
        entities.dedup();
        if entities.len() <= 1 {
            return true;
        }
        let slot = |e: EntityId| entities.binary_search(&e).unwrap_or_default();

        let mut components = UnionFind::<usize>::new(entities.len());
        for t in &self.antecedent {
            components.union(slot(t.head), slot(t.tail));
        }
        let root = components.find(0);
        (1..entities.len()).all(|i| components.find(i) == root)
    }
}

impl std::fmt::Display for TemporalPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for t in &self.antecedent {
            write!(f, "{t}")?;
        }
        write!(f, "=>{}|", self.consequence)?;
        for lag in &self.time_lags {
            write!(f, "[{},{}]", lag.min, lag.max)?;
        }
        write!(f, "|{}", self.n_hops)
    }
}

impl FromStr for TemporalPattern {
    type Err = PatternError;

    fn from_str(label: &str) -> PatternResult<Self> {
        let bad = |message: String| PatternError::Label {
            label: label.to_string(),
            message,
        };

        let (antecedent_str, rest) = label
            .trim()
            .split_once("=>")
            .ok_or_else(|| bad("missing '=>' between antecedent and consequence".into()))?;
        let parts: Vec<&str> = rest.split('|').collect();
        let &[consequence_str, lags_str, hops_str] = parts.as_slice() else {
            return Err(bad(format!(
                "expected consequence|lags|hops after '=>', got {} field(s)",
                parts.len()
            )));
        };

        let antecedent = split_groups(antecedent_str, '(', ')')
            .into_iter()
            .map(|g| parse_triple(g).map_err(&bad))
            .collect::<PatternResult<Vec<_>>>()?;
        let consequence_groups = split_groups(consequence_str, '(', ')');
        let &[consequence_group] = consequence_groups.as_slice() else {
            return Err(bad(format!(
                "expected exactly one consequence triple, got {}",
                consequence_groups.len()
            )));
        };
        let consequence = parse_triple(consequence_group).map_err(&bad)?;
        let time_lags = split_groups(lags_str, '[', ']')
            .into_iter()
            .map(|g| parse_lag(g).map_err(&bad))
            .collect::<PatternResult<Vec<_>>>()?;
        let n_hops: usize = hops_str
            .trim()
            .parse()
            .map_err(|e| bad(format!("invalid hop count '{hops_str}': {e}")))?;
        if !(1..=3).contains(&n_hops) {
            return Err(PatternError::UnsupportedHops { n_hops });
        }

        if antecedent.len() != n_hops || time_lags.len() != n_hops {
            return Err(bad(format!(
                "{n_hops} hops but {} antecedent(s) and {} lag(s)",
                antecedent.len(),
                time_lags.len()
            )));
        }

        Ok(Self {
            antecedent,
            consequence,
            time_lags,
            n_hops,
        })
    }
}

/// Split `s` into the bracketed groups it contains, e.g. `(1,2,3)(4,5,6)`
/// into `["1,2,3", "4,5,6"]`. Text outside brackets is ignored.
fn split_groups(s: &str, open: char, close: char) -> Vec<&str> {
    let mut results = Vec::new();
    let mut start = None;

    for (i, ch) in s.char_indices() {
        if ch == open {
            start = Some(i + ch.len_utf8());
        } else if ch == close {
            if let Some(begin) = start.take() {
                results.push(&s[begin..i]);
            }
        }
    }

    results
}

fn parse_numbers<const N: usize>(group: &str) -> Result<[u32; N], String> {
    let values = group
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid number '{}': {e}", v.trim()))
        })
        .collect::<Result<Vec<u32>, String>>()?;
    values
        .try_into()
        .map_err(|v: Vec<u32>| format!("expected {N} numbers in '{group}', got {}", v.len()))
}

fn parse_triple(group: &str) -> Result<Triple, String> {
    let [head, relation, tail] = parse_numbers::<3>(group)?;
    Ok(Triple::from_raw(head, relation, tail))
}

fn parse_lag(group: &str) -> Result<TimeLag, String> {
    let [min, max] = parse_numbers::<2>(group)?;
    if min > max {
        return Err(format!("lag [{min},{max}] has min > max"));
    }
    Ok(TimeLag::new(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_hop() -> TemporalPattern {
        TemporalPattern {
            antecedent: vec![Triple::from_raw(1, 0, 2), Triple::from_raw(2, 0, 3)],
            consequence: Triple::from_raw(1, 0, 3),
            time_lags: vec![TimeLag::new(0, 5), TimeLag::new(1, 4)],
            n_hops: 2,
        }
    }

    #[test]
    fn label_format() {
        assert_eq!(two_hop().label(), "(1,0,2)(2,0,3)=>(1,0,3)|[0,5][1,4]|2");
    }

    #[test]
    fn label_round_trip() {
        let pattern = two_hop();
        let parsed: TemporalPattern = pattern.label().parse().unwrap();
        assert_eq!(parsed, pattern);
    }

    #[test]
    fn label_parse_tolerates_spaces() {
        let parsed: TemporalPattern = " (1, 0, 2) => (2, 0, 1) | [1, 3] | 1 ".parse().unwrap();
        assert_eq!(parsed.antecedent, vec![Triple::from_raw(1, 0, 2)]);
        assert_eq!(parsed.consequence, Triple::from_raw(2, 0, 1));
        assert_eq!(parsed.time_lags, vec![TimeLag::new(1, 3)]);
    }

    #[test]
    fn malformed_labels_are_rejected() {
        for label in [
            "(1,0,2)(2,0,1)|[1,3]|1",
            "(1,0,2)=>(2,0,1)|[1,3]",
            "(1,0,2)=>(2,0,1)(3,0,1)|[1,3]|1",
            "(1,0)=>(2,0,1)|[1,3]|1",
            "(1,0,2)=>(2,0,1)|[3,1]|1",
            "(1,0,2)=>(2,0,1)|[1,3]|2",
            "(1,x,2)=>(2,0,1)|[1,3]|1",
        ] {
            let result = label.parse::<TemporalPattern>();
            assert!(
                matches!(result, Err(PatternError::Label { .. })),
                "accepted {label}"
            );
        }
    }

    #[test]
    fn hop_counts_outside_one_to_three_are_rejected() {
        for (label, n) in [
            ("=>(1,0,2)||0", 0),
            ("(1,0,2)(2,0,3)(3,0,4)(4,0,5)=>(1,0,5)|[0,1][0,1][0,1][1,2]|4", 4),
        ] {
            match label.parse::<TemporalPattern>() {
                Err(PatternError::UnsupportedHops { n_hops }) => assert_eq!(n_hops, n),
                other => panic!("{label}: expected unsupported hops, got {other:?}"),
            }
        }
        assert!(dedup::PatternSet::from_labels(["=>(1,0,2)||0"]).is_err());
    }

    #[test]
    fn quadruples_append_consequence() {
        let q = two_hop().quadruples();
        assert_eq!(q.len(), 3);
        assert_eq!(q[2], Triple::from_raw(1, 0, 3));
    }

    #[test]
    fn closure_check() {
        let mut p = two_hop();
        assert!(p.is_closed());
        p.consequence = Triple::from_raw(1, 0, 9);
        assert!(!p.is_closed());
        p.consequence = Triple::from_raw(1, 4, 3);
        assert!(!p.is_closed());
    }

    #[test]
    fn connectivity_check() {
        let mut p = two_hop();
        assert!(p.is_connected());
        p.antecedent[1] = Triple::from_raw(4, 0, 5);
        assert!(!p.is_connected());
    }

    #[test]
    fn lag_windows() {
        let lag = TimeLag::new(1, 3);
        assert_eq!(lag.window_after(4), 5..=7);
        assert_eq!(lag.window_before(4), Some(1..=3));
        assert_eq!(lag.window_before(2), Some(0..=1));
        assert_eq!(lag.window_before(0), None);
    }
}
