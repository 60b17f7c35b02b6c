//! Identifier types and weighted id tables.
//!
//! Entities, relations, and patterns are identified by dense zero-based
//! integers wrapped in newtypes so they cannot be mixed up. A [`SymbolTable`]
//! holds the `(name, id, weight)` rows of one id space and draws ids from it,
//! weighted, with replacement.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Identifier of an entity (a graph node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityId(pub u32);

/// Identifier of a relation (an edge label).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RelationId(pub u32);

/// Identifier of an accepted pattern, assigned in acceptance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PatternId(pub u32);

macro_rules! id_impls {
    ($($ty:ident),*) => {$(
        impl $ty {
            /// Get the underlying integer.
            pub fn get(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $ty {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    )*};
}

id_impls!(EntityId, RelationId, PatternId);

/// Which id space a table covers. Used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Entity,
    Relation,
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKind::Entity => write!(f, "entity"),
            SymbolKind::Relation => write!(f, "relation"),
        }
    }
}

/// One row of an id table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRow {
    pub name: String,
    pub id: u32,
    pub weight: f64,
}

/// The `(name, id, weight)` table for entities or relations.
///
/// Names are the decimal form of the id. Sampling is weighted by `weight`
/// for pattern templates, and uniform for noise edges.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    kind: SymbolKind,
    rows: Vec<SymbolRow>,
    weighted: WeightedIndex<f64>,
}

impl SymbolTable {
    /// A table of `n` ids with equal weight.
    pub fn uniform(kind: SymbolKind, n: usize) -> ConfigResult<Self> {
        Self::with_weights(kind, n, vec![1.0; n])
    }

    /// A table whose weights come from an opaque weighting function.
    ///
    /// The function is invoked once with `n` and must return exactly `n`
    /// weights.
    pub fn from_weight_fn<F>(kind: SymbolKind, n: usize, weight_fn: F) -> ConfigResult<Self>
    where
        F: FnOnce(usize) -> Vec<f64>,
    {
        Self::with_weights(kind, n, weight_fn(n))
    }

    /// A table of `n` ids with the given weights.
    pub fn with_weights(kind: SymbolKind, n: usize, weights: Vec<f64>) -> ConfigResult<Self> {
        if weights.len() != n {
            return Err(ConfigError::WeightCount {
                kind: kind.to_string(),
                expected: n,
                actual: weights.len(),
            });
        }
        let weighted = WeightedIndex::new(&weights).map_err(|e| ConfigError::Weights {
            kind: kind.to_string(),
            message: e.to_string(),
        })?;
        let rows = weights
            .into_iter()
            .enumerate()
            .map(|(id, weight)| SymbolRow {
                name: id.to_string(),
                id: id as u32,
                weight,
            })
            .collect();
        Ok(Self {
            kind,
            rows,
            weighted,
        })
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[SymbolRow] {
        &self.rows
    }

    /// Draw `k` raw ids with replacement, weighted by the table's weights.
    pub fn sample_weighted<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Vec<u32> {
        (0..k)
            .map(|_| self.rows[self.weighted.sample(rng)].id)
            .collect()
    }

    /// Draw one raw id uniformly, ignoring weights.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        self.rows[rng.gen_range(0..self.rows.len())].id
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn uniform_table_rows() {
        let table = SymbolTable::uniform(SymbolKind::Entity, 4).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows()[3].name, "3");
        assert_eq!(table.rows()[3].id, 3);
        assert!(table.rows().iter().all(|r| r.weight == 1.0));
    }

    #[test]
    fn weight_fn_with_wrong_count_is_rejected() {
        let err = SymbolTable::from_weight_fn(SymbolKind::Relation, 5, |n| vec![1.0; n - 1])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::WeightCount {
                expected: 5,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn all_zero_weights_are_rejected() {
        let err = SymbolTable::with_weights(SymbolKind::Entity, 3, vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, ConfigError::Weights { .. }));
    }

    #[test]
    fn weighted_sampling_respects_zero_weights() {
        let table =
            SymbolTable::with_weights(SymbolKind::Entity, 3, vec![0.0, 1.0, 0.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let ids = table.sample_weighted(50, &mut rng);
        assert!(ids.iter().all(|&id| id == 1));
    }

    #[test]
    fn sampling_is_reproducible_for_a_seed() {
        let table = SymbolTable::uniform(SymbolKind::Entity, 100).unwrap();
        let a = table.sample_weighted(8, &mut StdRng::seed_from_u64(3));
        let b = table.sample_weighted(8, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn id_display_is_the_raw_integer() {
        assert_eq!(EntityId(12).to_string(), "12");
        assert_eq!(RelationId::from(3).get(), 3);
    }
}
