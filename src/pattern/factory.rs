//! Constrained random generation of 1-, 2-, and 3-hop patterns.
//!
//! Every builder follows the same shape: draw `2 * (n_hops + 1)` entity ids
//! and `n_hops + 1` relation ids (weighted, with replacement), lay the first
//! `2 * n_hops` entities and `n_hops` relations out as antecedent triples,
//! repair the draw where the hop count's linking constraint fails, then close
//! the consequence over the antecedent values and resolve the time lags.
//!
//! Each repair is guarded by the condition it establishes, so one pass always
//! suffices.

use rand::Rng;

use crate::error::{PatternError, PatternResult};
use crate::graph::Triple;
use crate::graph::connectivity::{entities_connect_triples, entities_intersect};
use crate::symbol::{EntityId, RelationId, SymbolTable};

use super::TemporalPattern;
use super::lag::{LagSpec, resolve_time_lags};
use super::repair::{force_connect_components, force_swap_to_entities};

/// Draws patterns from a pair of weighted id tables.
#[derive(Debug, Clone, Copy)]
pub struct PatternFactory<'a> {
    entities: &'a SymbolTable,
    relations: &'a SymbolTable,
}

impl<'a> PatternFactory<'a> {
    pub fn new(entities: &'a SymbolTable, relations: &'a SymbolTable) -> Self {
        Self {
            entities,
            relations,
        }
    }

    /// Build a pattern with `n_hops` antecedents, dispatching to the
    /// hop-specific builder.
    pub fn create<R: Rng + ?Sized>(
        &self,
        n_hops: usize,
        lags: &[LagSpec],
        rng: &mut R,
    ) -> PatternResult<TemporalPattern> {
        match n_hops {
            1 => self.create_1_hop(lags, rng),
            2 => self.create_2_hop(lags, rng),
            3 => self.create_3_hop(lags, rng),
            n_hops => Err(PatternError::UnsupportedHops { n_hops }),
        }
    }

    /// `(e1 r1 e2) → (e3 r2 e4)` with `e3, e4 ∈ {e1, e2}` and `r2 = r1`.
    pub fn create_1_hop<R: Rng + ?Sized>(
        &self,
        lags: &[LagSpec],
        rng: &mut R,
    ) -> PatternResult<TemporalPattern> {
        let (mut entities, mut relations) = self.draw(1, lags, rng)?;
        self.finish(1, &mut entities, &mut relations, lags, rng)
    }

    /// `(e1 r1 e2) & (e3 r2 e4) → (e5 r3 e6)` where the second antecedent
    /// shares an entity with the first.
    pub fn create_2_hop<R: Rng + ?Sized>(
        &self,
        lags: &[LagSpec],
        rng: &mut R,
    ) -> PatternResult<TemporalPattern> {
        let (mut entities, mut relations) = self.draw(2, lags, rng)?;

        if !entities_intersect(&entities[2..4], &entities[..2]) {
            let first = entities[..2].to_vec();
            force_swap_to_entities(&[2, 3], &mut entities, &first, rng)?;
        }

        self.finish(2, &mut entities, &mut relations, lags, rng)
    }

    /// `(e1 r1 e2) & (e3 r2 e4) & (e5 r3 e6) → (e7 r4 e8)` where the third
    /// antecedent shares an entity with the first two, and bridges them when
    /// the second does not touch the first.
    pub fn create_3_hop<R: Rng + ?Sized>(
        &self,
        lags: &[LagSpec],
        rng: &mut R,
    ) -> PatternResult<TemporalPattern> {
        let (mut entities, mut relations) = self.draw(3, lags, rng)?;

        if !entities_intersect(&entities[..4], &entities[4..6]) {
            let prior = entities[..4].to_vec();
            force_swap_to_entities(&[4, 5], &mut entities, &prior, rng)?;
        }

        if !entities_intersect(&entities[2..4], &entities[..2]) {
            let first = Triple::new(entities[0], relations[0], entities[1]);
            let second = Triple::new(entities[2], relations[1], entities[3]);
            if !entities_connect_triples(entities[4], entities[5], &first, &second) {
                let component_a = entities[..2].to_vec();
                let component_b = entities[2..4].to_vec();
                force_connect_components(&[4, 5], &mut entities, &component_a, &component_b, rng)?;
            }
        }

        self.finish(3, &mut entities, &mut relations, lags, rng)
    }

    /// Draw the raw entity and relation ids for an `n_hops` pattern.
    fn draw<R: Rng + ?Sized>(
        &self,
        n_hops: usize,
        lags: &[LagSpec],
        rng: &mut R,
    ) -> PatternResult<(Vec<EntityId>, Vec<RelationId>)> {
        if lags.len() != n_hops {
            return Err(PatternError::LagCount {
                n_hops,
                actual: lags.len(),
            });
        }
        let entities = self
            .entities
            .sample_weighted(2 * (n_hops + 1), rng)
            .into_iter()
            .map(EntityId)
            .collect();
        let relations = self
            .relations
            .sample_weighted(n_hops + 1, rng)
            .into_iter()
            .map(RelationId)
            .collect();
        Ok((entities, relations))
    }

    /// Lay out the antecedents, close the consequence over them, and resolve
    /// the lags.
    fn finish<R: Rng + ?Sized>(
        &self,
        n_hops: usize,
        entities: &mut [EntityId],
        relations: &mut [RelationId],
        lags: &[LagSpec],
        rng: &mut R,
    ) -> PatternResult<TemporalPattern> {
        let antecedent: Vec<Triple> = (0..n_hops)
            .map(|i| Triple::new(entities[2 * i], relations[i], entities[2 * i + 1]))
            .collect();

        let head = 2 * n_hops;
        let tail = head + 1;
        let entity_pool = entities[..head].to_vec();
        for idx in [head, tail] {
            if !entity_pool.contains(&entities[idx]) {
                force_swap_to_entities(&[idx], entities, &entity_pool, rng)?;
            }
        }
        let relation_pool = relations[..n_hops].to_vec();
        if !relation_pool.contains(&relations[n_hops]) {
            force_swap_to_entities(&[n_hops], relations, &relation_pool, rng)?;
        }
        let consequence = Triple::new(entities[head], relations[n_hops], entities[tail]);

        let time_lags = resolve_time_lags(lags, &antecedent, rng);

        Ok(TemporalPattern {
            antecedent,
            consequence,
            time_lags,
            n_hops,
        })
    }
}
