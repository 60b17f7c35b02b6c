//! The per-run generation driver and the parallel run scheduler.
//!
//! A run is single-threaded and deterministic given its seed: build the id
//! tables, generate patterns (3-hop first), walk the time windows emitting
//! noise, planted chains and consequences, truncate to the window range, and
//! finally label every fact that takes part in a complete chain.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution as _;
use rayon::prelude::*;

use crate::config::{GeneratorConfig, HOP_COUNTS};
use crate::distr::{Distribution, Sampler};
use crate::error::{ConfigResult, PatternError, PatternResult, SynthError, SynthResult};
use crate::graph::Triple;
use crate::graph::store::{Fact, FactStore};
use crate::pattern::TemporalPattern;
use crate::pattern::dedup::PatternSet;
use crate::pattern::factory::PatternFactory;
use crate::pattern::lag::LagSpec;
use crate::pattern::search::{chain_completes_at, label_facts};
use crate::symbol::{PatternId, SymbolKind, SymbolTable};

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run_id: usize,
    pub seed: u64,
    pub entities: SymbolTable,
    pub relations: SymbolTable,
    /// Time windows are `0..n_tws`.
    pub n_tws: u32,
    pub patterns: PatternSet,
    /// Truncated, ordered and labeled.
    pub store: FactStore,
}

/// What one time window emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowStats {
    pub noise: usize,
    pub planted: usize,
    /// Patterns whose consequence was emitted in this window, in id order.
    pub fired: Vec<PatternId>,
}

/// Seed for run `run_id` derived from the base seed (SplitMix64 finalizer).
pub fn derive_run_seed(base: u64, run_id: usize) -> u64 {
    let offset = (run_id as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut z = base.wrapping_add(offset);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// The configured base seed, or a fresh one from entropy.
pub fn resolve_base_seed(config: &GeneratorConfig) -> u64 {
    match config.seed {
        Some(seed) => seed,
        None => {
            let seed = rand::random::<u64>();
            tracing::info!(seed, "no seed configured, drew one from entropy");
            seed
        }
    }
}

/// Plant the antecedent chain of `pattern` starting at `start`, advancing
/// by a uniform draw from each lag's `[min, max]` after every antecedent.
pub fn plant_chain<R: Rng + ?Sized>(
    pattern: &TemporalPattern,
    start: u32,
    rng: &mut R,
) -> Vec<Fact> {
    let mut t = start;
    pattern
        .antecedent
        .iter()
        .zip(&pattern.time_lags)
        .map(|(triple, lag)| {
            let fact = Fact::new(*triple, t);
            t = t.saturating_add(rng.gen_range(lag.min..=lag.max));
            fact
        })
        .collect()
}

/// A validated configuration with its distributions built.
#[derive(Debug)]
pub struct Generator<'c> {
    config: &'c GeneratorConfig,
    /// Indexed by `n_hops - 1`.
    lag_specs: [Vec<LagSpec>; 3],
    density: Option<Sampler>,
    entity_weights: Option<Sampler>,
    relation_weights: Option<Sampler>,
}

impl<'c> Generator<'c> {
    pub fn new(config: &'c GeneratorConfig) -> ConfigResult<Self> {
        config.validate()?;
        let build = |d: &Option<Distribution>| d.as_ref().map(Distribution::build).transpose();
        Ok(Self {
            config,
            lag_specs: [config.lag_specs(1)?, config.lag_specs(2)?, config.lag_specs(3)?],
            density: config.density_sampler()?,
            entity_weights: build(&config.pat_distr_ents)?,
            relation_weights: build(&config.pat_distr_rels)?,
        })
    }

    /// Execute one complete run.
    pub fn run(&self, run_id: usize, seed: u64) -> SynthResult<RunOutput> {
        let mut rng = StdRng::seed_from_u64(seed);
        tracing::info!(run_id, seed, "starting run");

        let (entities, relations) = self.build_tables(&mut rng)?;
        let patterns = self.generate_patterns(&entities, &relations, &mut rng)?;
        tracing::info!(run_id, n_patterns = patterns.len(), "patterns generated");

        let n_tws = self.config.n_tws as u32;
        let mut store = FactStore::new();
        for t in 0..n_tws {
            let stats = self.step(t, &entities, &relations, &patterns, &mut store, &mut rng);
            tracing::debug!(
                run_id,
                t,
                noise = stats.noise,
                planted = stats.planted,
                consequences = stats.fired.len(),
                "time window done"
            );
        }

        let mut store = store.truncated(n_tws);
        let labels = label_facts(&mut store, &patterns);
        tracing::info!(run_id, n_facts = store.len(), labels, "run finished");

        Ok(RunOutput {
            run_id,
            seed,
            entities,
            relations,
            n_tws,
            patterns,
            store,
        })
    }

    /// Entity and relation tables, weighted by the configured distributions.
    pub fn build_tables<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> ConfigResult<(SymbolTable, SymbolTable)> {
        let n_ents = self.config.n_ents;
        let n_rels = self.config.n_rels;
        let entities = weighted_table(SymbolKind::Entity, n_ents, self.entity_weights, rng)?;
        let relations = weighted_table(SymbolKind::Relation, n_rels, self.relation_weights, rng)?;
        Ok((entities, relations))
    }

    /// Fill every requested pattern slot, largest hop count first.
    ///
    /// A slot whose attempts are all sub-patterns of accepted patterns is
    /// skipped with a warning.
    pub fn generate_patterns<R: Rng + ?Sized>(
        &self,
        entities: &SymbolTable,
        relations: &SymbolTable,
        rng: &mut R,
    ) -> PatternResult<PatternSet> {
        let factory = PatternFactory::new(entities, relations);
        let mut set = PatternSet::new();

        for n_hops in HOP_COUNTS {
            let lags = &self.lag_specs[n_hops - 1];
            let requested = self.config.n_patterns(n_hops);
            let mut skipped = 0;
            for slot in 0..requested {
                let result = set.add_new_pattern(n_hops, self.config.max_retries, || {
                    factory.create(n_hops, lags, rng)
                });
                match result {
                    Ok(_) => {}
                    Err(err @ PatternError::RetriesExhausted { .. }) => {
                        tracing::warn!(n_hops, slot, "{err}, skipping slot");
                        skipped += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
            if requested > 0 {
                let accepted = set.count_hops(n_hops);
                tracing::debug!(n_hops, requested, accepted, skipped, "pattern slots filled");
            }
        }
        Ok(set)
    }

    /// Emit one time window into `store`.
    ///
    /// Noise goes in first. Planted chains and consequences are buffered
    /// during the pattern pass and inserted after it, so no pattern sees
    /// another pattern's output from the same window.
    pub fn step<R: Rng + ?Sized>(
        &self,
        t: u32,
        entities: &SymbolTable,
        relations: &SymbolTable,
        patterns: &PatternSet,
        store: &mut FactStore,
        rng: &mut R,
    ) -> WindowStats {
        let mut stats = WindowStats::default();

        for row in entities.rows() {
            let n = self.noise_count(rng);
            for _ in 0..n {
                let tail = entities.sample_uniform(rng);
                let relation = relations.sample_uniform(rng);
                store.insert(Fact::noise(Triple::from_raw(row.id, relation, tail), t));
            }
            stats.noise += n;
        }

        let mut planted = Vec::new();
        let mut consequences = Vec::new();
        for (id, pattern) in patterns.iter() {
            if rng.gen_bool(self.config.n_hops2p_force.get(pattern.n_hops)) {
                planted.extend(plant_chain(pattern, t, rng));
            }
            if rng.gen_bool(self.config.p_skip_consequence) {
                continue;
            }
            if chain_completes_at(pattern, store, t) {
                consequences.push(Fact::new(pattern.consequence, t));
                stats.fired.push(id);
            }
        }

        stats.planted = planted.len();
        for fact in planted.into_iter().chain(consequences) {
            store.insert(fact);
        }
        stats
    }

    /// Noise edges for one entity in one window. A density in (0, 1) is
    /// the probability of exactly one edge; otherwise it is truncated.
    fn noise_count<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let density = match &self.density {
            Some(sampler) => sampler.sample(rng),
            None => self.config.rnd_avg_density,
        };
        if density > 0.0 && density < 1.0 {
            usize::from(rng.gen_bool(density))
        } else {
            density.max(0.0) as usize
        }
    }
}

fn weighted_table<R: Rng + ?Sized>(
    kind: SymbolKind,
    n: usize,
    weights: Option<Sampler>,
    rng: &mut R,
) -> ConfigResult<SymbolTable> {
    match weights {
        Some(sampler) => SymbolTable::from_weight_fn(kind, n, |n| sampler.sample_n(n, rng)),
        None => SymbolTable::uniform(kind, n),
    }
}

/// Execute all `n_runs` runs on a pool of `min(n_jobs, n_runs)` threads,
/// handing each finished run to `sink`.
///
/// Runs share nothing. Every run is attempted; the first failure (by run id)
/// is returned once all have finished.
pub fn run_all<F>(config: &GeneratorConfig, base_seed: u64, sink: F) -> SynthResult<()>
where
    F: Fn(RunOutput) -> SynthResult<()> + Sync,
{
    let generator = Generator::new(config)?;
    let threads = config.n_jobs.min(config.n_runs).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| SynthError::Pool {
            threads,
            message: e.to_string(),
        })?;
    tracing::info!(n_runs = config.n_runs, threads, base_seed, "starting runs");

    let results: Vec<SynthResult<()>> = pool.install(|| {
        (0..config.n_runs)
            .into_par_iter()
            .map(|run_id| {
                let output = generator.run(run_id, derive_run_seed(base_seed, run_id))?;
                sink(output)
            })
            .collect()
    });

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        tracing::error!(failed, n_runs = config.n_runs, "some runs failed");
    }
    results.into_iter().collect()
}
