//! End-to-end tests for the tkg-synth generator.
//!
//! These exercise pattern generation, the time-window driver, truncation and
//! labeling together through the public API.

use std::collections::BTreeSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use tkg_synth::config::{ForceProbabilities, GeneratorConfig, LagConfig};
use tkg_synth::generate::{Generator, RunOutput};
use tkg_synth::graph::Triple;
use tkg_synth::graph::store::{Fact, FactStore};
use tkg_synth::pattern::search::satisfying_indices;
use tkg_synth::pattern::{TemporalPattern, TimeLag};
use tkg_synth::symbol::{EntityId, RelationId};

/// The small scenario: ten entities, a single relation, three windows.
fn tiny_config() -> GeneratorConfig {
    GeneratorConfig {
        seed: Some(0),
        n_ents: 10,
        n_rels: 1,
        n_tws: 3,
        n_3_hop: 0,
        n_2_hop: 0,
        n_1_hop: 1,
        time_lag_1_hop: vec![LagConfig::fixed(1, 1)],
        ..Default::default()
    }
}

fn run(config: &GeneratorConfig, seed: u64) -> RunOutput {
    Generator::new(config).unwrap().run(0, seed).unwrap()
}

#[test]
fn single_relation_one_hop_scenario() {
    let config = GeneratorConfig {
        n_hops2p_force: ForceProbabilities::uniform(1.0),
        p_skip_consequence: 0.0,
        ..tiny_config()
    };
    for seed in 0..20 {
        let output = run(&config, seed);
        assert_eq!(output.patterns.len(), 1);
        let (_, pattern) = output.patterns.iter().next().unwrap();

        let ante = pattern.antecedent[0];
        assert_eq!(ante.relation, RelationId(0));
        assert_eq!(pattern.consequence.relation, RelationId(0));
        let shared: Vec<EntityId> = pattern
            .consequence
            .endpoints()
            .into_iter()
            .filter(|e| ante.touches(*e))
            .collect();
        assert!(!shared.is_empty(), "seed {seed}: {pattern}");
    }
}

/// Brute-force check that antecedents `0..=pos` of `pattern` form a chain in
/// `store` whose position `pos` sits in its lag window before `t`.
fn chain_ends_before(pattern: &TemporalPattern, store: &FactStore, pos: usize, t: u32) -> bool {
    let lag = pattern.time_lags[pos];
    store.facts().iter().any(|f| {
        f.triple == pattern.antecedent[pos]
            && f.timestamp + lag.min <= t
            && t <= f.timestamp + lag.max
            && (pos == 0 || chain_ends_before(pattern, store, pos - 1, f.timestamp))
    })
}

#[test]
fn step_emits_consequences_only_after_complete_chains() {
    let config = GeneratorConfig {
        n_tws: 40,
        n_ents: 8,
        n_rels: 2,
        n_1_hop: 3,
        n_2_hop: 2,
        n_3_hop: 1,
        time_lag_1_hop: vec![LagConfig::fixed(2, 3)],
        time_lag_2_hop: vec![LagConfig::fixed(0, 2), LagConfig::fixed(1, 3)],
        time_lag_3_hop: vec![
            LagConfig::fixed(1, 2),
            LagConfig::fixed(0, 1),
            LagConfig::fixed(2, 2),
        ],
        n_hops2p_force: ForceProbabilities::uniform(0.3),
        p_skip_consequence: 0.0,
        rnd_avg_density: 0.0,
        rnd_avg_density_distr: None,
        ..tiny_config()
    };
    let generator = Generator::new(&config).unwrap();
    let mut fired_total = 0;

    for seed in 0..5 {
        let mut rng = StdRng::seed_from_u64(seed);
        let (entities, relations) = generator.build_tables(&mut rng).unwrap();
        let patterns = generator
            .generate_patterns(&entities, &relations, &mut rng)
            .unwrap();
        let mut store = FactStore::new();

        for t in 0..config.n_tws as u32 {
            let before = store.clone();
            let stats = generator.step(t, &entities, &relations, &patterns, &mut store, &mut rng);
            assert_eq!(stats.noise, 0);

            for (id, pattern) in patterns.iter() {
                let complete = chain_ends_before(pattern, &before, pattern.n_hops - 1, t);
                assert_eq!(
                    stats.fired.contains(&id),
                    complete,
                    "seed {seed}, t {t}: pattern {id} {pattern}"
                );
            }
            for &id in &stats.fired {
                let pattern = patterns.get(id).unwrap();
                let emitted = store
                    .matching(&pattern.consequence, Some(t..=t))
                    .next()
                    .unwrap();
                assert!(
                    satisfying_indices(pattern, &store).contains(&emitted),
                    "seed {seed}, t {t}: consequence of {pattern} outside every chain"
                );
            }
            fired_total += stats.fired.len();
        }
    }
    assert!(fired_total > 0);
}

#[test]
fn generated_patterns_satisfy_structural_invariants() {
    let config = GeneratorConfig {
        n_ents: 40,
        n_rels: 5,
        n_tws: 5,
        n_3_hop: 10,
        n_2_hop: 10,
        n_1_hop: 10,
        ..GeneratorConfig::default()
    };
    let generator = Generator::new(&config).unwrap();
    let mut rng = StdRng::seed_from_u64(123);
    let (entities, relations) = generator.build_tables(&mut rng).unwrap();
    let patterns = generator
        .generate_patterns(&entities, &relations, &mut rng)
        .unwrap();
    assert!(!patterns.is_empty());

    let all: Vec<&TemporalPattern> = patterns.iter().map(|(_, p)| p).collect();
    for p in &all {
        assert!(p.is_closed(), "{p}");
        assert!(p.is_connected(), "{p}");
        assert!(p.time_lags.last().unwrap().min >= 1, "{p}");
        for (i, lag) in p.time_lags.iter().enumerate() {
            assert!(lag.min <= lag.max);
            if p.antecedent.get(i + 1) == Some(&p.antecedent[i]) {
                assert!(lag.min >= 1, "{p}");
            }
        }
        let parsed: TemporalPattern = p.label().parse().unwrap();
        assert_eq!(&parsed, *p);
    }

    // No accepted pattern is a window of an earlier accepted one.
    let mut seen: Vec<Vec<Triple>> = Vec::new();
    for p in &all {
        let q = p.quadruples();
        assert!(!tkg_synth::pattern::dedup::is_subpattern(&q, &seen), "{p}");
        seen.push(q);
    }
}

#[test]
fn labels_match_search_results() {
    let config = GeneratorConfig {
        n_tws: 25,
        n_ents: 8,
        n_rels: 2,
        n_1_hop: 4,
        n_2_hop: 2,
        time_lag_2_hop: vec![LagConfig::fixed(0, 2), LagConfig::fixed(1, 2)],
        n_hops2p_force: ForceProbabilities::uniform(0.4),
        ..tiny_config()
    };
    let output = run(&config, 77);
    for (id, pattern) in output.patterns.iter() {
        let expected = satisfying_indices(pattern, &output.store);
        let labeled: BTreeSet<usize> = output
            .store
            .facts()
            .iter()
            .enumerate()
            .filter(|(_, f)| f.pattern_ids.contains(&id))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(labeled, expected, "pattern {id}: {pattern}");
    }
}

#[test]
fn search_completeness_on_a_hand_built_store() {
    let pattern = TemporalPattern {
        antecedent: vec![Triple::from_raw(1, 0, 2), Triple::from_raw(2, 0, 3)],
        consequence: Triple::from_raw(1, 0, 3),
        time_lags: vec![TimeLag::new(1, 1), TimeLag::new(1, 1)],
        n_hops: 2,
    };

    let mut store = FactStore::new();
    let a = store.insert(Fact::new(Triple::from_raw(1, 0, 2), 0));
    let b = store.insert(Fact::new(Triple::from_raw(2, 0, 3), 1));
    let c = store.insert(Fact::new(Triple::from_raw(1, 0, 3), 2));
    store.insert(Fact::noise(Triple::from_raw(3, 0, 1), 1));
    assert_eq!(satisfying_indices(&pattern, &store), BTreeSet::from([a, b, c]));

    let mut late = FactStore::new();
    late.insert(Fact::new(Triple::from_raw(1, 0, 2), 0));
    late.insert(Fact::new(Triple::from_raw(2, 0, 3), 1));
    late.insert(Fact::new(Triple::from_raw(1, 0, 3), 5));
    assert!(satisfying_indices(&pattern, &late).is_empty());
}

#[test]
fn runs_are_reproducible_and_seed_sensitive() {
    let config = GeneratorConfig {
        n_tws: 10,
        n_hops2p_force: ForceProbabilities::uniform(0.5),
        ..tiny_config()
    };
    let a = run(&config, 42);
    let b = run(&config, 42);
    let c = run(&config, 43);
    assert_eq!(a.store.facts(), b.store.facts());
    assert_ne!(a.store.facts(), c.store.facts());
}
