// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # tkg-synth
//!
//! Synthetic temporal knowledge graphs with deliberately embedded multi-hop
//! implication patterns, for benchmarking temporal reasoning.
//!
//! ## Architecture
//!
//! - **Symbols** (`symbol`): entity/relation id tables with weighted sampling
//! - **Graph** (`graph`): triples, connectivity predicates, the indexed fact store
//! - **Patterns** (`pattern`): constrained 1/2/3-hop pattern generation with
//!   seeded repair, sub-pattern deduplication, and temporal chain search
//! - **Driver** (`generate`): per-run time-window loop and parallel runs
//! - **Output** (`split`, `export`): temporal split and TSV artifacts
//!
//! ## Library usage
//!
//! ```no_run
//! use tkg_synth::config::GeneratorConfig;
//! use tkg_synth::generate::Generator;
//!
//! let config = GeneratorConfig {
//!     seed: Some(1),
//!     ..Default::default()
//! };
//! let output = Generator::new(&config).unwrap().run(0, 1).unwrap();
//! for (id, pattern) in output.patterns.iter() {
//!     println!("{id}\t{pattern}");
//! }
//! ```

pub mod config;
pub mod distr;
pub mod error;
pub mod export;
pub mod generate;
pub mod graph;
pub mod pattern;
pub mod split;
pub mod symbol;
