//! tkg-synth CLI: synthetic temporal knowledge graph generator.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use tkg_synth::config::GeneratorConfig;
use tkg_synth::export::export_run;
use tkg_synth::generate::{Generator, derive_run_seed, resolve_base_seed, run_all};
use tkg_synth::pattern::TemporalPattern;

#[derive(Parser)]
#[command(
    name = "tkg-synth",
    version,
    about = "Synthetic temporal knowledge graphs with embedded multi-hop patterns"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and export every configured run.
    Generate {
        /// Path to the TOML configuration.
        #[arg(long)]
        config: PathBuf,

        /// Override `export_dir`.
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Override the base seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Override `n_runs`.
        #[arg(long)]
        runs: Option<usize>,

        /// Override `n_jobs`.
        #[arg(long)]
        jobs: Option<usize>,
    },

    /// Print the pattern set that run 0 would use, without generating facts.
    Patterns {
        /// Path to the TOML configuration.
        #[arg(long)]
        config: PathBuf,

        /// Override the base seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Parse a pattern label and show its structure.
    Label {
        /// A label such as `(1,0,2)(2,0,3)=>(1,0,3)|[0,5][1,4]|2`.
        label: String,
    },

    /// Write the default configuration as TOML.
    InitConfig {
        /// Destination file.
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct PatternRow<'a> {
    id: u32,
    label: String,
    #[serde(flatten)]
    pattern: &'a TemporalPattern,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            config,
            export_dir,
            seed,
            runs,
            jobs,
        } => {
            let mut config = GeneratorConfig::load(&config)?;
            if let Some(dir) = export_dir {
                config.export_dir = dir;
            }
            if let Some(runs) = runs {
                config.n_runs = runs;
            }
            if let Some(jobs) = jobs {
                config.n_jobs = jobs;
            }
            config.seed = seed.or(config.seed);
            config.validate()?;

            // The exported config.toml records the seed actually used.
            let base_seed = resolve_base_seed(&config);
            config.seed = Some(base_seed);

            let export_dir = config.export_dir.clone();
            run_all(&config, base_seed, |output| {
                export_run(&output, &config, &export_dir).map(|_| ())
            })?;
            println!(
                "Generated {} run(s) into {} (seed {base_seed})",
                config.n_runs,
                export_dir.display()
            );
        }

        Commands::Patterns { config, seed, json } => {
            let mut config = GeneratorConfig::load(&config)?;
            config.seed = seed.or(config.seed);
            let base_seed = resolve_base_seed(&config);

            let generator = Generator::new(&config)?;
            let mut rng = StdRng::seed_from_u64(derive_run_seed(base_seed, 0));
            let (entities, relations) = generator.build_tables(&mut rng)?;
            let patterns = generator.generate_patterns(&entities, &relations, &mut rng)?;

            if json {
                let rows: Vec<PatternRow<'_>> = patterns
                    .iter()
                    .map(|(id, pattern)| PatternRow {
                        id: id.get(),
                        label: pattern.label(),
                        pattern,
                    })
                    .collect();
                let out = serde_json::to_string_pretty(&rows).into_diagnostic()?;
                println!("{out}");
            } else {
                println!("{} pattern(s), seed {base_seed}:", patterns.len());
                for (id, pattern) in patterns.iter() {
                    println!("  {:>4}  {pattern}", id.get());
                }
            }
        }

        Commands::Label { label } => {
            let pattern: TemporalPattern = label.parse()?;
            println!("{}-hop pattern", pattern.n_hops);
            for (i, (triple, lag)) in pattern
                .antecedent
                .iter()
                .zip(&pattern.time_lags)
                .enumerate()
            {
                let next = if i + 1 == pattern.n_hops {
                    "consequence"
                } else {
                    "next"
                };
                println!("  {triple}  then {next} after [{}, {}]", lag.min, lag.max);
            }
            println!("  => {}", pattern.consequence);
            println!(
                "  closed: {}, connected: {}",
                pattern.is_closed(),
                pattern.is_connected()
            );
        }

        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                miette::bail!(
                    "{} already exists; pass --force to overwrite it",
                    path.display()
                );
            }
            GeneratorConfig::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}
