//! Generator configuration, persisted as TOML.
//!
//! Callable-valued settings (weighting functions, drawn lag bounds, noise
//! density) are written as distribution tables, e.g.
//! `rnd_avg_density_distr = { poisson = { lambda = 5.0 } }`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::distr::{Distribution, Sampler};
use crate::error::{ConfigError, ConfigResult};
use crate::pattern::lag::{LagBound, LagSpec};

/// Hop counts the factory can build, largest first (generation order).
pub const HOP_COUNTS: [usize; 3] = [3, 2, 1];

/// One lag bound as written in configuration: a literal or a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LagBoundConfig {
    Fixed(u32),
    Drawn(Distribution),
}

impl LagBoundConfig {
    fn build(&self) -> ConfigResult<LagBound> {
        match self {
            Self::Fixed(v) => Ok(LagBound::Fixed(*v)),
            Self::Drawn(d) => d.build().map(LagBound::Drawn),
        }
    }
}

/// `(min, max)` lag for one antecedent position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagConfig {
    pub min: LagBoundConfig,
    pub max: LagBoundConfig,
}

impl LagConfig {
    pub fn fixed(min: u32, max: u32) -> Self {
        Self {
            min: LagBoundConfig::Fixed(min),
            max: LagBoundConfig::Fixed(max),
        }
    }

    /// Literal minimum, drawn maximum.
    pub fn drawn_max(min: u32, max: Distribution) -> Self {
        Self {
            min: LagBoundConfig::Fixed(min),
            max: LagBoundConfig::Drawn(max),
        }
    }

    pub fn build(&self) -> ConfigResult<LagSpec> {
        Ok(LagSpec {
            min: self.min.build()?,
            max: self.max.build()?,
        })
    }
}

/// Probability of planting a full antecedent chain, per hop count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceProbabilities {
    #[serde(rename = "1", default)]
    pub one: f64,
    #[serde(rename = "2", default)]
    pub two: f64,
    #[serde(rename = "3", default)]
    pub three: f64,
}

impl ForceProbabilities {
    pub fn uniform(p: f64) -> Self {
        Self {
            one: p,
            two: p,
            three: p,
        }
    }

    pub fn get(&self, n_hops: usize) -> f64 {
        match n_hops {
            1 => self.one,
            2 => self.two,
            3 => self.three,
            _ => 0.0,
        }
    }
}

/// Train/valid/test fractions of the unique timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitFractions {
    pub train: f64,
    pub valid: f64,
    pub test: f64,
}

impl Default for SplitFractions {
    fn default() -> Self {
        Self {
            train: 1.0,
            valid: 0.0,
            test: 0.0,
        }
    }
}

/// Everything one invocation of the generator needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Each run writes into `<export_dir>/run_<id>/`.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    #[serde(default = "default_one")]
    pub n_runs: usize,
    /// Worker threads; capped at `n_runs`.
    #[serde(default = "default_one")]
    pub n_jobs: usize,
    /// Base seed. Drawn from entropy and logged when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub n_ents: usize,
    pub n_rels: usize,
    /// Number of time windows.
    pub n_tws: usize,

    #[serde(default)]
    pub n_3_hop: usize,
    #[serde(default)]
    pub n_2_hop: usize,
    #[serde(default)]
    pub n_1_hop: usize,
    /// Attempts per pattern slot before it is skipped.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Noise edges per entity and window, used when no distribution is set.
    /// Values in (0, 1) are the probability of a single edge.
    #[serde(default)]
    pub rnd_avg_density: f64,
    /// Probability that a satisfied chain's consequence is withheld.
    #[serde(default)]
    pub p_skip_consequence: f64,

    #[serde(default)]
    pub split: SplitFractions,
    /// Entity weights for pattern templates; uniform when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pat_distr_ents: Option<Distribution>,
    /// Relation weights for pattern templates; uniform when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pat_distr_rels: Option<Distribution>,
    /// Overrides `rnd_avg_density` with a fresh draw per entity and window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rnd_avg_density_distr: Option<Distribution>,
    #[serde(default = "default_force")]
    pub n_hops2p_force: ForceProbabilities,

    #[serde(default)]
    pub time_lag_3_hop: Vec<LagConfig>,
    #[serde(default)]
    pub time_lag_2_hop: Vec<LagConfig>,
    #[serde(default)]
    pub time_lag_1_hop: Vec<LagConfig>,
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_one() -> usize {
    1
}
fn default_max_retries() -> usize {
    10
}
fn default_force() -> ForceProbabilities {
    ForceProbabilities::uniform(0.0)
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let gamma = Distribution::Gamma {
            shape: 1.0,
            scale: 1.0,
        };
        let poisson = Distribution::Poisson { lambda: 5.0 };
        Self {
            export_dir: default_export_dir(),
            n_runs: 1,
            n_jobs: 1,
            seed: None,
            n_ents: 10,
            n_rels: 1,
            n_tws: 3,
            n_3_hop: 10,
            n_2_hop: 10,
            n_1_hop: 10,
            max_retries: default_max_retries(),
            rnd_avg_density: 5.0,
            p_skip_consequence: 0.1,
            split: SplitFractions::default(),
            pat_distr_ents: Some(gamma.clone()),
            pat_distr_rels: Some(gamma),
            rnd_avg_density_distr: Some(poisson.clone()),
            n_hops2p_force: ForceProbabilities::uniform(0.1),
            time_lag_3_hop: vec![
                LagConfig::drawn_max(0, poisson.clone()),
                LagConfig::drawn_max(0, poisson.clone()),
                LagConfig::drawn_max(1, poisson.clone()),
            ],
            time_lag_2_hop: vec![
                LagConfig::drawn_max(0, poisson.clone()),
                LagConfig::drawn_max(1, poisson.clone()),
            ],
            time_lag_1_hop: vec![LagConfig::drawn_max(1, poisson)],
        }
    }
}

impl GeneratorConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from TOML text without validating.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Read {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Number of patterns requested with `n_hops` antecedents.
    pub fn n_patterns(&self, n_hops: usize) -> usize {
        match n_hops {
            1 => self.n_1_hop,
            2 => self.n_2_hop,
            3 => self.n_3_hop,
            _ => 0,
        }
    }

    /// Lag configuration for `n_hops`-hop patterns.
    pub fn time_lags(&self, n_hops: usize) -> &[LagConfig] {
        match n_hops {
            1 => &self.time_lag_1_hop,
            2 => &self.time_lag_2_hop,
            3 => &self.time_lag_3_hop,
            _ => &[],
        }
    }

    /// Built lag specs for `n_hops`-hop patterns.
    pub fn lag_specs(&self, n_hops: usize) -> ConfigResult<Vec<LagSpec>> {
        self.time_lags(n_hops).iter().map(LagConfig::build).collect()
    }

    /// Sampler for the per-entity noise density, if one is configured.
    pub fn density_sampler(&self) -> ConfigResult<Option<Sampler>> {
        self.rnd_avg_density_distr
            .as_ref()
            .map(Distribution::build)
            .transpose()
    }

    /// Reject settings the generator cannot honor.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |field: &str, message: String| ConfigError::InvalidValue {
            field: field.to_string(),
            message,
        };

        let counts = [("n_ents", self.n_ents), ("n_rels", self.n_rels), ("n_tws", self.n_tws)];
        for (field, value) in counts {
            if value == 0 {
                return Err(invalid(field, "must be at least 1".into()));
            }
            if u32::try_from(value).is_err() {
                return Err(invalid(field, format!("{value} does not fit in 32 bits")));
            }
        }
        for (field, value) in [
            ("n_runs", self.n_runs),
            ("n_jobs", self.n_jobs),
            ("max_retries", self.max_retries),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be at least 1".into()));
            }
        }

        if !self.rnd_avg_density.is_finite() || self.rnd_avg_density < 0.0 {
            return Err(invalid(
                "rnd_avg_density",
                format!("{} is not a non-negative number", self.rnd_avg_density),
            ));
        }
        check_probability("p_skip_consequence", self.p_skip_consequence)?;
        for n_hops in HOP_COUNTS {
            check_probability(
                &format!("n_hops2p_force.{n_hops}"),
                self.n_hops2p_force.get(n_hops),
            )?;
        }

        let SplitFractions { train, valid, test } = self.split;
        let fractions = [("split.train", train), ("split.valid", valid), ("split.test", test)];
        for (field, value) in fractions {
            check_probability(field, value)?;
        }
        if ((train + valid + test) - 1.0).abs() > 1e-6 {
            return Err(invalid(
                "split",
                format!("fractions sum to {}, expected 1", train + valid + test),
            ));
        }

        for n_hops in HOP_COUNTS {
            let lags = self.time_lags(n_hops);
            if self.n_patterns(n_hops) > 0 && lags.len() != n_hops {
                return Err(invalid(
                    &format!("time_lag_{n_hops}_hop"),
                    format!("needs {n_hops} entries, got {}", lags.len()),
                ));
            }
            self.lag_specs(n_hops)?;
        }
        for distr in [&self.pat_distr_ents, &self.pat_distr_rels, &self.rnd_avg_density_distr]
            .into_iter()
            .flatten()
        {
            distr.build()?;
        }
        Ok(())
    }
}

fn check_probability(field: &str, p: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("{p} is not a probability in [0, 1]"),
        })
    }
}
