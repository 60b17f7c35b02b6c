//! Named numeric distributions for weights, lags, and noise density.
//!
//! Configuration files name a distribution and its parameters
//! (`{ poisson = { lambda = 5.0 } }`). [`Distribution::build`] validates the
//! parameters once and yields a [`Sampler`] that draws from `rand_distr`.

use rand::Rng;
use rand_distr::Distribution as _;
use rand_distr::{Gamma, Poisson, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// A distribution as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// Always `value`.
    Constant { value: f64 },
    /// Continuous uniform on `[low, high)`.
    Uniform { low: f64, high: f64 },
    /// Gamma with shape `k` and scale `θ`.
    Gamma { shape: f64, scale: f64 },
    /// Poisson with mean `lambda`.
    Poisson { lambda: f64 },
}

impl Distribution {
    /// Validate the parameters and build a sampler.
    pub fn build(&self) -> ConfigResult<Sampler> {
        let invalid = |message: String| ConfigError::Distribution { message };
        match *self {
            Self::Constant { value } => {
                if value.is_finite() {
                    Ok(Sampler::Constant(value))
                } else {
                    Err(invalid(format!("constant {value} is not finite")))
                }
            }
            Self::Uniform { low, high } => {
                if low.is_finite() && high.is_finite() && low < high {
                    Ok(Sampler::Uniform(Uniform::new(low, high)))
                } else {
                    Err(invalid(format!("uniform bounds [{low}, {high}) are empty")))
                }
            }
            Self::Gamma { shape, scale } => Gamma::new(shape, scale)
                .map(Sampler::Gamma)
                .map_err(|e| invalid(format!("gamma(shape={shape}, scale={scale}): {e}"))),
            Self::Poisson { lambda } => Poisson::new(lambda)
                .map(Sampler::Poisson)
                .map_err(|e| invalid(format!("poisson(lambda={lambda}): {e}"))),
        }
    }
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant { value } => write!(f, "constant({value})"),
            Self::Uniform { low, high } => write!(f, "uniform({low}, {high})"),
            Self::Gamma { shape, scale } => write!(f, "gamma(shape={shape}, scale={scale})"),
            Self::Poisson { lambda } => write!(f, "poisson({lambda})"),
        }
    }
}

/// A validated, ready-to-draw distribution.
#[derive(Debug, Clone, Copy)]
pub enum Sampler {
    Constant(f64),
    Uniform(Uniform<f64>),
    Gamma(Gamma<f64>),
    Poisson(Poisson<f64>),
}

impl Sampler {
    /// Draw `n` values, e.g. one weight per entity.
    pub fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }

    /// Draw a value and round it to a non-negative integer.
    pub fn sample_count<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let x = self.sample(rng).round();
        if x <= 0.0 { 0 } else { x.min(u32::MAX as f64) as u32 }
    }
}

impl rand_distr::Distribution<f64> for Sampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Sampler::Constant(v) => *v,
            Sampler::Uniform(d) => d.sample(rng),
            Sampler::Gamma(d) => d.sample(rng),
            Sampler::Poisson(d) => d.sample(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::Distribution as _;

    use super::*;

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(Distribution::Poisson { lambda: 0.0 }.build().is_err());
        assert!(Distribution::Gamma { shape: -1.0, scale: 1.0 }.build().is_err());
        assert!(Distribution::Uniform { low: 2.0, high: 2.0 }.build().is_err());
        assert!(Distribution::Constant { value: f64::NAN }.build().is_err());
    }

    #[test]
    fn constant_counts() {
        let s = Distribution::Constant { value: 2.6 }.build().unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(s.sample_count(&mut rng), 3);
        let s = Distribution::Constant { value: -4.0 }.build().unwrap();
        assert_eq!(s.sample_count(&mut rng), 0);
    }

    #[test]
    fn poisson_draws_are_non_negative_integers() {
        let s = Distribution::Poisson { lambda: 5.0 }.build().unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let x = s.sample(&mut rng);
            assert!(x >= 0.0);
            assert_eq!(x, x.round());
        }
    }

    #[test]
    fn gamma_weights_are_positive() {
        let s = Distribution::Gamma { shape: 1.0, scale: 1.0 }.build().unwrap();
        let w = s.sample_n(20, &mut StdRng::seed_from_u64(1));
        assert_eq!(w.len(), 20);
        assert!(w.iter().all(|&x| x > 0.0));
    }

    #[test]
    fn parses_from_toml_table() {
        #[derive(Deserialize)]
        struct Wrapper {
            d: Distribution,
        }
        let w: Wrapper = toml::from_str("d = { poisson = { lambda = 5.0 } }").unwrap();
        assert_eq!(w.d, Distribution::Poisson { lambda: 5.0 });
    }
}
