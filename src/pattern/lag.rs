//! Resolution of time-lag specifications into concrete bounds.

use rand::Rng;

use crate::distr::Sampler;
use crate::graph::Triple;

use super::TimeLag;

/// One bound of a lag: a literal, or a draw made once per pattern.
#[derive(Debug, Clone, Copy)]
pub enum LagBound {
    Fixed(u32),
    Drawn(Sampler),
}

impl LagBound {
    /// Resolve to a concrete number of time steps.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        match self {
            LagBound::Fixed(v) => *v,
            LagBound::Drawn(s) => s.sample_count(rng),
        }
    }
}

impl From<u32> for LagBound {
    fn from(v: u32) -> Self {
        LagBound::Fixed(v)
    }
}

/// A `(min, max)` lag specification for one antecedent position.
#[derive(Debug, Clone, Copy)]
pub struct LagSpec {
    pub min: LagBound,
    pub max: LagBound,
}

impl LagSpec {
    pub fn new(min: impl Into<LagBound>, max: impl Into<LagBound>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    /// A literal `(min, max)` pair.
    pub fn fixed(min: u32, max: u32) -> Self {
        Self::new(min, max)
    }
}

/// Resolve one lag per spec position.
///
/// Draws are made min first, then max. The minimum is raised to 1 for the
/// lag leading into the consequence (the last antecedent position) and for
/// any lag between two identical consecutive antecedents, so a pattern never
/// repeats a fact or fires its consequence in zero time. The maximum is then
/// raised to at least the minimum.
pub fn resolve_time_lags<R: Rng + ?Sized>(
    specs: &[LagSpec],
    antecedent: &[Triple],
    rng: &mut R,
) -> Vec<TimeLag> {
    specs
        .iter()
        .enumerate()
        .map(|(idx, spec)| {
            let mut min = spec.min.resolve(rng);
            let max = spec.max.resolve(rng);

            let repeats_next = antecedent
                .get(idx + 1)
                .is_some_and(|next| antecedent[idx] == *next);
            let precedes_consequence = idx + 1 == antecedent.len();
            if repeats_next || precedes_consequence {
                min = min.max(1);
            }

            TimeLag::new(min, max.max(min))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::distr::Distribution;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(9)
    }

    #[test]
    fn last_lag_is_never_zero() {
        let ante = [Triple::from_raw(1, 0, 2), Triple::from_raw(2, 0, 3)];
        let specs = [LagSpec::fixed(0, 0), LagSpec::fixed(0, 0)];
        let lags = resolve_time_lags(&specs, &ante, &mut rng());
        assert_eq!(lags, vec![TimeLag::new(0, 0), TimeLag::new(1, 1)]);
    }

    #[test]
    fn identical_consecutive_antecedents_get_positive_lag() {
        let t = Triple::from_raw(1, 0, 2);
        let ante = [t, t, Triple::from_raw(2, 0, 3)];
        let specs = [LagSpec::fixed(0, 4), LagSpec::fixed(0, 4), LagSpec::fixed(0, 4)];
        let lags = resolve_time_lags(&specs, &ante, &mut rng());
        assert_eq!(
            lags,
            vec![TimeLag::new(1, 4), TimeLag::new(0, 4), TimeLag::new(1, 4)]
        );
    }

    #[test]
    fn max_is_raised_to_min() {
        let ante = [Triple::from_raw(1, 0, 2)];
        let lags = resolve_time_lags(&[LagSpec::fixed(3, 1)], &ante, &mut rng());
        assert_eq!(lags, vec![TimeLag::new(3, 3)]);
    }

    #[test]
    fn drawn_bounds_are_resolved_once_each() {
        let sampler = Distribution::Constant { value: 6.0 }.build().unwrap();
        let ante = [Triple::from_raw(1, 0, 2)];
        let spec = LagSpec::new(LagBound::Fixed(2), LagBound::Drawn(sampler));
        assert_eq!(resolve_time_lags(&[spec], &ante, &mut rng()), vec![TimeLag::new(2, 6)]);
    }

    #[test]
    fn poisson_draws_respect_invariants() {
        let sampler = Distribution::Poisson { lambda: 2.0 }.build().unwrap();
        let ante = [Triple::from_raw(1, 0, 2), Triple::from_raw(1, 0, 2)];
        let spec = LagSpec::new(LagBound::Drawn(sampler), LagBound::Drawn(sampler));
        let mut rng = rng();
        for _ in 0..200 {
            for lag in resolve_time_lags(&[spec, spec], &ante, &mut rng) {
                assert!(lag.min >= 1);
                assert!(lag.min <= lag.max);
            }
        }
    }
}
