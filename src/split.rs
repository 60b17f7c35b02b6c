//! Temporal train/valid/test split by timestamp quantile.

use crate::config::SplitFractions;
use crate::error::{ConfigError, ConfigResult};
use crate::graph::store::FactStore;

/// Inclusive upper timestamps of the three sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitBounds {
    pub end_train: u32,
    pub end_valid: u32,
    pub end_test: u32,
}

/// Fact positions per set, each in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub valid: Vec<usize>,
    pub test: Vec<usize>,
}

/// Linear-interpolated quantile of ascending `values`, truncated to an
/// integer. `None` for an empty slice.
pub fn quantile(values: &[u32], q: f64) -> Option<u32> {
    let last = values.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(last);
    let frac = pos - lo as f64;
    let (a, b) = (f64::from(values[lo]), f64::from(values[hi]));
    Some((a + (b - a) * frac) as u32)
}

/// Boundaries over the unique, ascending `timestamps`.
///
/// Boundaries that collide while the later set is meant to be non-empty are
/// a configuration error. `None` when there are no timestamps at all.
pub fn split_bounds(
    timestamps: &[u32],
    fractions: &SplitFractions,
) -> ConfigResult<Option<SplitBounds>> {
    let (Some(end_train), Some(end_valid), Some(&end_test)) = (
        quantile(timestamps, fractions.train),
        quantile(timestamps, fractions.train + fractions.valid),
        timestamps.last(),
    ) else {
        return Ok(None);
    };

    if end_train == end_valid && fractions.valid != 0.0 {
        return Err(ConfigError::SplitCollision {
            boundary: "train and valid".into(),
            timestamp: end_train,
        });
    }
    if end_valid == end_test && fractions.test != 0.0 {
        return Err(ConfigError::SplitCollision {
            boundary: "valid and test".into(),
            timestamp: end_valid,
        });
    }
    Ok(Some(SplitBounds {
        end_train,
        end_valid,
        end_test,
    }))
}

/// Split the store's facts: train is `t <= end_train`, valid is
/// `end_train < t <= end_valid`, test is everything later.
pub fn temporal_split(store: &FactStore, fractions: &SplitFractions) -> ConfigResult<Split> {
    let timestamps: Vec<u32> = store.timestamps().collect();
    let Some(bounds) = split_bounds(&timestamps, fractions)? else {
        return Ok(Split::default());
    };
    tracing::debug!(
        end_train = bounds.end_train,
        end_valid = bounds.end_valid,
        end_test = bounds.end_test,
        "split boundaries"
    );
    Ok(Split {
        train: between(store, None, bounds.end_train),
        valid: between(store, Some(bounds.end_train), bounds.end_valid),
        test: between(store, Some(bounds.end_valid), u32::MAX),
    })
}

/// Positions with `after < t <= through`.
fn between(store: &FactStore, after: Option<u32>, through: u32) -> Vec<usize> {
    let start = match after {
        None => 0,
        Some(a) => match a.checked_add(1) {
            Some(s) => s,
            None => return Vec::new(),
        },
    };
    if start > through {
        return Vec::new();
    }
    store.in_time_range(start..=through).collect()
}
