//! Seeded constraint repair for sampled pattern values.
//!
//! The factory draws all entity and relation ids up front, then patches the
//! draw in place wherever it breaks a structural constraint. Both primitives
//! take the caller's buffer by `&mut` and report only failure; their contract
//! is the state of the buffer afterwards. Given the same RNG state and inputs
//! they make the same change.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{RepairError, RepairResult};

/// Overwrite a non-empty random subset of `targets` in `values` with values
/// drawn uniformly from `allowed`.
///
/// The subset is uniform over all non-empty subsets of `targets`, so at least
/// one target ends up holding an allowed value; which ones is random.
pub fn force_swap_to_entities<T, R>(
    targets: &[usize],
    values: &mut [T],
    allowed: &[T],
    rng: &mut R,
) -> RepairResult<()>
where
    T: Copy,
    R: Rng + ?Sized,
{
    if targets.is_empty() {
        return Err(RepairError::NoTargets);
    }
    if allowed.is_empty() {
        return Err(RepairError::EmptyPool);
    }
    check_bounds(targets, values.len())?;

    // Rejection-sample a fair coin per target until the subset is non-empty.
    let chosen = loop {
        let subset: Vec<usize> = targets
            .iter()
            .copied()
            .filter(|_| rng.gen_bool(0.5))
            .collect();
        if !subset.is_empty() {
            break subset;
        }
    };

    for idx in chosen {
        if let Some(&value) = allowed.choose(rng) {
            values[idx] = value;
        }
    }
    Ok(())
}

/// Make the two `targets` in `values` bridge `component_a` and `component_b`.
///
/// If one target already holds a value of either component, the other target
/// is redrawn from the opposite component. Otherwise the components are
/// assigned to the targets in random order and both are redrawn. Afterwards
/// one target holds a value of `component_a` and the other a value of
/// `component_b`.
pub fn force_connect_components<T, R>(
    targets: &[usize],
    values: &mut [T],
    component_a: &[T],
    component_b: &[T],
    rng: &mut R,
) -> RepairResult<()>
where
    T: Copy + PartialEq,
    R: Rng + ?Sized,
{
    let &[first, second] = targets else {
        return Err(RepairError::TargetCount {
            actual: targets.len(),
        });
    };
    if component_a.is_empty() || component_b.is_empty() {
        return Err(RepairError::EmptyPool);
    }
    check_bounds(targets, values.len())?;

    let draw = |pool: &[T], rng: &mut R| pool.choose(rng).copied().ok_or(RepairError::EmptyPool);

    let (v1, v2) = (values[first], values[second]);
    if component_a.contains(&v1) {
        values[second] = draw(component_b, rng)?;
    } else if component_b.contains(&v1) {
        values[second] = draw(component_a, rng)?;
    } else if component_a.contains(&v2) {
        values[first] = draw(component_b, rng)?;
    } else if component_b.contains(&v2) {
        values[first] = draw(component_a, rng)?;
    } else {
        let mut components = [component_a, component_b];
        components.shuffle(rng);
        values[first] = draw(components[0], rng)?;
        values[second] = draw(components[1], rng)?;
    }
    Ok(())
}

fn check_bounds(targets: &[usize], len: usize) -> RepairResult<()> {
    match targets.iter().find(|&&idx| idx >= len) {
        Some(&index) => Err(RepairError::OutOfBounds { index, len }),
        None => Ok(()),
    }
}
