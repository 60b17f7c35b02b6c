//! Connectivity predicates over entity sets and triples.
//!
//! Pure, total functions used by the pattern factory to decide whether a
//! freshly drawn antecedent overlaps or bridges the ones before it.

use std::collections::HashSet;
use std::hash::Hash;

use crate::symbol::EntityId;

use super::Triple;

/// Whether `a` and `b` share any element.
pub fn entities_intersect<T: Eq + Hash>(a: &[T], b: &[T]) -> bool {
    let a: HashSet<&T> = a.iter().collect();
    b.iter().any(|x| a.contains(x))
}

/// Whether the pair `(e1, e2)` bridges two triples: one entity is an endpoint
/// of `t1` and the other an endpoint of `t2`, in either order.
pub fn entities_connect_triples(e1: EntityId, e2: EntityId, t1: &Triple, t2: &Triple) -> bool {
    (t1.touches(e1) && t2.touches(e2)) || (t1.touches(e2) && t2.touches(e1))
}

/// Whether `(e1, e2)` bridges some triple of `component_a` to some triple of
/// `component_b`.
pub fn entities_connect_components(
    e1: EntityId,
    e2: EntityId,
    component_a: &[Triple],
    component_b: &[Triple],
) -> bool {
    component_a.iter().any(|t1| {
        component_b
            .iter()
            .any(|t2| entities_connect_triples(e1, e2, t1, t2))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(raw: u32) -> EntityId {
        EntityId(raw)
    }

    #[test]
    fn intersect_detects_shared_element() {
        assert!(entities_intersect(&[e(1), e(2)], &[e(2), e(5)]));
        assert!(!entities_intersect(&[e(1), e(2)], &[e(3), e(4)]));
        assert!(!entities_intersect::<EntityId>(&[], &[e(1)]));
    }

    #[test]
    fn connect_triples_checks_both_orderings() {
        let t1 = Triple::from_raw(1, 0, 2);
        let t2 = Triple::from_raw(3, 0, 4);
        assert!(entities_connect_triples(e(2), e(3), &t1, &t2));
        assert!(entities_connect_triples(e(4), e(1), &t1, &t2));
        assert!(!entities_connect_triples(e(1), e(2), &t1, &t2));
        assert!(!entities_connect_triples(e(3), e(4), &t1, &t2));
    }

    #[test]
    fn relation_ids_do_not_count_as_endpoints() {
        let t1 = Triple::from_raw(1, 7, 2);
        let t2 = Triple::from_raw(3, 0, 4);
        assert!(!entities_connect_triples(e(7), e(3), &t1, &t2));
    }

    #[test]
    fn connect_components_is_existential() {
        let a = [Triple::from_raw(1, 0, 2), Triple::from_raw(5, 0, 6)];
        let b = [Triple::from_raw(3, 0, 4)];
        assert!(entities_connect_components(e(6), e(4), &a, &b));
        assert!(!entities_connect_components(e(6), e(9), &a, &b));
        assert!(!entities_connect_components(e(6), e(4), &a, &[]));
    }
}
