//! Algebraic laws of the dep-set clash algebra.

use proptest::prelude::*;
use tableaux::DepSet;

fn depset(levels: &[u32]) -> DepSet {
    levels
        .iter()
        .fold(DepSet::empty(), |acc, &level| acc.with(level))
}

proptest! {
    #[test]
    fn union_is_commutative(a in prop::collection::vec(1u32..64, 0..8),
                            b in prop::collection::vec(1u32..64, 0..8)) {
        let (x, y) = (depset(&a), depset(&b));
        prop_assert_eq!(x.union(&y), y.union(&x));
    }

    #[test]
    fn union_is_associative(a in prop::collection::vec(1u32..64, 0..8),
                            b in prop::collection::vec(1u32..64, 0..8),
                            c in prop::collection::vec(1u32..64, 0..8)) {
        let (x, y, z) = (depset(&a), depset(&b), depset(&c));
        prop_assert_eq!(x.union(&y).union(&z), x.union(&y.union(&z)));
    }

    #[test]
    fn union_is_idempotent(a in prop::collection::vec(1u32..64, 0..8)) {
        let x = depset(&a);
        prop_assert_eq!(x.union(&x), x);
    }

    #[test]
    fn max_level_bounds_every_member(a in prop::collection::vec(1u32..64, 1..8)) {
        let x = depset(&a);
        let max = x.max_level();
        prop_assert!(x.iter().all(|level| level <= max));
        prop_assert!(x.contains(max));
    }

    #[test]
    fn singletons_are_totally_ordered(a in 1u32..1000, b in 1u32..1000) {
        let (x, y) = (DepSet::singleton(a), DepSet::singleton(b));
        // exactly one of <, =, > holds on the level order
        let ordering = x.max_level().cmp(&y.max_level());
        prop_assert_eq!(ordering, a.cmp(&b));
    }

    #[test]
    fn restriction_never_keeps_the_cut_level(a in prop::collection::vec(1u32..64, 0..8),
                                             cut in 1u32..64) {
        let x = depset(&a);
        let below = x.restricted_below(cut);
        prop_assert!(!below.contains(cut));
        prop_assert!(below.iter().all(|level| level < cut));
    }
}

#[test]
fn empty_set_is_the_union_identity() {
    let x = depset(&[3, 5]);
    assert_eq!(x.union(&DepSet::empty()), x);
}
