//! Dependency Sets
//!
//! A `DepSet` records which branching decisions a derived fact depends on,
//! as a set of branch levels. When the tableau hits a clash, the union of the
//! dep-sets of the contradicting facts tells the backtracker which decision
//! points actually contributed, so it can jump straight to the deepest one
//! instead of unwinding chronologically.
//!
//! Dep-sets are immutable values: `union` returns a fresh set.

use std::collections::BTreeSet;
use std::fmt;

/// A branching level. Level 1 is the initial (deterministic) level; every
/// non-deterministic decision opens a new level above it.
pub type BranchLevel = u32;

/// Immutable set of branch levels that a derived fact depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepSet {
    levels: BTreeSet<BranchLevel>,
}

impl DepSet {
    /// The empty dep-set: a fact that holds unconditionally
    pub fn empty() -> Self {
        DepSet {
            levels: BTreeSet::new(),
        }
    }

    /// A dep-set containing a single branch level
    pub fn singleton(level: BranchLevel) -> Self {
        let mut levels = BTreeSet::new();
        levels.insert(level);
        DepSet { levels }
    }

    /// Union of two dep-sets, as a fresh set
    pub fn union(&self, other: &DepSet) -> DepSet {
        let mut levels = self.levels.clone();
        levels.extend(other.levels.iter().copied());
        DepSet { levels }
    }

    /// This set plus one extra level, as a fresh set
    pub fn with(&self, level: BranchLevel) -> DepSet {
        let mut levels = self.levels.clone();
        levels.insert(level);
        DepSet { levels }
    }

    /// Whether the given branch level contributed to this fact
    pub fn contains(&self, level: BranchLevel) -> bool {
        self.levels.contains(&level)
    }

    /// The deepest contributing branch level, or 0 for the empty set
    pub fn max_level(&self) -> BranchLevel {
        self.levels.iter().next_back().copied().unwrap_or(0)
    }

    /// Drop all levels at or above `level`, as a fresh set
    ///
    /// Used when a branching point is exhausted: its own level must not
    /// propagate upward as a cause.
    pub fn restricted_below(&self, level: BranchLevel) -> DepSet {
        DepSet {
            levels: self.levels.range(..level).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Iterate over the contributing levels in ascending order
    pub fn iter(&self) -> impl Iterator<Item = BranchLevel> + '_ {
        self.levels.iter().copied()
    }
}

impl fmt::Display for DepSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, level) in self.levels.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{level}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_no_max_level() {
        let ds = DepSet::empty();
        assert!(ds.is_empty());
        assert_eq!(ds.max_level(), 0);
    }

    #[test]
    fn union_is_fresh() {
        let a = DepSet::singleton(1);
        let b = DepSet::singleton(3);
        let u = a.union(&b);
        assert!(u.contains(1) && u.contains(3));
        // operands are untouched
        assert!(!a.contains(3));
        assert!(!b.contains(1));
    }

    #[test]
    fn max_level_is_deepest() {
        let ds = DepSet::singleton(2).with(7).with(4);
        assert_eq!(ds.max_level(), 7);
    }

    #[test]
    fn restriction_drops_own_level() {
        let ds = DepSet::singleton(1).with(4).with(6);
        let below = ds.restricted_below(4);
        assert!(below.contains(1));
        assert!(!below.contains(4));
        assert!(!below.contains(6));
    }
}
