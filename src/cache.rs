//! Model Caches
//!
//! A model cache is an approximate summary of a completed tableau for one
//! DAG vertex: the concepts on the root label and the roles its model
//! touches. Two satisfiable models can be merged without re-running the
//! tableau when their summaries cannot interact; a provable interaction
//! yields `Invalid`, an uncertain one `Failed`.
//!
//! Caches attach to DAG vertices through [`ModelCacheRegistry`], one slot
//! per polarity, set at most once.

use crate::dag::Bp;
use crate::roles::{RoleId, RoleMaster};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Outcome of a cache merge or lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// The merged models cannot clash
    Valid,
    /// The merge is provably contradictory
    Invalid,
    /// The summaries interact; nothing can be concluded
    Failed,
    /// Not enough information recorded
    Unknown,
}

/// Flat summary of a saturated completion graph
#[derive(Debug, Clone)]
pub struct ModelCache {
    state: CacheState,
    /// Root label concepts, polarity in the pointer sign
    concepts: BTreeSet<Bp>,
    /// Roles on edges at the root, closed under super-roles
    existing_roles: BTreeSet<RoleId>,
    /// Roles constrained by universal or at-most entries on the root
    constrained_roles: BTreeSet<RoleId>,
    /// Functional roles touched at the root
    functional_roles: BTreeSet<RoleId>,
    /// No successor structure was recorded
    shallow: bool,
}

impl ModelCache {
    /// Cache for an unsatisfiable vertex
    pub fn invalid() -> Self {
        ModelCache {
            state: CacheState::Invalid,
            concepts: BTreeSet::new(),
            existing_roles: BTreeSet::new(),
            constrained_roles: BTreeSet::new(),
            functional_roles: BTreeSet::new(),
            shallow: false,
        }
    }

    /// Empty valid cache, the accumulator seed for node caching
    pub fn empty() -> Self {
        ModelCache {
            state: CacheState::Valid,
            concepts: BTreeSet::new(),
            existing_roles: BTreeSet::new(),
            constrained_roles: BTreeSet::new(),
            functional_roles: BTreeSet::new(),
            shallow: true,
        }
    }

    pub(crate) fn builder() -> ModelCacheBuilder {
        ModelCacheBuilder {
            cache: ModelCache::empty(),
        }
    }

    /// Summary of the single arc connecting a node to its parent
    pub fn from_parent_edge(role: RoleId, roles: &RoleMaster) -> Self {
        let mut cache = ModelCache::empty();
        // seen from the node, the parent sits across the inverse role
        cache
            .existing_roles
            .extend(roles.ancestors(role.inverse()));
        cache.shallow = false;
        cache
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn is_shallow(&self) -> bool {
        self.shallow
    }

    /// Merge `other` into this cache and return the combined state
    pub fn merge(&mut self, other: &ModelCache) -> CacheState {
        if self.state == CacheState::Invalid || other.state == CacheState::Invalid {
            self.state = CacheState::Invalid;
            return self.state;
        }
        if matches!(self.state, CacheState::Failed | CacheState::Unknown)
            || matches!(other.state, CacheState::Failed | CacheState::Unknown)
        {
            self.state = CacheState::Failed;
            return self.state;
        }

        // direct contradiction between root labels
        if self
            .concepts
            .iter()
            .any(|c| other.concepts.contains(&c.inverse()))
        {
            self.state = CacheState::Invalid;
            return self.state;
        }

        // a successor on one side meeting a universal/at-most constraint or
        // a functional role on the other cannot be ruled clash-free
        let interacts = |a: &ModelCache, b: &ModelCache| {
            a.existing_roles
                .iter()
                .any(|r| b.constrained_roles.contains(r) || b.functional_roles.contains(r))
        };
        if interacts(self, other) || interacts(other, self) {
            self.state = CacheState::Failed;
            return self.state;
        }

        self.concepts.extend(other.concepts.iter().copied());
        self.existing_roles
            .extend(other.existing_roles.iter().copied());
        self.constrained_roles
            .extend(other.constrained_roles.iter().copied());
        self.functional_roles
            .extend(other.functional_roles.iter().copied());
        self.shallow &= other.shallow;
        self.state
    }
}

/// Incremental construction of a cache from a saturated graph's root
pub(crate) struct ModelCacheBuilder {
    cache: ModelCache,
}

impl ModelCacheBuilder {
    pub fn add_concept(&mut self, bp: Bp) {
        self.cache.concepts.insert(bp);
    }

    pub fn add_existing_role(&mut self, role: RoleId, roles: &RoleMaster) {
        self.cache.existing_roles.extend(roles.ancestors(role));
        if roles.is_functional(role) {
            self.cache.functional_roles.insert(role);
        }
        self.cache.shallow = false;
    }

    pub fn add_constrained_role(&mut self, role: RoleId) {
        self.cache.constrained_roles.insert(role);
    }

    pub fn mark_deep(&mut self) {
        self.cache.shallow = false;
    }

    pub fn finish(self) -> ModelCache {
        self.cache
    }
}

/// Per-vertex, per-polarity cache slots for the whole DAG.
///
/// Slots are one-time-set: the first cache stored for a `(vertex, polarity)`
/// pair wins and later attempts are ignored with a warning, so published
/// results never change underneath a reader.
#[derive(Debug, Default)]
pub struct ModelCacheRegistry {
    slots: Vec<[Option<Arc<ModelCache>>; 2]>,
}

impl ModelCacheRegistry {
    pub fn new() -> Self {
        ModelCacheRegistry::default()
    }

    fn slot_index(bp: Bp) -> usize {
        usize::from(!bp.is_positive())
    }

    fn ensure(&mut self, index: usize) {
        if self.slots.len() <= index {
            self.slots.resize(index + 1, [None, None]);
        }
    }

    pub fn get(&self, bp: Bp) -> Option<&Arc<ModelCache>> {
        self.slots
            .get(bp.index())
            .and_then(|pair| pair[Self::slot_index(bp)].as_ref())
    }

    pub fn set(&mut self, bp: Bp, cache: ModelCache) -> Arc<ModelCache> {
        self.ensure(bp.index());
        let slot = &mut self.slots[bp.index()][Self::slot_index(bp)];
        match slot {
            Some(existing) => {
                log::warn!("model cache for {bp} already set; keeping the first");
                Arc::clone(existing)
            }
            None => {
                let arc = Arc::new(cache);
                *slot = Some(Arc::clone(&arc));
                arc
            }
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contradicting_labels_merge_invalid() {
        let a_bp = Bp::TOP; // stand-in pointers; only identity matters here
        let mut a = ModelCache::builder();
        a.add_concept(a_bp);
        let mut b = ModelCache::builder();
        b.add_concept(a_bp.inverse());

        let mut left = a.finish();
        assert_eq!(left.merge(&b.finish()), CacheState::Invalid);
    }

    #[test]
    fn role_interaction_is_inconclusive() {
        let mut rm = RoleMaster::new();
        let r = rm.add_role("r", false).unwrap();
        rm.finalize().unwrap();

        let mut a = ModelCache::builder();
        a.add_existing_role(r, &rm);
        let mut b = ModelCache::builder();
        b.add_constrained_role(r);
        b.mark_deep();

        let mut left = a.finish();
        assert_eq!(left.merge(&b.finish()), CacheState::Failed);
    }

    #[test]
    fn disjoint_summaries_merge_valid() {
        let mut rm = RoleMaster::new();
        let r = rm.add_role("r", false).unwrap();
        let s = rm.add_role("s", false).unwrap();
        rm.finalize().unwrap();

        let mut a = ModelCache::builder();
        a.add_existing_role(r, &rm);
        let mut b = ModelCache::builder();
        b.add_constrained_role(s);
        b.mark_deep();

        let mut left = a.finish();
        assert_eq!(left.merge(&b.finish()), CacheState::Valid);
    }

    #[test]
    fn registry_slots_are_one_time_set() {
        let mut reg = ModelCacheRegistry::new();
        let bp = Bp::TOP;
        reg.set(bp, ModelCache::empty());
        let first_state = reg.get(bp).map(|c| c.state());
        reg.set(bp, ModelCache::invalid());
        assert_eq!(reg.get(bp).map(|c| c.state()), first_state);
    }

    #[test]
    fn polarities_have_separate_slots() {
        let mut reg = ModelCacheRegistry::new();
        reg.set(Bp::TOP, ModelCache::empty());
        assert!(reg.get(Bp::TOP).is_some());
        assert!(reg.get(Bp::BOTTOM).is_none());
    }
}
