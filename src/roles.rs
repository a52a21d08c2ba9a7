//! Role Hierarchy
//!
//! Registers object and data roles, canonicalises inverses (an inverse is the
//! same role with a negated id), closes the sub-role relation transitively,
//! and computes the derived `simple` flag. A role is simple iff it has no
//! transitive sub-role and appears in no composition; only simple roles may
//! be cardinality-restricted.
//!
//! Cycles through distinct role names in the inclusion graph are rejected
//! during [`RoleMaster::finalize`].

use crate::dag::Bp;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Signed role reference: the sign encodes direction, so `-id` is the
/// inverse of `id`. The magnitude minus one indexes the role table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleId(i32);

impl RoleId {
    pub fn inverse(self) -> RoleId {
        RoleId(-self.0)
    }

    pub fn is_inverse(self) -> bool {
        self.0 < 0
    }

    /// Index into the role table
    pub fn index(self) -> usize {
        (self.0.unsigned_abs() as usize) - 1
    }

    /// Direction slot: 0 for the forward role, 1 for its inverse
    fn dir(self) -> usize {
        usize::from(self.0 < 0)
    }

    fn forward(self) -> RoleId {
        RoleId(self.0.abs())
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-R{}", -self.0)
        } else {
            write!(f, "R{}", self.0)
        }
    }
}

/// Errors raised while building or finalising the role hierarchy
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoleError {
    #[error("cycle in role inclusion involving '{role}'")]
    CycleInRoleInclusion { role: String },

    #[error("role '{role}' used both as an object role and a data role")]
    MixedRoleKind { role: String },

    #[error("data role '{role}' cannot take part in '{construct}'")]
    DataRoleMisuse { role: String, construct: String },
}

/// One registered role (both directions share the record)
#[derive(Debug, Clone)]
pub struct Role {
    name: String,
    data: bool,
    transitive: bool,
    reflexive: bool,
    irreflexive: bool,
    symmetric: bool,
    /// Functional flag per direction: `[R, R⁻]`
    functional: [bool; 2],
    /// Universal role: relates every pair of elements
    top: bool,
    /// Empty role: relates nothing
    bottom: bool,
    /// Direct told super-roles of the forward direction
    parents: Vec<RoleId>,
    /// Computed super-roles per direction, including the role itself
    ancestors: [BTreeSet<RoleId>; 2],
    /// Composition chains `R1 ∘ … ∘ Rn ⊑ self`
    compositions: Vec<Vec<RoleId>>,
    /// Domain restrictions per direction; slot 1 is the range of the
    /// forward role
    domain: [Vec<Bp>; 2],
    simple: bool,
}

impl Role {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_data(&self) -> bool {
        self.data
    }

    pub fn is_transitive(&self) -> bool {
        self.transitive
    }

    pub fn is_reflexive(&self) -> bool {
        self.reflexive
    }

    pub fn is_irreflexive(&self) -> bool {
        self.irreflexive
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    pub fn is_simple(&self) -> bool {
        self.simple
    }

    pub fn is_top(&self) -> bool {
        self.top
    }

    pub fn is_bottom(&self) -> bool {
        self.bottom
    }
}

/// Registry of all roles with hierarchy closure
#[derive(Debug, Default)]
pub struct RoleMaster {
    roles: Vec<Role>,
    names: HashMap<String, RoleId>,
    /// Told-disjoint role pairs
    disjoint: Vec<(RoleId, RoleId)>,
    finalized: bool,
}

impl RoleMaster {
    pub fn new() -> Self {
        RoleMaster::default()
    }

    /// Register (or look up) a role by name
    pub fn add_role(&mut self, name: &str, data: bool) -> Result<RoleId, RoleError> {
        if let Some(&id) = self.names.get(name) {
            if self.roles[id.index()].data != data {
                return Err(RoleError::MixedRoleKind {
                    role: name.to_string(),
                });
            }
            return Ok(id);
        }
        let id = RoleId(self.roles.len() as i32 + 1);
        self.roles.push(Role {
            name: name.to_string(),
            data,
            transitive: false,
            reflexive: false,
            irreflexive: false,
            symmetric: false,
            top: false,
            bottom: false,
            functional: [false; 2],
            parents: Vec::new(),
            ancestors: [BTreeSet::new(), BTreeSet::new()],
            compositions: Vec::new(),
            domain: [Vec::new(), Vec::new()],
            simple: true,
        });
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Register the universal role sentinel: a super-role of everything
    pub fn add_universal_role(&mut self, name: &str) -> Result<RoleId, RoleError> {
        let id = self.add_role(name, false)?;
        self.roles[id.index()].top = true;
        Ok(id)
    }

    /// Register the empty role sentinel: a sub-role of everything
    pub fn add_empty_role(&mut self, name: &str) -> Result<RoleId, RoleError> {
        let id = self.add_role(name, false)?;
        self.roles[id.index()].bottom = true;
        Ok(id)
    }

    pub fn get(&self, name: &str) -> Option<RoleId> {
        self.names.get(name).copied()
    }

    pub fn role(&self, id: RoleId) -> &Role {
        &self.roles[id.index()]
    }

    pub fn name_of(&self, id: RoleId) -> String {
        let role = self.role(id);
        if id.is_inverse() {
            format!("inverse({})", role.name)
        } else {
            role.name.clone()
        }
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// All registered forward role ids
    pub fn all_roles(&self) -> impl Iterator<Item = RoleId> + '_ {
        (1..=self.roles.len() as i32).map(RoleId)
    }

    /// Record `sub ⊑ sup`; the mirrored inclusion of the inverses is implied
    pub fn add_subrole(&mut self, sub: RoleId, sup: RoleId) -> Result<(), RoleError> {
        if self.role(sub).data != self.role(sup).data {
            return Err(RoleError::MixedRoleKind {
                role: self.roles[sub.index()].name.clone(),
            });
        }
        // normalise so the record lives on the forward direction of sub
        let (sub, sup) = if sub.is_inverse() {
            (sub.inverse(), sup.inverse())
        } else {
            (sub, sup)
        };
        self.roles[sub.index()].parents.push(sup);
        Ok(())
    }

    /// Record a role inclusion `chain[0] ∘ … ∘ chain[n] ⊑ sup`
    pub fn add_composition(&mut self, chain: Vec<RoleId>, sup: RoleId) -> Result<(), RoleError> {
        if self.role(sup).data {
            return Err(RoleError::DataRoleMisuse {
                role: self.roles[sup.index()].name.clone(),
                construct: "role composition".to_string(),
            });
        }
        self.roles[sup.index()].compositions.push(chain);
        Ok(())
    }

    pub fn set_transitive(&mut self, id: RoleId) {
        self.roles[id.index()].transitive = true;
    }

    pub fn set_functional(&mut self, id: RoleId) {
        self.roles[id.index()].functional[id.dir()] = true;
    }

    pub fn set_reflexive(&mut self, id: RoleId) {
        self.roles[id.index()].reflexive = true;
    }

    pub fn set_irreflexive(&mut self, id: RoleId) {
        self.roles[id.index()].irreflexive = true;
    }

    pub fn set_symmetric(&mut self, id: RoleId) {
        self.roles[id.index()].symmetric = true;
    }

    pub fn set_disjoint(&mut self, a: RoleId, b: RoleId) {
        self.disjoint.push((a, b));
    }

    /// Whether two roles were told disjoint, sub-roles included
    pub fn are_disjoint(&self, a: RoleId, b: RoleId) -> bool {
        self.disjoint.iter().any(|&(x, y)| {
            (self.is_subrole(a, x) && self.is_subrole(b, y))
                || (self.is_subrole(a, y) && self.is_subrole(b, x))
        })
    }

    /// Add a domain restriction for `id`; `set_range(R, d)` is
    /// `set_domain(R⁻, d)`
    pub fn set_domain(&mut self, id: RoleId, d: Bp) {
        self.roles[id.index()].domain[id.dir()].push(d);
    }

    pub fn set_range(&mut self, id: RoleId, d: Bp) {
        self.set_domain(id.inverse(), d);
    }

    pub fn domain(&self, id: RoleId) -> &[Bp] {
        &self.roles[id.index()].domain[id.dir()]
    }

    pub fn range(&self, id: RoleId) -> &[Bp] {
        self.domain(id.inverse())
    }

    /// Whether `sub ⊑ sup` holds in the closed hierarchy
    pub fn is_subrole(&self, sub: RoleId, sup: RoleId) -> bool {
        debug_assert!(self.finalized, "role hierarchy not finalized");
        if sub == sup || self.roles[sup.index()].top || self.roles[sub.index()].bottom {
            return true;
        }
        self.roles[sub.index()].ancestors[sub.dir()].contains(&sup)
    }

    /// Computed super-roles of `id`, including `id` itself
    pub fn ancestors(&self, id: RoleId) -> impl Iterator<Item = RoleId> + '_ {
        self.roles[id.index()].ancestors[id.dir()].iter().copied()
    }

    /// Direct told super-roles of `id`
    pub fn parents(&self, id: RoleId) -> Vec<RoleId> {
        if id.is_inverse() {
            self.roles[id.index()]
                .parents
                .iter()
                .map(|p| p.inverse())
                .collect()
        } else {
            self.roles[id.index()].parents.clone()
        }
    }

    /// Roles strictly below `id` in the closed hierarchy
    pub fn descendants(&self, id: RoleId) -> Vec<RoleId> {
        let mut out = Vec::new();
        for idx in 0..self.roles.len() {
            for signed in [RoleId(idx as i32 + 1), RoleId(-(idx as i32 + 1))] {
                if signed != id && self.is_subrole(signed, id) {
                    out.push(signed);
                }
            }
        }
        out
    }

    /// Equivalent roles: mutual subsumers (synonym detection happens during
    /// preprocessing, so this is usually just `id` itself)
    pub fn equivalents(&self, id: RoleId) -> Vec<RoleId> {
        let mut out = vec![id];
        for other in self.ancestors(id) {
            if other != id && self.is_subrole(other, id) {
                out.push(other);
            }
        }
        out
    }

    /// A role is functional if it or any super-role carries the flag
    pub fn is_functional(&self, id: RoleId) -> bool {
        self.ancestors(id)
            .any(|a| self.roles[a.index()].functional[a.dir()])
    }

    /// Transitive roles `T` with `sub ⊑ T ⊑ sup`, for the universal-role
    /// propagation chain
    pub fn transitive_between(&self, sub: RoleId, sup: RoleId) -> Vec<RoleId> {
        self.ancestors(sub)
            .filter(|&t| self.roles[t.index()].transitive && self.is_subrole(t, sup))
            .collect()
    }

    /// All reflexive roles
    pub fn reflexive_roles(&self) -> Vec<RoleId> {
        self.all_roles()
            .filter(|&r| self.roles[r.index()].reflexive)
            .collect()
    }

    /// Close the hierarchy: reflexive-transitive ancestor sets, cycle
    /// detection, and the computed `simple` flag.
    pub fn finalize(&mut self) -> Result<(), RoleError> {
        // build the signed-id edge list; symmetric roles link to their own
        // inverse so closure handles both directions uniformly
        let n = self.roles.len();
        let mut edges: HashMap<RoleId, Vec<RoleId>> = HashMap::new();
        for idx in 0..n {
            let fwd = RoleId(idx as i32 + 1);
            for &sup in &self.roles[idx].parents {
                edges.entry(fwd).or_default().push(sup);
                edges.entry(fwd.inverse()).or_default().push(sup.inverse());
            }
            if self.roles[idx].symmetric {
                edges.entry(fwd).or_default().push(fwd.inverse());
                edges.entry(fwd.inverse()).or_default().push(fwd);
            }
        }

        // cycle check: any inclusion path through two distinct names is an
        // error; an R/R⁻ loop from symmetry is not
        for idx in 0..n {
            let start = RoleId(idx as i32 + 1);
            let mut stack = vec![start];
            let mut seen = BTreeSet::new();
            while let Some(r) = stack.pop() {
                for &next in edges.get(&r).map(Vec::as_slice).unwrap_or(&[]) {
                    if next.index() == start.index() && r.index() != start.index() {
                        return Err(RoleError::CycleInRoleInclusion {
                            role: self.roles[idx].name.clone(),
                        });
                    }
                    if seen.insert(next) {
                        stack.push(next);
                    }
                }
            }
        }

        // reflexive-transitive closure per signed id
        for idx in 0..n {
            for dir in 0..2 {
                let start = if dir == 0 {
                    RoleId(idx as i32 + 1)
                } else {
                    RoleId(-(idx as i32 + 1))
                };
                let mut closed: BTreeSet<RoleId> = BTreeSet::new();
                let mut stack = vec![start];
                while let Some(r) = stack.pop() {
                    if !closed.insert(r) {
                        continue;
                    }
                    if let Some(sups) = edges.get(&r) {
                        stack.extend(sups.iter().copied());
                    }
                }
                self.roles[idx].ancestors[dir] = closed;
            }
        }
        self.finalized = true;

        // simple = no transitive sub-role (self included) and no composition
        // anywhere below
        let ids: Vec<RoleId> = self.all_roles().collect();
        for &id in &ids {
            let mut simple = true;
            for sub in [id, id.inverse()]
                .into_iter()
                .chain(self.descendants(id).into_iter())
            {
                let role = &self.roles[sub.index()];
                if role.transitive || !role.compositions.is_empty() {
                    simple = false;
                    break;
                }
            }
            self.roles[id.index()].simple = simple;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_is_same_role_negated() {
        let mut rm = RoleMaster::new();
        let r = rm.add_role("hasPart", false).unwrap();
        assert_eq!(r.inverse().inverse(), r);
        assert_eq!(r.index(), r.inverse().index());
    }

    #[test]
    fn subrole_closure_is_transitive() {
        let mut rm = RoleMaster::new();
        let a = rm.add_role("a", false).unwrap();
        let b = rm.add_role("b", false).unwrap();
        let c = rm.add_role("c", false).unwrap();
        rm.add_subrole(a, b).unwrap();
        rm.add_subrole(b, c).unwrap();
        rm.finalize().unwrap();
        assert!(rm.is_subrole(a, c));
        assert!(rm.is_subrole(a.inverse(), c.inverse()));
        assert!(!rm.is_subrole(c, a));
    }

    #[test]
    fn inclusion_cycle_is_fatal() {
        let mut rm = RoleMaster::new();
        let a = rm.add_role("a", false).unwrap();
        let b = rm.add_role("b", false).unwrap();
        rm.add_subrole(a, b).unwrap();
        rm.add_subrole(b, a).unwrap();
        assert!(matches!(
            rm.finalize(),
            Err(RoleError::CycleInRoleInclusion { .. })
        ));
    }

    #[test]
    fn symmetric_loop_is_not_a_cycle() {
        let mut rm = RoleMaster::new();
        let r = rm.add_role("adjacentTo", false).unwrap();
        rm.set_symmetric(r);
        rm.finalize().unwrap();
        assert!(rm.is_subrole(r, r.inverse()));
    }

    #[test]
    fn transitive_subrole_breaks_simplicity() {
        let mut rm = RoleMaster::new();
        let part = rm.add_role("partOf", false).unwrap();
        let direct = rm.add_role("directPartOf", false).unwrap();
        let plain = rm.add_role("attachedTo", false).unwrap();
        rm.set_transitive(part);
        rm.add_subrole(direct, part).unwrap();
        rm.finalize().unwrap();
        assert!(!rm.role(part).is_simple());
        assert!(rm.role(direct).is_simple());
        assert!(rm.role(plain).is_simple());
    }

    #[test]
    fn functional_flag_inherits_downward() {
        let mut rm = RoleMaster::new();
        let f = rm.add_role("hasMother", false).unwrap();
        let sub = rm.add_role("hasBioMother", false).unwrap();
        rm.set_functional(f);
        rm.add_subrole(sub, f).unwrap();
        rm.finalize().unwrap();
        assert!(rm.is_functional(sub));
        assert!(!rm.is_functional(f.inverse()));
    }
}
