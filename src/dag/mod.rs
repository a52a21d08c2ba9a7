//! Concept DAG
//!
//! Internalised concept expressions live in a single append-only store of
//! vertices addressed by bipolar pointers: a signed index whose sign encodes
//! negation, so `¬C` is the same vertex with the opposite sign and no vertex
//! is ever stored for a negation. Structural vertices (`And`, `Forall`,
//! `AtMost`, data leaves) are hash-consed, so syntactically equal
//! sub-expressions share one pointer.
//!
//! `TOP` is vertex 0 seen positively; `BOTTOM` is the same vertex negated.

use crate::datatypes::{DataTypeKind, DataValue, Facet};
use crate::roles::{RoleId, RoleMaster};
use std::collections::HashMap;
use std::fmt;

/// Bipolar pointer: signed reference to a DAG vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bp(i32);

impl Bp {
    /// The sentinel for "no concept"
    pub const INVALID: Bp = Bp(0);
    /// ⊤, the universal concept
    pub const TOP: Bp = Bp(1);
    /// ⊥, the empty concept (⊤ negated)
    pub const BOTTOM: Bp = Bp(-1);

    /// Negation: flips the polarity
    pub fn inverse(self) -> Bp {
        Bp(-self.0)
    }

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Index of the referenced vertex
    pub fn index(self) -> usize {
        debug_assert!(self.is_valid());
        (self.0.unsigned_abs() as usize) - 1
    }

    fn from_index(index: usize, positive: bool) -> Bp {
        let raw = index as i32 + 1;
        Bp(if positive { raw } else { -raw })
    }
}

impl fmt::Display for Bp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A vertex of the concept DAG
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DagVertex {
    /// ⊤ (and, negated, ⊥)
    Top,
    /// A named concept; `primitive` distinguishes told-subsumption names
    /// from fully defined ones
    Concept {
        name: String,
        primitive: bool,
        definition: Bp,
    },
    /// A nominal: the concept denoting exactly one individual
    Singleton { name: String, definition: Bp },
    /// A primitive datatype
    DataType { kind: DataTypeKind },
    /// A concrete data value (a point interval)
    DataValue { value: DataValue },
    /// A facet restriction over a datatype
    DataExpr { facet: Facet },
    /// Conjunction; children are sorted and deduplicated.
    /// Negated, this is the disjunction of the negated children.
    And { children: Vec<Bp> },
    /// Conjunction collected from simple-rule heads; expanded like `And`
    /// but never stored in node labels
    Collection { children: Vec<Bp> },
    /// ∀R.C; negated, ∃R.¬C
    Forall { role: RoleId, concept: Bp },
    /// ≤ n R.C; negated, ≥ n+1 R.C
    AtMost { n: u32, role: RoleId, concept: Bp },
    /// ∃R.Self; negated, irreflexivity of R at the node
    SelfRef { role: RoleId },
    /// Projection of an R-filler onto role S under a guard concept
    Proj {
        role: RoleId,
        guard: Bp,
        proj_role: RoleId,
    },
}

impl DagVertex {
    /// Whether this vertex is a primitive name tag: negated references to
    /// these have no definition to unfold
    pub fn is_primitive_name(&self) -> bool {
        matches!(self, DagVertex::Concept { primitive: true, .. })
    }

    fn is_structural(&self) -> bool {
        !matches!(
            self,
            DagVertex::Top | DagVertex::Concept { .. } | DagVertex::Singleton { .. }
        )
    }
}

/// Append-only, hash-consed store of concept vertices
#[derive(Debug, Default)]
pub struct Dag {
    vertices: Vec<DagVertex>,
    /// Hash-consing index over structural vertices
    index: HashMap<DagVertex, usize>,
    /// `(role, concept) → ∀role.concept`, populated for transitive
    /// sub-roles when a universal restriction is internalised
    forall_index: HashMap<(RoleId, Bp), Bp>,
    /// `(n, role, concept) → ≤n role.concept`, populated with the tighter
    /// bounds the NN-rule may assert
    atmost_index: HashMap<(u32, RoleId, Bp), Bp>,
}

impl Dag {
    pub fn new() -> Self {
        let mut dag = Dag::default();
        dag.vertices.push(DagVertex::Top);
        dag
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        false // vertex 0 is always ⊤
    }

    pub fn get(&self, bp: Bp) -> &DagVertex {
        &self.vertices[bp.index()]
    }

    /// Add a vertex, reusing an existing equal structural vertex
    pub fn add(&mut self, vertex: DagVertex) -> Bp {
        if vertex.is_structural() {
            if let Some(&idx) = self.index.get(&vertex) {
                return Bp::from_index(idx, true);
            }
            let idx = self.vertices.len();
            self.index.insert(vertex.clone(), idx);
            self.vertices.push(vertex);
            Bp::from_index(idx, true)
        } else {
            // named vertices are unique per name by construction; the
            // registry above the DAG guarantees it
            let idx = self.vertices.len();
            self.vertices.push(vertex);
            Bp::from_index(idx, true)
        }
    }

    /// Register a named concept vertex; the definition is filled in later
    pub fn named_concept(&mut self, name: &str, primitive: bool) -> Bp {
        self.add(DagVertex::Concept {
            name: name.to_string(),
            primitive,
            definition: Bp::INVALID,
        })
    }

    /// Register a nominal vertex for an individual
    pub fn named_singleton(&mut self, name: &str) -> Bp {
        self.add(DagVertex::Singleton {
            name: name.to_string(),
            definition: Bp::INVALID,
        })
    }

    /// Attach (or extend) the definition of a named vertex
    pub fn set_definition(&mut self, bp: Bp, definition: Bp) {
        debug_assert!(bp.is_positive());
        match &mut self.vertices[bp.index()] {
            DagVertex::Concept { definition: slot, .. }
            | DagVertex::Singleton { definition: slot, .. } => *slot = definition,
            other => unreachable!("set_definition on non-named vertex {other:?}"),
        }
    }

    /// Demote or promote a named concept between primitive and defined
    pub fn set_primitive(&mut self, bp: Bp, value: bool) {
        debug_assert!(bp.is_positive());
        if let DagVertex::Concept { primitive, .. } = &mut self.vertices[bp.index()] {
            *primitive = value;
        }
    }

    pub fn definition(&self, bp: Bp) -> Bp {
        match self.get(bp) {
            DagVertex::Concept { definition, .. } | DagVertex::Singleton { definition, .. } => {
                *definition
            }
            _ => Bp::INVALID,
        }
    }

    /// Conjunction with sorted, deduplicated children and constant folding
    pub fn and(&mut self, children: Vec<Bp>) -> Bp {
        let mut flat: Vec<Bp> = Vec::with_capacity(children.len());
        for c in children {
            if c == Bp::TOP {
                continue;
            }
            if c == Bp::BOTTOM {
                return Bp::BOTTOM;
            }
            // flatten nested positive conjunctions
            if c.is_positive() {
                if let DagVertex::And { children: inner } = self.get(c) {
                    flat.extend(inner.clone());
                    continue;
                }
            }
            flat.push(c);
        }
        flat.sort_unstable();
        flat.dedup();
        // C ⊓ ¬C is ⊥
        if flat.iter().any(|&c| flat.contains(&c.inverse())) {
            return Bp::BOTTOM;
        }
        match flat.len() {
            0 => Bp::TOP,
            1 => flat[0],
            _ => self.add(DagVertex::And { children: flat }),
        }
    }

    /// Disjunction, encoded as a negated conjunction
    pub fn or(&mut self, children: Vec<Bp>) -> Bp {
        let negated = children.into_iter().map(Bp::inverse).collect();
        self.and(negated).inverse()
    }

    /// ∀role.concept. Also internalises `∀S.concept` for every transitive
    /// sub-role S of `role`, so the tableau can propagate universals through
    /// transitive edges without fresh DAG writes.
    pub fn forall(&mut self, role: RoleId, concept: Bp, roles: &RoleMaster) -> Bp {
        if concept == Bp::TOP {
            return Bp::TOP;
        }
        let bp = self.add(DagVertex::Forall { role, concept });
        self.forall_index.insert((role, concept), bp);
        for sub in roles.descendants(role) {
            if roles.role(sub).is_transitive() {
                let sub_bp = self.add(DagVertex::Forall {
                    role: sub,
                    concept,
                });
                self.forall_index.insert((sub, concept), sub_bp);
            }
        }
        bp
    }

    /// Look up a universal restriction internalised by [`Dag::forall`]
    pub fn existing_forall(&self, role: RoleId, concept: Bp) -> Option<Bp> {
        self.forall_index.get(&(role, concept)).copied()
    }

    /// ≤ n role.concept. The tighter bounds 1..n are internalised as well,
    /// since the NN-rule may assert any of them at reasoning time.
    pub fn atmost(&mut self, n: u32, role: RoleId, concept: Bp) -> Bp {
        for m in 1..n {
            let v = self.add(DagVertex::AtMost {
                n: m,
                role,
                concept,
            });
            self.atmost_index.insert((m, role, concept), v);
        }
        let bp = self.add(DagVertex::AtMost { n, role, concept });
        self.atmost_index.insert((n, role, concept), bp);
        bp
    }

    /// Look up an at-most restriction internalised by [`Dag::atmost`]
    pub fn existing_atmost(&self, n: u32, role: RoleId, concept: Bp) -> Option<Bp> {
        self.atmost_index.get(&(n, role, concept)).copied()
    }

    /// ≥ n role.concept, encoded as ¬(≤ n-1 role.concept)
    pub fn atleast(&mut self, n: u32, role: RoleId, concept: Bp) -> Bp {
        if n == 0 {
            return Bp::TOP;
        }
        self.atmost(n - 1, role, concept).inverse()
    }

    /// ∃role.concept, encoded as ¬∀role.¬concept
    pub fn exists(&mut self, role: RoleId, concept: Bp, roles: &RoleMaster) -> Bp {
        if concept == Bp::BOTTOM {
            // ∃R.⊥ is unsatisfiable
            return Bp::BOTTOM;
        }
        self.forall(role, concept.inverse(), roles).inverse()
    }

    /// Conjunction head collected from simple rules; expanded in place
    /// like `And` but never stored in node labels
    pub fn collection(&mut self, children: Vec<Bp>) -> Bp {
        match children.len() {
            0 => Bp::TOP,
            1 => children[0],
            _ => self.add(DagVertex::Collection { children }),
        }
    }

    pub fn data_type(&mut self, kind: DataTypeKind) -> Bp {
        self.add(DagVertex::DataType { kind })
    }

    pub fn data_value(&mut self, value: DataValue) -> Bp {
        self.add(DagVertex::DataValue { value })
    }

    pub fn data_expr(&mut self, facet: Facet) -> Bp {
        self.add(DagVertex::DataExpr { facet })
    }

    pub fn self_ref(&mut self, role: RoleId) -> Bp {
        self.add(DagVertex::SelfRef { role })
    }

    /// Human-readable name of a vertex, for diagnostics
    pub fn describe(&self, bp: Bp) -> String {
        let body = match self.get(bp) {
            DagVertex::Top => "TOP".to_string(),
            DagVertex::Concept { name, .. } | DagVertex::Singleton { name, .. } => name.clone(),
            DagVertex::DataType { kind } => format!("{kind}"),
            DagVertex::DataValue { value } => format!("{value}"),
            DagVertex::DataExpr { facet } => format!("{facet}"),
            DagVertex::And { children } => format!("and[{}]", children.len()),
            DagVertex::Collection { children } => format!("collection[{}]", children.len()),
            DagVertex::Forall { role, concept } => format!("forall({role},{concept})"),
            DagVertex::AtMost { n, role, concept } => format!("atmost({n},{role},{concept})"),
            DagVertex::SelfRef { role } => format!("self({role})"),
            DagVertex::Proj { role, proj_role, .. } => format!("proj({role},{proj_role})"),
        };
        if bp.is_positive() {
            body
        } else {
            format!("not({body})")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_and_bottom_are_one_vertex() {
        let dag = Dag::new();
        assert_eq!(Bp::TOP.inverse(), Bp::BOTTOM);
        assert_eq!(Bp::TOP.index(), Bp::BOTTOM.index());
        assert!(matches!(dag.get(Bp::TOP), DagVertex::Top));
    }

    #[test]
    fn structural_vertices_are_hash_consed() {
        let mut dag = Dag::new();
        let mut rm = RoleMaster::new();
        let r = rm.add_role("r", false).unwrap();
        rm.finalize().unwrap();
        let a = dag.named_concept("A", true);
        let f1 = dag.forall(r, a, &rm);
        let f2 = dag.forall(r, a, &rm);
        assert_eq!(f1, f2);
        let len = dag.len();
        dag.forall(r, a, &rm);
        assert_eq!(dag.len(), len);
    }

    #[test]
    fn and_children_sorted_and_deduplicated() {
        let mut dag = Dag::new();
        let a = dag.named_concept("A", true);
        let b = dag.named_concept("B", true);
        let ab = dag.and(vec![b, a, b]);
        match dag.get(ab) {
            DagVertex::And { children } => {
                assert_eq!(children.as_slice(), &[a, b]);
            }
            other => unreachable!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn contradictory_conjunction_folds_to_bottom() {
        let mut dag = Dag::new();
        let a = dag.named_concept("A", true);
        assert_eq!(dag.and(vec![a, a.inverse()]), Bp::BOTTOM);
    }

    #[test]
    fn empty_and_single_conjunctions_fold() {
        let mut dag = Dag::new();
        let a = dag.named_concept("A", true);
        assert_eq!(dag.and(vec![]), Bp::TOP);
        assert_eq!(dag.and(vec![a, Bp::TOP]), a);
    }

    #[test]
    fn atleast_is_negated_atmost() {
        let mut dag = Dag::new();
        let mut rm = RoleMaster::new();
        let r = rm.add_role("r", false).unwrap();
        rm.finalize().unwrap();
        let ge3 = dag.atleast(3, r, Bp::TOP);
        assert!(!ge3.is_positive());
        match dag.get(ge3) {
            DagVertex::AtMost { n, .. } => assert_eq!(*n, 2),
            other => unreachable!("expected AtMost, got {other:?}"),
        }
    }

    #[test]
    fn transitive_subroles_get_forall_entries() {
        let mut dag = Dag::new();
        let mut rm = RoleMaster::new();
        let r = rm.add_role("r", false).unwrap();
        let t = rm.add_role("t", false).unwrap();
        rm.set_transitive(t);
        rm.add_subrole(t, r).unwrap();
        rm.finalize().unwrap();
        let a = dag.named_concept("A", true);
        dag.forall(r, a, &rm);
        assert!(dag.existing_forall(t, a).is_some());
    }
}
