//! Axioms
//!
//! The language-neutral loading surface: every statement a front-end can
//! assert about concepts, roles, and individuals. Axioms accumulate in the
//! knowledge base and are normalised together during preprocessing.

use crate::expr::{ConceptExpr, DataRange, RoleExpr};

/// One loadable statement
#[derive(Debug, Clone)]
pub enum Axiom {
    /// C ⊑ D
    ConceptInclusion {
        sub: ConceptExpr,
        sup: ConceptExpr,
    },
    /// C₁ = C₂ = …
    ConceptEquivalence { concepts: Vec<ConceptExpr> },
    /// Pairwise disjoint concepts
    DisjointConcepts { concepts: Vec<ConceptExpr> },

    /// R ⊑ S
    RoleInclusion { sub: RoleExpr, sup: RoleExpr },
    /// R₁ ∘ … ∘ Rₙ ⊑ S
    RoleComposition {
        chain: Vec<RoleExpr>,
        sup: RoleExpr,
    },
    /// R₁ = R₂ = …
    RoleEquivalence { roles: Vec<RoleExpr> },
    /// Pairwise disjoint roles
    DisjointRoles { roles: Vec<RoleExpr> },
    /// S = R⁻
    InverseRole { role: RoleExpr, inverse: RoleExpr },
    FunctionalRole { role: RoleExpr },
    TransitiveRole { role: RoleExpr },
    ReflexiveRole { role: RoleExpr },
    IrreflexiveRole { role: RoleExpr },
    SymmetricRole { role: RoleExpr },
    /// Domain(R) ⊑ C
    RoleDomain {
        role: RoleExpr,
        domain: ConceptExpr,
    },
    /// Range(R) ⊑ C
    RoleRange {
        role: RoleExpr,
        range: ConceptExpr,
    },
    /// Range of a data role as a data range
    DataRoleRange { role: String, range: DataRange },
    /// Declare a data role (object roles are declared by use)
    DataRole { role: String },

    /// Declare an individual
    Individual { name: String },
    /// a : C
    ClassAssertion {
        individual: String,
        concept: ConceptExpr,
    },
    /// (a, b) : R
    RoleAssertion {
        subject: String,
        role: RoleExpr,
        object: String,
    },
    /// (a, b) : ¬R
    NegativeRoleAssertion {
        subject: String,
        role: RoleExpr,
        object: String,
    },
    SameIndividuals { individuals: Vec<String> },
    DifferentIndividuals { individuals: Vec<String> },

    /// Reactive fairness constraint: every infinite path must satisfy the
    /// concept infinitely often
    FairnessConstraint { concept: ConceptExpr },
}
