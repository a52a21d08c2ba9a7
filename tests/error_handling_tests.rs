//! Error taxonomy at the reasoning façade.

use tableaux::{Axiom, ConceptExpr, Reasoner, ReasoningError, RoleExpr};

#[test]
fn role_inclusion_cycle_is_fatal() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::RoleInclusion {
            sub: RoleExpr::name("r"),
            sup: RoleExpr::name("s"),
        })
        .unwrap();
    reasoner
        .load_axiom(Axiom::RoleInclusion {
            sub: RoleExpr::name("s"),
            sup: RoleExpr::name("r"),
        })
        .unwrap();
    assert!(matches!(
        reasoner.preprocess(),
        Err(ReasoningError::CycleInRoleInclusion { .. })
    ));
}

#[test]
fn axioms_are_rejected_after_preprocessing() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::ConceptInclusion {
            sub: ConceptExpr::name("A"),
            sup: ConceptExpr::name("B"),
        })
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(matches!(
        reasoner.load_axiom(Axiom::ConceptInclusion {
            sub: ConceptExpr::name("C"),
            sup: ConceptExpr::name("D"),
        }),
        Err(ReasoningError::KbLocked)
    ));
}

#[test]
fn unregistered_names_are_rejected_once_locked() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::ConceptInclusion {
            sub: ConceptExpr::name("A"),
            sup: ConceptExpr::name("B"),
        })
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(matches!(
        reasoner.is_satisfiable(&ConceptExpr::name("Ghost")),
        Err(ReasoningError::MalformedInput { .. })
    ));
}

#[test]
fn cardinality_over_a_non_simple_role_fails_fast() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::TransitiveRole {
            role: RoleExpr::name("part"),
        })
        .unwrap();
    reasoner
        .load_axiom(Axiom::ConceptInclusion {
            sub: ConceptExpr::name("A"),
            sup: ConceptExpr::at_most(1, "part", ConceptExpr::Top),
        })
        .unwrap();
    assert!(matches!(
        reasoner.preprocess(),
        Err(ReasoningError::MalformedInput { .. })
    ));
}

#[test]
fn symbol_cannot_be_both_role_and_concept() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::ConceptInclusion {
            sub: ConceptExpr::name("mixed"),
            sup: ConceptExpr::exists("mixed", ConceptExpr::Top),
        })
        .unwrap();
    assert!(matches!(
        reasoner.preprocess(),
        Err(ReasoningError::MalformedInput { .. })
    ));
}

#[test]
fn classification_of_an_inconsistent_kb_is_refused() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::ClassAssertion {
            individual: "a".to_string(),
            concept: ConceptExpr::name("C"),
        })
        .unwrap();
    reasoner
        .load_axiom(Axiom::ClassAssertion {
            individual: "a".to_string(),
            concept: ConceptExpr::name("C").not(),
        })
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(matches!(
        reasoner.classify(),
        Err(ReasoningError::InconsistentKb)
    ));
}

#[test]
fn errors_render_readable_messages() {
    let err = ReasoningError::CycleInRoleInclusion {
        role: "part".to_string(),
    };
    assert!(err.to_string().contains("part"));
    let err = ReasoningError::Timeout {
        budget_ms: 100,
        elapsed_ms: 150,
    };
    assert!(err.to_string().contains("100"));
}
