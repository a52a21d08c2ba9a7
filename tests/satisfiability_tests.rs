//! Satisfiability over cyclic definitions, cardinalities, and disjunctions.

use tableaux::{Axiom, ConceptExpr, Reasoner};

fn inclusion(sub: &str, sup: ConceptExpr) -> Axiom {
    Axiom::ConceptInclusion {
        sub: ConceptExpr::name(sub),
        sup,
    }
}

#[test]
fn bottom_unsat_and_top_matches_consistency() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(inclusion("A", ConceptExpr::name("B")))
        .unwrap();
    reasoner.preprocess().unwrap();

    assert!(!reasoner.is_satisfiable(&ConceptExpr::Bottom).unwrap());
    let consistent = reasoner.is_consistent().unwrap();
    assert_eq!(reasoner.is_satisfiable(&ConceptExpr::Top).unwrap(), consistent);
    assert!(consistent);
}

#[test]
fn cyclic_definition_terminates_through_blocking() {
    // A = ∃R.A with transitive R is satisfiable; adding ∀R.⊥ kills it
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::ConceptEquivalence {
            concepts: vec![
                ConceptExpr::name("A"),
                ConceptExpr::exists("r", ConceptExpr::name("A")),
            ],
        })
        .unwrap();
    reasoner
        .load_axiom(Axiom::TransitiveRole {
            role: tableaux::RoleExpr::name("r"),
        })
        .unwrap();
    reasoner
        .load_axiom(Axiom::ConceptEquivalence {
            concepts: vec![
                ConceptExpr::name("B"),
                ConceptExpr::forall("r", ConceptExpr::Bottom),
            ],
        })
        .unwrap();
    reasoner.preprocess().unwrap();

    assert!(reasoner.is_satisfiable(&ConceptExpr::name("A")).unwrap());
    assert!(!reasoner
        .is_satisfiable(&ConceptExpr::and(vec![
            ConceptExpr::name("A"),
            ConceptExpr::name("B"),
        ]))
        .unwrap());
}

#[test]
fn primitive_cycle_is_blocked_too() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(inclusion(
            "Node",
            ConceptExpr::exists("next", ConceptExpr::name("Node")),
        ))
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(reasoner.is_satisfiable(&ConceptExpr::name("Node")).unwrap());
}

#[test]
fn conflicting_cardinalities_are_unsatisfiable() {
    // ≥3 R.⊤ against ≤2 R.⊤
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::at_least(3, "r", ConceptExpr::Top),
        ))
        .unwrap();
    reasoner
        .load_axiom(inclusion("A", ConceptExpr::at_most(2, "r", ConceptExpr::Top)))
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(!reasoner.is_satisfiable(&ConceptExpr::name("A")).unwrap());
}

#[test]
fn merge_attempts_fail_on_distinct_fillers() {
    // two told-distinct B-fillers against an at-most-one bound
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::and(vec![
                ConceptExpr::at_least(2, "r", ConceptExpr::name("B")),
                ConceptExpr::at_most(1, "r", ConceptExpr::Top),
            ]),
        ))
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(!reasoner.is_satisfiable(&ConceptExpr::name("A")).unwrap());
}

#[test]
fn compatible_cardinalities_are_satisfiable() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::and(vec![
                ConceptExpr::at_least(2, "r", ConceptExpr::Top),
                ConceptExpr::at_most(3, "r", ConceptExpr::Top),
            ]),
        ))
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(reasoner.is_satisfiable(&ConceptExpr::name("A")).unwrap());
}

#[test]
fn disjunction_backtracks_to_the_shared_consequence() {
    // A ⊑ B ⊔ C, both branches lead to D
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::or(vec![ConceptExpr::name("B"), ConceptExpr::name("C")]),
        ))
        .unwrap();
    reasoner
        .load_axiom(inclusion("B", ConceptExpr::name("D")))
        .unwrap();
    reasoner
        .load_axiom(inclusion("C", ConceptExpr::name("D")))
        .unwrap();
    reasoner.preprocess().unwrap();

    assert!(reasoner
        .is_subsumed_by(&ConceptExpr::name("A"), &ConceptExpr::name("D"))
        .unwrap());
    assert!(reasoner.is_satisfiable(&ConceptExpr::name("A")).unwrap());
}

#[test]
fn disjunction_works_without_semantic_branching() {
    let mut config = tableaux::Config::default();
    config.reasoning.use_semantic_branching = false;
    config.reasoning.use_backjumping = false;
    let mut reasoner = Reasoner::with_config(config);
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::or(vec![ConceptExpr::name("B"), ConceptExpr::name("C")]),
        ))
        .unwrap();
    reasoner
        .load_axiom(inclusion("B", ConceptExpr::name("D")))
        .unwrap();
    reasoner
        .load_axiom(inclusion("C", ConceptExpr::name("D")))
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(reasoner
        .is_subsumed_by(&ConceptExpr::name("A"), &ConceptExpr::name("D"))
        .unwrap());
}

#[test]
fn inconsistent_kb_answers_by_convention() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::ConceptInclusion {
            sub: ConceptExpr::Top,
            sup: ConceptExpr::name("A"),
        })
        .unwrap();
    reasoner
        .load_axiom(Axiom::ConceptInclusion {
            sub: ConceptExpr::Top,
            sup: ConceptExpr::name("A").not(),
        })
        .unwrap();
    reasoner
        .load_axiom(inclusion("B", ConceptExpr::Top))
        .unwrap();
    reasoner.preprocess().unwrap();

    assert!(!reasoner.is_consistent().unwrap());
    // every satisfiability is false, every subsumption true
    assert!(!reasoner.is_satisfiable(&ConceptExpr::name("B")).unwrap());
    assert!(reasoner
        .is_subsumed_by(&ConceptExpr::name("B"), &ConceptExpr::Bottom)
        .unwrap());
}

#[test]
fn disjoint_concepts_cannot_meet() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::DisjointConcepts {
            concepts: vec![ConceptExpr::name("Even"), ConceptExpr::name("Odd")],
        })
        .unwrap();
    reasoner.preprocess().unwrap();

    assert!(reasoner
        .is_disjoint(&ConceptExpr::name("Even"), &ConceptExpr::name("Odd"))
        .unwrap());
    assert!(!reasoner
        .is_satisfiable(&ConceptExpr::and(vec![
            ConceptExpr::name("Even"),
            ConceptExpr::name("Odd"),
        ]))
        .unwrap());
    assert!(reasoner.is_satisfiable(&ConceptExpr::name("Even")).unwrap());
}
