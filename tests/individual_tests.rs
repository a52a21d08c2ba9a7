//! ABox reasoning: nominals, functional merging, instance retrieval.

use tableaux::{Axiom, ConceptExpr, Reasoner, RoleExpr};

fn assertion(individual: &str, concept: ConceptExpr) -> Axiom {
    Axiom::ClassAssertion {
        individual: individual.to_string(),
        concept,
    }
}

fn related(s: &str, r: &str, o: &str) -> Axiom {
    Axiom::RoleAssertion {
        subject: s.to_string(),
        role: RoleExpr::name(r),
        object: o.to_string(),
    }
}

#[test]
fn functional_role_identifies_fillers() {
    // r functional, r(a,b), r(a,c) forces b = c
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::FunctionalRole {
            role: RoleExpr::name("r"),
        })
        .unwrap();
    reasoner.load_axiom(related("a", "r", "b")).unwrap();
    reasoner.load_axiom(related("a", "r", "c")).unwrap();
    reasoner.preprocess().unwrap();

    assert!(reasoner.is_consistent().unwrap());
    assert!(reasoner.is_same_individuals("b", "c").unwrap());
    assert!(!reasoner.is_same_individuals("a", "b").unwrap());
}

#[test]
fn contradictory_assertions_are_inconsistent() {
    // {a} ⊑ C and {a} ⊑ ¬C
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(assertion("a", ConceptExpr::name("C")))
        .unwrap();
    reasoner
        .load_axiom(assertion("a", ConceptExpr::name("C").not()))
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(!reasoner.is_consistent().unwrap());
}

#[test]
fn instance_checking_uses_the_tbox() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::ConceptInclusion {
            sub: ConceptExpr::name("Cat"),
            sup: ConceptExpr::name("Animal"),
        })
        .unwrap();
    reasoner
        .load_axiom(Axiom::ConceptInclusion {
            sub: ConceptExpr::name("Plant"),
            sup: ConceptExpr::Top,
        })
        .unwrap();
    reasoner
        .load_axiom(assertion("felix", ConceptExpr::name("Cat")))
        .unwrap();
    reasoner.preprocess().unwrap();

    assert!(reasoner.is_instance("felix", &ConceptExpr::name("Cat")).unwrap());
    assert!(reasoner
        .is_instance("felix", &ConceptExpr::name("Animal"))
        .unwrap());
    assert!(!reasoner
        .is_instance("felix", &ConceptExpr::name("Plant"))
        .unwrap());

    let cats = reasoner.instances(&ConceptExpr::name("Animal")).unwrap();
    assert_eq!(cats, vec!["felix".to_string()]);

    let types: Vec<String> = reasoner.types("felix").unwrap().into_iter().flatten().collect();
    assert!(types.contains(&"Cat".to_string()));
    assert!(types.contains(&"Animal".to_string()));
    assert!(!types.contains(&"Plant".to_string()));
}

#[test]
fn told_role_links_are_navigable() {
    let mut reasoner = Reasoner::new();
    reasoner.load_axiom(related("a", "knows", "b")).unwrap();
    reasoner.load_axiom(related("a", "knows", "c")).unwrap();
    reasoner.preprocess().unwrap();

    let fillers = reasoner.role_fillers("a", "knows").unwrap();
    assert!(fillers.contains(&"b".to_string()));
    assert!(fillers.contains(&"c".to_string()));

    let pairs = reasoner.related_individuals("knows").unwrap();
    assert!(pairs.contains(&("a".to_string(), "b".to_string())));
}

#[test]
fn same_and_different_conflict() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::SameIndividuals {
            individuals: vec!["a".to_string(), "b".to_string()],
        })
        .unwrap();
    reasoner
        .load_axiom(Axiom::DifferentIndividuals {
            individuals: vec!["a".to_string(), "b".to_string()],
        })
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(!reasoner.is_consistent().unwrap());
}

#[test]
fn negative_role_assertion_blocks_the_link() {
    let mut reasoner = Reasoner::new();
    reasoner.load_axiom(related("a", "r", "b")).unwrap();
    reasoner
        .load_axiom(Axiom::NegativeRoleAssertion {
            subject: "a".to_string(),
            role: RoleExpr::name("r"),
            object: "b".to_string(),
        })
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(!reasoner.is_consistent().unwrap());
}

#[test]
fn nominal_in_a_concept_expression() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(assertion("mars", ConceptExpr::name("Planet")))
        .unwrap();
    reasoner.preprocess().unwrap();

    // {mars} ⊓ Planet is satisfiable, {mars} ⊓ ¬Planet is not
    assert!(reasoner
        .is_satisfiable(&ConceptExpr::and(vec![
            ConceptExpr::one_of(&["mars"]),
            ConceptExpr::name("Planet"),
        ]))
        .unwrap());
    assert!(!reasoner
        .is_satisfiable(&ConceptExpr::and(vec![
            ConceptExpr::one_of(&["mars"]),
            ConceptExpr::name("Planet").not(),
        ]))
        .unwrap());
}
