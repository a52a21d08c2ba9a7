//! Subsumption and classification behaviour over small told hierarchies.

use tableaux::{Axiom, ConceptExpr, Reasoner, TOP_NAME};

fn inclusion(sub: &str, sup: &str) -> Axiom {
    Axiom::ConceptInclusion {
        sub: ConceptExpr::name(sub),
        sup: ConceptExpr::name(sup),
    }
}

fn chain_kb() -> Reasoner {
    let mut reasoner = Reasoner::new();
    reasoner.load_axiom(inclusion("A", "B")).unwrap();
    reasoner.load_axiom(inclusion("B", "C")).unwrap();
    reasoner.preprocess().unwrap();
    reasoner
}

#[test]
fn told_chain_subsumes_transitively() {
    let mut reasoner = chain_kb();
    let a = ConceptExpr::name("A");
    let c = ConceptExpr::name("C");
    assert!(reasoner.is_subsumed_by(&a, &c).unwrap());
    assert!(!reasoner.is_subsumed_by(&c, &a).unwrap());
}

#[test]
fn ancestors_collect_the_whole_chain() {
    let mut reasoner = chain_kb();
    let up: Vec<String> = reasoner
        .ancestors("A")
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert!(up.contains(&"B".to_string()));
    assert!(up.contains(&"C".to_string()));
    assert!(up.contains(&TOP_NAME.to_string()));
    assert!(!up.contains(&"A".to_string()));
}

#[test]
fn subsumption_agrees_with_negated_satisfiability() {
    // isSubsumedBy(C, D) == !isSatisfiable(C ⊓ ¬D)
    let mut reasoner = chain_kb();
    let pairs = [("A", "C"), ("C", "A"), ("A", "B"), ("B", "A")];
    for (sub, sup) in pairs {
        let subsumed = reasoner
            .is_subsumed_by(&ConceptExpr::name(sub), &ConceptExpr::name(sup))
            .unwrap();
        let sat = reasoner
            .is_satisfiable(&ConceptExpr::and(vec![
                ConceptExpr::name(sub),
                ConceptExpr::name(sup).not(),
            ]))
            .unwrap();
        assert_eq!(subsumed, !sat, "mismatch for {sub} vs {sup}");
    }
}

#[test]
fn classification_is_stable_across_runs() {
    let mut reasoner = chain_kb();
    let first = reasoner.parents("A").unwrap();
    let second = reasoner.parents("A").unwrap();
    assert_eq!(first, second);

    let down_first = reasoner.descendants("C").unwrap();
    let down_second = reasoner.descendants("C").unwrap();
    assert_eq!(down_first, down_second);
}

#[test]
fn taxonomy_order_is_antisymmetric_and_transitive() {
    let mut reasoner = chain_kb();
    let ancestors_a: Vec<String> = reasoner
        .ancestors("A")
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    let ancestors_b: Vec<String> = reasoner
        .ancestors("B")
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    // transitivity: everything above B is above A
    for name in &ancestors_b {
        assert!(ancestors_a.contains(name), "{name} missing above A");
    }
    // antisymmetry: A is not above C while C is above A
    let ancestors_c: Vec<String> = reasoner
        .ancestors("C")
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert!(!ancestors_c.contains(&"A".to_string()));
}

#[test]
fn equivalence_merges_into_one_vertex() {
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::ConceptEquivalence {
            concepts: vec![ConceptExpr::name("Human"), ConceptExpr::name("Person")],
        })
        .unwrap();
    reasoner.load_axiom(inclusion("Human", "Animal")).unwrap();
    reasoner.preprocess().unwrap();

    let eq = reasoner.equivalents("Person").unwrap();
    assert!(eq.contains(&"Human".to_string()));
    assert!(eq.contains(&"Person".to_string()));
    assert!(reasoner
        .is_subsumed_by(&ConceptExpr::name("Person"), &ConceptExpr::name("Animal"))
        .unwrap());
}

#[test]
fn structurally_equal_definitions_share_a_vertex() {
    // P and Q are defined independently but with the same conjunction; the
    // equivalence is only discoverable during classification
    let mut reasoner = Reasoner::new();
    reasoner
        .load_axiom(Axiom::ConceptEquivalence {
            concepts: vec![
                ConceptExpr::name("P"),
                ConceptExpr::and(vec![ConceptExpr::name("A"), ConceptExpr::name("B")]),
            ],
        })
        .unwrap();
    reasoner
        .load_axiom(Axiom::ConceptEquivalence {
            concepts: vec![
                ConceptExpr::name("Q"),
                ConceptExpr::and(vec![ConceptExpr::name("A"), ConceptExpr::name("B")]),
            ],
        })
        .unwrap();
    reasoner.preprocess().unwrap();

    assert!(reasoner
        .is_subsumed_by(&ConceptExpr::name("P"), &ConceptExpr::name("Q"))
        .unwrap());
    assert!(reasoner
        .is_subsumed_by(&ConceptExpr::name("Q"), &ConceptExpr::name("P"))
        .unwrap());

    // one taxonomy vertex holds both names
    let eq = reasoner.equivalents("Q").unwrap();
    assert!(eq.contains(&"P".to_string()));
    assert!(eq.contains(&"Q".to_string()));
    assert_eq!(reasoner.parents("P").unwrap(), reasoner.parents("Q").unwrap());
}

#[test]
fn defined_concept_sits_under_its_conjuncts() {
    let mut reasoner = Reasoner::new();
    reasoner.load_axiom(inclusion("Woman", "Person")).unwrap();
    reasoner.load_axiom(inclusion("Parent", "Person")).unwrap();
    reasoner
        .load_axiom(Axiom::ConceptEquivalence {
            concepts: vec![
                ConceptExpr::name("Mother"),
                ConceptExpr::and(vec![ConceptExpr::name("Woman"), ConceptExpr::name("Parent")]),
            ],
        })
        .unwrap();
    reasoner.preprocess().unwrap();

    let parents: Vec<String> = reasoner
        .parents("Mother")
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert!(parents.contains(&"Woman".to_string()));
    assert!(parents.contains(&"Parent".to_string()));
    assert!(!parents.contains(&"Person".to_string()), "redundant parent kept");
}

#[test]
fn snapshot_is_versioned_and_round_trips() {
    let mut reasoner = chain_kb();
    reasoner.classify().unwrap();
    let snapshot = reasoner.taxonomy_snapshot().unwrap();
    assert_eq!(snapshot.version, tableaux::taxonomy::SNAPSHOT_VERSION);

    let json = serde_json::to_string(&snapshot).unwrap();
    let back: tableaux::TaxonomySnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back.vertices.len(), snapshot.vertices.len());
    assert!(json.contains("\"version\""));
}
