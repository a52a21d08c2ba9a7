//! Interval reasoning over data roles through the full engine.

use tableaux::{Axiom, ConceptExpr, DataRange, DataValue, Reasoner};

fn inclusion(sub: &str, sup: ConceptExpr) -> Axiom {
    Axiom::ConceptInclusion {
        sub: ConceptExpr::name(sub),
        sup,
    }
}

fn data_role(name: &str) -> Axiom {
    Axiom::DataRole {
        role: name.to_string(),
    }
}

#[test]
fn conflicting_numeric_bounds_are_unsatisfiable() {
    // A ⊑ ∃age.int[>18] and A ⊑ ∀age.int[<10]
    let mut reasoner = Reasoner::new();
    reasoner.load_axiom(data_role("age")).unwrap();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::DataExists("age".to_string(), DataRange::greater_than(18.0)),
        ))
        .unwrap();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::DataForall("age".to_string(), DataRange::less_than(10.0)),
        ))
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(!reasoner.is_satisfiable(&ConceptExpr::name("A")).unwrap());
}

#[test]
fn touching_bounds_with_exclusion_clash() {
    // (age >= 5) against (age < 5)
    let mut reasoner = Reasoner::new();
    reasoner.load_axiom(data_role("age")).unwrap();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::DataExists("age".to_string(), DataRange::at_least(5.0)),
        ))
        .unwrap();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::DataForall("age".to_string(), DataRange::less_than(5.0)),
        ))
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(!reasoner.is_satisfiable(&ConceptExpr::name("A")).unwrap());
}

#[test]
fn overlapping_bounds_are_satisfiable() {
    let mut reasoner = Reasoner::new();
    reasoner.load_axiom(data_role("age")).unwrap();
    reasoner
        .load_axiom(inclusion(
            "Adult",
            ConceptExpr::DataExists("age".to_string(), DataRange::greater_than(18.0)),
        ))
        .unwrap();
    reasoner
        .load_axiom(inclusion(
            "Adult",
            ConceptExpr::DataForall("age".to_string(), DataRange::less_than(130.0)),
        ))
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(reasoner.is_satisfiable(&ConceptExpr::name("Adult")).unwrap());
}

#[test]
fn point_value_within_bounds_is_satisfiable() {
    let mut reasoner = Reasoner::new();
    reasoner.load_axiom(data_role("age")).unwrap();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::DataHasValue("age".to_string(), DataValue::Number(21.0)),
        ))
        .unwrap();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::DataForall("age".to_string(), DataRange::greater_than(18.0)),
        ))
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(reasoner.is_satisfiable(&ConceptExpr::name("A")).unwrap());
}

#[test]
fn excluded_point_value_clashes() {
    // flag must be true and must not be true
    let mut reasoner = Reasoner::new();
    reasoner.load_axiom(data_role("flag")).unwrap();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::DataHasValue("flag".to_string(), DataValue::Boolean(true)),
        ))
        .unwrap();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::DataForall(
                "flag".to_string(),
                DataRange::Not(Box::new(DataRange::Value(DataValue::Boolean(true)))),
            ),
        ))
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(!reasoner.is_satisfiable(&ConceptExpr::name("A")).unwrap());
}

#[test]
fn type_mismatch_between_string_and_number() {
    let mut reasoner = Reasoner::new();
    reasoner.load_axiom(data_role("id")).unwrap();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::DataHasValue("id".to_string(), DataValue::String("x1".to_string())),
        ))
        .unwrap();
    reasoner
        .load_axiom(inclusion(
            "A",
            ConceptExpr::DataForall(
                "id".to_string(),
                DataRange::Not(Box::new(DataRange::Type(tableaux::DataTypeKind::String))),
            ),
        ))
        .unwrap();
    reasoner.preprocess().unwrap();
    assert!(!reasoner.is_satisfiable(&ConceptExpr::name("A")).unwrap());
}
