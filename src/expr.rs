//! Concept and Data Expressions
//!
//! The value trees callers hand to the reasoner. No surface syntax is
//! parsed here: a front-end builds these directly. Internalisation into
//! the DAG happens during preprocessing.

use crate::datatypes::{DataTypeKind, DataValue, Facet};

/// A concept expression over named concepts, roles, and individuals
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConceptExpr {
    Top,
    Bottom,
    /// A named concept
    Name(String),
    Not(Box<ConceptExpr>),
    And(Vec<ConceptExpr>),
    Or(Vec<ConceptExpr>),
    /// ∃ role.filler
    Exists(String, Box<ConceptExpr>),
    /// ∀ role.filler
    Forall(String, Box<ConceptExpr>),
    /// ≥ n role.filler
    AtLeast(u32, String, Box<ConceptExpr>),
    /// ≤ n role.filler
    AtMost(u32, String, Box<ConceptExpr>),
    /// ∃ role.Self
    SelfRef(String),
    /// Nominal disjunction: `{a, b, …}`
    OneOf(Vec<String>),
    /// ∃ dataRole.range
    DataExists(String, DataRange),
    /// ∀ dataRole.range
    DataForall(String, DataRange),
    /// dataRole has the given concrete value
    DataHasValue(String, DataValue),
}

impl ConceptExpr {
    pub fn name(n: &str) -> Self {
        ConceptExpr::Name(n.to_string())
    }

    pub fn not(self) -> Self {
        match self {
            ConceptExpr::Not(inner) => *inner,
            ConceptExpr::Top => ConceptExpr::Bottom,
            ConceptExpr::Bottom => ConceptExpr::Top,
            other => ConceptExpr::Not(Box::new(other)),
        }
    }

    pub fn and(children: Vec<ConceptExpr>) -> Self {
        ConceptExpr::And(children)
    }

    pub fn or(children: Vec<ConceptExpr>) -> Self {
        ConceptExpr::Or(children)
    }

    pub fn exists(role: &str, filler: ConceptExpr) -> Self {
        ConceptExpr::Exists(role.to_string(), Box::new(filler))
    }

    pub fn forall(role: &str, filler: ConceptExpr) -> Self {
        ConceptExpr::Forall(role.to_string(), Box::new(filler))
    }

    pub fn at_least(n: u32, role: &str, filler: ConceptExpr) -> Self {
        ConceptExpr::AtLeast(n, role.to_string(), Box::new(filler))
    }

    pub fn at_most(n: u32, role: &str, filler: ConceptExpr) -> Self {
        ConceptExpr::AtMost(n, role.to_string(), Box::new(filler))
    }

    pub fn one_of(individuals: &[&str]) -> Self {
        ConceptExpr::OneOf(individuals.iter().map(|s| (*s).to_string()).collect())
    }

    /// Top-level conjunct names, the told-subsumer candidates
    pub fn conjunct_names(&self) -> Vec<&str> {
        match self {
            ConceptExpr::Name(n) => vec![n.as_str()],
            ConceptExpr::And(children) => {
                children.iter().flat_map(ConceptExpr::conjunct_names).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// A data range over the primitive datatypes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataRange {
    /// The whole primitive type
    Type(DataTypeKind),
    /// A single value
    Value(DataValue),
    Not(Box<DataRange>),
    And(Vec<DataRange>),
    /// A base type narrowed by facets, e.g. `int[> 18]`
    Restriction(DataTypeKind, Vec<Facet>),
}

impl DataRange {
    pub fn greater_than(v: f64) -> Self {
        DataRange::Restriction(
            DataTypeKind::Number,
            vec![Facet::MinExclusive(DataValue::Number(v))],
        )
    }

    pub fn less_than(v: f64) -> Self {
        DataRange::Restriction(
            DataTypeKind::Number,
            vec![Facet::MaxExclusive(DataValue::Number(v))],
        )
    }

    pub fn at_least(v: f64) -> Self {
        DataRange::Restriction(
            DataTypeKind::Number,
            vec![Facet::MinInclusive(DataValue::Number(v))],
        )
    }

    pub fn at_most(v: f64) -> Self {
        DataRange::Restriction(
            DataTypeKind::Number,
            vec![Facet::MaxInclusive(DataValue::Number(v))],
        )
    }
}

/// A role expression: a named role or the inverse of one
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleExpr {
    Name(String),
    Inverse(Box<RoleExpr>),
}

impl RoleExpr {
    pub fn name(n: &str) -> Self {
        RoleExpr::Name(n.to_string())
    }

    pub fn inverse(self) -> Self {
        match self {
            RoleExpr::Inverse(inner) => *inner,
            other => RoleExpr::Inverse(Box::new(other)),
        }
    }

    /// The underlying role name and whether the expression is inverted
    pub fn resolve(&self) -> (&str, bool) {
        match self {
            RoleExpr::Name(n) => (n.as_str(), false),
            RoleExpr::Inverse(inner) => {
                let (n, inv) = inner.resolve();
                (n, !inv)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_negation_cancels() {
        let a = ConceptExpr::name("A");
        assert_eq!(a.clone().not().not(), a);
    }

    #[test]
    fn conjunct_names_sees_through_nesting() {
        let e = ConceptExpr::and(vec![
            ConceptExpr::name("A"),
            ConceptExpr::and(vec![ConceptExpr::name("B"), ConceptExpr::exists("r", ConceptExpr::Top)]),
        ]);
        assert_eq!(e.conjunct_names(), vec!["A", "B"]);
    }

    #[test]
    fn role_inverse_resolves() {
        let r = RoleExpr::name("r").inverse();
        assert_eq!(r.resolve(), ("r", true));
        assert_eq!(r.inverse().resolve(), ("r", false));
    }
}
