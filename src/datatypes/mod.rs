//! Datatype Reasoning
//!
//! Interval constraint propagation for data values. Every supported primitive
//! type keeps the tightest min/max bounds seen so far on a data node, each
//! bound paired with the dep-set that produced it. A clash is reported when a
//! type appears both positively and negatively, when the bounds cross, or
//! when the interval collapses onto an excluded point value.
//!
//! The canonical numeric type is `Number` (f64-backed); integer restrictions
//! are expressed as facets over it.

use crate::dag::DagVertex;
use crate::deps::DepSet;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Primitive datatypes understood by the interval reasoner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataTypeKind {
    Number,
    String,
    Boolean,
}

impl fmt::Display for DataTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataTypeKind::Number => write!(f, "number"),
            DataTypeKind::String => write!(f, "string"),
            DataTypeKind::Boolean => write!(f, "boolean"),
        }
    }
}

/// A concrete data value
///
/// Values of different kinds are ordered by kind rank first so that the
/// ordering is total; the reasoner never compares across kinds except to
/// detect a type mismatch.
#[derive(Debug, Clone)]
pub enum DataValue {
    Number(f64),
    String(String),
    Boolean(bool),
}

impl DataValue {
    pub fn kind(&self) -> DataTypeKind {
        match self {
            DataValue::Number(_) => DataTypeKind::Number,
            DataValue::String(_) => DataTypeKind::String,
            DataValue::Boolean(_) => DataTypeKind::Boolean,
        }
    }
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DataValue::Number(a), DataValue::Number(b)) => a.to_bits() == b.to_bits(),
            (DataValue::String(a), DataValue::String(b)) => a == b,
            (DataValue::Boolean(a), DataValue::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for DataValue {}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            DataValue::Number(v) => {
                0u8.hash(state);
                v.to_bits().hash(state);
            }
            DataValue::String(s) => {
                1u8.hash(state);
                s.hash(state);
            }
            DataValue::Boolean(b) => {
                2u8.hash(state);
                b.hash(state);
            }
        }
    }
}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DataValue::Number(a), DataValue::Number(b)) => a.total_cmp(b),
            (DataValue::String(a), DataValue::String(b)) => a.cmp(b),
            (DataValue::Boolean(a), DataValue::Boolean(b)) => a.cmp(b),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Number(v) => write!(f, "{v}"),
            DataValue::String(s) => write!(f, "\"{s}\""),
            DataValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// A facet restriction on a datatype: one bound of a value range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Facet {
    MinInclusive(DataValue),
    MinExclusive(DataValue),
    MaxInclusive(DataValue),
    MaxExclusive(DataValue),
}

impl Facet {
    pub fn kind(&self) -> DataTypeKind {
        match self {
            Facet::MinInclusive(v)
            | Facet::MinExclusive(v)
            | Facet::MaxInclusive(v)
            | Facet::MaxExclusive(v) => v.kind(),
        }
    }

    /// The complementary facet: `not (x < v)` is `x >= v` and so on
    pub fn complement(&self) -> Facet {
        match self {
            Facet::MinInclusive(v) => Facet::MaxExclusive(v.clone()),
            Facet::MinExclusive(v) => Facet::MaxInclusive(v.clone()),
            Facet::MaxInclusive(v) => Facet::MinExclusive(v.clone()),
            Facet::MaxExclusive(v) => Facet::MinInclusive(v.clone()),
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::MinInclusive(v) => write!(f, ">= {v}"),
            Facet::MinExclusive(v) => write!(f, "> {v}"),
            Facet::MaxInclusive(v) => write!(f, "<= {v}"),
            Facet::MaxExclusive(v) => write!(f, "< {v}"),
        }
    }
}

/// One bound of an interval together with the dep-set that set it
#[derive(Debug, Clone)]
struct DepBound {
    value: DataValue,
    exclusive: bool,
    dep: DepSet,
}

/// A min/max pair with per-bound dep-sets
#[derive(Debug, Clone, Default)]
pub struct DepInterval {
    min: Option<DepBound>,
    max: Option<DepBound>,
}

impl DepInterval {
    /// Tighten the min bound; keeps the stricter of old and new
    fn update_min(&mut self, value: &DataValue, exclusive: bool, dep: &DepSet) {
        let tighter = match &self.min {
            None => true,
            Some(b) => match value.cmp(&b.value) {
                Ordering::Greater => true,
                Ordering::Equal => exclusive && !b.exclusive,
                Ordering::Less => false,
            },
        };
        if tighter {
            self.min = Some(DepBound {
                value: value.clone(),
                exclusive,
                dep: dep.clone(),
            });
        }
    }

    /// Tighten the max bound; keeps the stricter of old and new
    fn update_max(&mut self, value: &DataValue, exclusive: bool, dep: &DepSet) {
        let tighter = match &self.max {
            None => true,
            Some(b) => match value.cmp(&b.value) {
                Ordering::Less => true,
                Ordering::Equal => exclusive && !b.exclusive,
                Ordering::Greater => false,
            },
        };
        if tighter {
            self.max = Some(DepBound {
                value: value.clone(),
                exclusive,
                dep: dep.clone(),
            });
        }
    }

    /// If min and max cross, return the union of the bound dep-sets
    fn min_max_clash(&self) -> Option<DepSet> {
        let (min, max) = match (&self.min, &self.max) {
            (Some(min), Some(max)) => (min, max),
            _ => return None,
        };
        let crossed = match min.value.cmp(&max.value) {
            Ordering::Greater => true,
            Ordering::Equal => min.exclusive || max.exclusive,
            Ordering::Less => false,
        };
        if crossed {
            Some(min.dep.union(&max.dep))
        } else {
            None
        }
    }

    /// The single value the interval admits, if it has collapsed to a point
    fn point(&self) -> Option<(&DataValue, DepSet)> {
        let (min, max) = match (&self.min, &self.max) {
            (Some(min), Some(max)) => (min, max),
            _ => return None,
        };
        if min.value == max.value && !min.exclusive && !max.exclusive {
            Some((&min.value, min.dep.union(&max.dep)))
        } else {
            None
        }
    }
}

/// Everything the reasoner has learned about one datatype on one data node
#[derive(Debug, Clone, Default)]
struct DataTypeAppearance {
    /// Dep-set of the positive type assertion, if present
    positive: Option<DepSet>,
    /// Dep-set of the negative type assertion, if present
    negative: Option<DepSet>,
    /// Accumulated interval constraints
    interval: DepInterval,
    /// Values the node must not equal
    excluded: Vec<(DataValue, DepSet)>,
}

/// Interval sub-reasoner for the data values on a single data node
///
/// The tableau feeds every simple label entry of a data node through
/// [`DataTypeReasoner::add_entry`] and then calls
/// [`DataTypeReasoner::check_clash`]. On a clash the contributing dep-sets
/// are available from [`DataTypeReasoner::clash_set`]; there are no retries.
#[derive(Debug, Default)]
pub struct DataTypeReasoner {
    number: DataTypeAppearance,
    string: DataTypeAppearance,
    boolean: DataTypeAppearance,
    clash_set: DepSet,
}

impl DataTypeReasoner {
    pub fn new() -> Self {
        DataTypeReasoner::default()
    }

    /// Forget all state from the previous data node
    pub fn clear(&mut self) {
        *self = DataTypeReasoner::default();
    }

    fn appearance(&mut self, kind: DataTypeKind) -> &mut DataTypeAppearance {
        match kind {
            DataTypeKind::Number => &mut self.number,
            DataTypeKind::String => &mut self.string,
            DataTypeKind::Boolean => &mut self.boolean,
        }
    }

    fn report_clash(&mut self, dep: DepSet, reason: &str) -> bool {
        log::debug!("datatype clash ({reason}) dep={dep}");
        self.clash_set = dep;
        true
    }

    /// Feed one label entry of a data node into the reasoner.
    ///
    /// Returns true iff this entry alone already makes the node
    /// unsatisfiable; the clash dep-set is then set.
    pub fn add_entry(&mut self, vertex: &DagVertex, positive: bool, dep: &DepSet) -> bool {
        match vertex {
            DagVertex::DataType { kind } => {
                let app = self.appearance(*kind);
                if positive {
                    let clash = app.negative.clone();
                    if app.positive.is_none() {
                        app.positive = Some(dep.clone());
                    }
                    if let Some(neg) = clash {
                        return self.report_clash(dep.union(&neg), "TNT");
                    }
                } else {
                    let clash = app.positive.clone();
                    if app.negative.is_none() {
                        app.negative = Some(dep.clone());
                    }
                    if let Some(pos) = clash {
                        return self.report_clash(dep.union(&pos), "TNT");
                    }
                }
                false
            }
            DagVertex::DataValue { value } => {
                let kind = value.kind();
                if positive {
                    // a value is the point interval [v,v] plus a positive
                    // type appearance
                    let app = self.appearance(kind);
                    if app.positive.is_none() {
                        app.positive = Some(dep.clone());
                    }
                    app.interval.update_min(value, false, dep);
                    app.interval.update_max(value, false, dep);
                } else {
                    self.appearance(kind).excluded.push((value.clone(), dep.clone()));
                }
                false
            }
            DagVertex::DataExpr { facet } => {
                let facet = if positive {
                    facet.clone()
                } else {
                    facet.complement()
                };
                let kind = facet.kind();
                let app = self.appearance(kind);
                // a facet asserts membership in its base type
                if app.positive.is_none() {
                    app.positive = Some(dep.clone());
                }
                match &facet {
                    Facet::MinInclusive(v) => app.interval.update_min(v, false, dep),
                    Facet::MinExclusive(v) => app.interval.update_min(v, true, dep),
                    Facet::MaxInclusive(v) => app.interval.update_max(v, false, dep),
                    Facet::MaxExclusive(v) => app.interval.update_max(v, true, dep),
                }
                false
            }
            // non-data vertices may reach a data node label via TOP-like
            // entries; they carry no datatype information
            _ => false,
        }
    }

    /// Sweep all types for accumulated contradictions
    pub fn check_clash(&mut self) -> bool {
        for kind in [DataTypeKind::Number, DataTypeKind::String, DataTypeKind::Boolean] {
            let app = match kind {
                DataTypeKind::Number => &self.number,
                DataTypeKind::String => &self.string,
                DataTypeKind::Boolean => &self.boolean,
            };

            // positive and negative appearance of the same type
            if let (Some(pos), Some(neg)) = (&app.positive, &app.negative) {
                let dep = pos.union(neg);
                return self.report_clash(dep, "PNT");
            }

            // inconsistent interval, considering exclusivity
            if app.positive.is_some() {
                if let Some(dep) = app.interval.min_max_clash() {
                    return self.report_clash(dep, "MM");
                }
                // interval collapsed onto a forbidden point
                if let Some((value, interval_dep)) = app.interval.point() {
                    let hit = app
                        .excluded
                        .iter()
                        .find(|(v, _)| v == value)
                        .map(|(_, d)| interval_dep.union(d));
                    if let Some(dep) = hit {
                        return self.report_clash(dep, "NE");
                    }
                }
            }
        }
        false
    }

    /// Dep-set of the last reported clash
    pub fn clash_set(&self) -> &DepSet {
        &self.clash_set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> DataValue {
        DataValue::Number(v)
    }

    #[test]
    fn crossing_bounds_clash() {
        let mut dtr = DataTypeReasoner::new();
        let gt18 = DagVertex::DataExpr {
            facet: Facet::MinExclusive(num(18.0)),
        };
        let lt10 = DagVertex::DataExpr {
            facet: Facet::MaxExclusive(num(10.0)),
        };
        assert!(!dtr.add_entry(&gt18, true, &DepSet::singleton(2)));
        assert!(!dtr.add_entry(&lt10, true, &DepSet::singleton(3)));
        assert!(dtr.check_clash());
        assert!(dtr.clash_set().contains(2));
        assert!(dtr.clash_set().contains(3));
    }

    #[test]
    fn value_against_strict_bound_clashes() {
        // (R >= v) and (R < v) on the same node
        let mut dtr = DataTypeReasoner::new();
        let ge = DagVertex::DataExpr {
            facet: Facet::MinInclusive(num(5.0)),
        };
        let lt = DagVertex::DataExpr {
            facet: Facet::MaxExclusive(num(5.0)),
        };
        dtr.add_entry(&ge, true, &DepSet::singleton(1));
        dtr.add_entry(&lt, true, &DepSet::singleton(4));
        assert!(dtr.check_clash());
        assert_eq!(dtr.clash_set().max_level(), 4);
    }

    #[test]
    fn positive_and_negative_type_clash() {
        let mut dtr = DataTypeReasoner::new();
        let ty = DagVertex::DataType {
            kind: DataTypeKind::String,
        };
        assert!(!dtr.add_entry(&ty, true, &DepSet::empty()));
        assert!(dtr.add_entry(&ty, false, &DepSet::singleton(2)));
        assert!(dtr.clash_set().contains(2));
    }

    #[test]
    fn point_interval_consistent_with_wide_bounds() {
        let mut dtr = DataTypeReasoner::new();
        let val = DagVertex::DataValue { value: num(21.0) };
        let gt18 = DagVertex::DataExpr {
            facet: Facet::MinExclusive(num(18.0)),
        };
        dtr.add_entry(&val, true, &DepSet::empty());
        dtr.add_entry(&gt18, true, &DepSet::empty());
        assert!(!dtr.check_clash());
    }

    #[test]
    fn excluded_point_clash() {
        let mut dtr = DataTypeReasoner::new();
        let val = DagVertex::DataValue {
            value: DataValue::Boolean(true),
        };
        dtr.add_entry(&val, true, &DepSet::singleton(1));
        dtr.add_entry(&val, false, &DepSet::singleton(2));
        assert!(dtr.check_clash());
        assert!(dtr.clash_set().contains(1));
        assert!(dtr.clash_set().contains(2));
    }
}
