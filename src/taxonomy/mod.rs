//! Concept Taxonomy
//!
//! The partial order of named concepts under subsumption, materialised as a
//! DAG of vertices. Each vertex holds a set of synonymous concepts; ⊤ and ⊥
//! are vertices 0 and 1 and always present. Construction happens in
//! [`classifier::Classifier`]; this module holds the structure, navigation,
//! and the versioned snapshot format.

mod classifier;

pub use classifier::{Classifier, NullMonitor, ProgressMonitor};

use crate::kb::ConceptId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Index of a taxonomy vertex
pub type VertexId = usize;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// One vertex: a set of equivalent concepts with direct neighbours
#[derive(Debug, Clone, Default)]
pub struct TaxonomyVertex {
    /// Equivalent concepts; the first is the primer
    pub synonyms: Vec<ConceptId>,
    pub parents: Vec<VertexId>,
    pub children: Vec<VertexId>,
}

/// The materialised subsumption order
#[derive(Debug, Clone)]
pub struct Taxonomy {
    vertices: Vec<TaxonomyVertex>,
    vertex_of: HashMap<ConceptId, VertexId>,
}

impl Taxonomy {
    pub const TOP: VertexId = 0;
    pub const BOTTOM: VertexId = 1;

    /// A taxonomy holding only ⊤ over ⊥
    pub fn new() -> Self {
        let top = TaxonomyVertex {
            synonyms: Vec::new(),
            parents: Vec::new(),
            children: vec![Self::BOTTOM],
        };
        let bottom = TaxonomyVertex {
            synonyms: Vec::new(),
            parents: vec![Self::TOP],
            children: Vec::new(),
        };
        Taxonomy {
            vertices: vec![top, bottom],
            vertex_of: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        false // ⊤ and ⊥ are always present
    }

    pub fn vertex(&self, v: VertexId) -> &TaxonomyVertex {
        &self.vertices[v]
    }

    pub fn vertex_of_concept(&self, c: ConceptId) -> Option<VertexId> {
        self.vertex_of.get(&c).copied()
    }

    /// Attach a concept to an existing vertex as a synonym
    pub fn add_to_vertex(&mut self, v: VertexId, c: ConceptId) {
        self.vertices[v].synonyms.push(c);
        self.vertex_of.insert(c, v);
    }

    /// Splice a new vertex between its parents and children, removing the
    /// direct parent-child links it now mediates
    pub fn insert(
        &mut self,
        concept: ConceptId,
        parents: Vec<VertexId>,
        children: Vec<VertexId>,
    ) -> VertexId {
        let v = self.vertices.len();
        for &p in &parents {
            for &c in &children {
                self.vertices[p].children.retain(|&x| x != c);
                self.vertices[c].parents.retain(|&x| x != p);
            }
        }
        for &p in &parents {
            self.vertices[p].children.push(v);
        }
        for &c in &children {
            self.vertices[c].parents.push(v);
        }
        self.vertices.push(TaxonomyVertex {
            synonyms: vec![concept],
            parents,
            children,
        });
        self.vertex_of.insert(concept, v);
        v
    }

    pub fn parents(&self, v: VertexId) -> &[VertexId] {
        &self.vertices[v].parents
    }

    pub fn children(&self, v: VertexId) -> &[VertexId] {
        &self.vertices[v].children
    }

    /// All vertices strictly above `v`
    pub fn ancestors(&self, v: VertexId) -> Vec<VertexId> {
        self.walk(v, true)
    }

    /// All vertices strictly below `v`
    pub fn descendants(&self, v: VertexId) -> Vec<VertexId> {
        self.walk(v, false)
    }

    /// Walk the hierarchy from `start`, upward or downward, handing each
    /// vertex to the visitor; returning false stops the traversal
    pub fn visit(
        &self,
        start: VertexId,
        up: bool,
        mut visitor: impl FnMut(VertexId, &TaxonomyVertex) -> bool,
    ) {
        let mut seen: HashSet<VertexId> = HashSet::new();
        let mut queue: VecDeque<VertexId> = VecDeque::new();
        queue.push_back(start);
        while let Some(v) = queue.pop_front() {
            let next = if up {
                &self.vertices[v].parents
            } else {
                &self.vertices[v].children
            };
            for &n in next {
                if seen.insert(n) {
                    if !visitor(n, &self.vertices[n]) {
                        return;
                    }
                    queue.push_back(n);
                }
            }
        }
    }

    fn walk(&self, start: VertexId, up: bool) -> Vec<VertexId> {
        let mut seen: HashSet<VertexId> = HashSet::new();
        let mut queue: VecDeque<VertexId> = VecDeque::new();
        queue.push_back(start);
        let mut out = Vec::new();
        while let Some(v) = queue.pop_front() {
            let next = if up {
                &self.vertices[v].parents
            } else {
                &self.vertices[v].children
            };
            for &n in next {
                if seen.insert(n) {
                    out.push(n);
                    queue.push_back(n);
                }
            }
        }
        out
    }

    /// Whether `sub`'s vertex lies at or below `sup`'s
    pub fn subsumes(&self, sup: VertexId, sub: VertexId) -> bool {
        sup == sub || self.ancestors(sub).contains(&sup)
    }

    /// Export as a self-describing snapshot; `name_of` renders concepts
    pub fn to_snapshot(&self, name_of: impl Fn(ConceptId) -> String) -> TaxonomySnapshot {
        TaxonomySnapshot {
            version: SNAPSHOT_VERSION,
            created_at: chrono::Utc::now(),
            vertices: self
                .vertices
                .iter()
                .map(|v| SnapshotVertex {
                    synonyms: v.synonyms.iter().map(|&c| name_of(c)).collect(),
                    parents: v.parents.clone(),
                    children: v.children.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild from a snapshot; `id_of` resolves concept names and may
    /// reject unknown ones
    pub fn from_snapshot(
        snapshot: &TaxonomySnapshot,
        mut id_of: impl FnMut(&str) -> Option<ConceptId>,
    ) -> Option<Taxonomy> {
        if snapshot.version != SNAPSHOT_VERSION || snapshot.vertices.len() < 2 {
            return None;
        }
        let mut tax = Taxonomy {
            vertices: Vec::with_capacity(snapshot.vertices.len()),
            vertex_of: HashMap::new(),
        };
        for (idx, sv) in snapshot.vertices.iter().enumerate() {
            let mut synonyms = Vec::with_capacity(sv.synonyms.len());
            for name in &sv.synonyms {
                let id = id_of(name)?;
                synonyms.push(id);
                tax.vertex_of.insert(id, idx);
            }
            tax.vertices.push(TaxonomyVertex {
                synonyms,
                parents: sv.parents.clone(),
                children: sv.children.clone(),
            });
        }
        Some(tax)
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Taxonomy::new()
    }
}

/// Self-describing, versioned serialisation of a taxonomy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomySnapshot {
    pub version: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub vertices: Vec<SnapshotVertex>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotVertex {
    pub synonyms: Vec<String>,
    pub parents: Vec<VertexId>,
    pub children: Vec<VertexId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_taxonomy_is_top_over_bottom() {
        let tax = Taxonomy::new();
        assert_eq!(tax.children(Taxonomy::TOP), &[Taxonomy::BOTTOM]);
        assert_eq!(tax.parents(Taxonomy::BOTTOM), &[Taxonomy::TOP]);
    }

    #[test]
    fn insert_splices_between_top_and_bottom() {
        let mut tax = Taxonomy::new();
        let v = tax.insert(0, vec![Taxonomy::TOP], vec![Taxonomy::BOTTOM]);
        assert_eq!(tax.children(Taxonomy::TOP), &[v]);
        assert_eq!(tax.parents(Taxonomy::BOTTOM), &[v]);
        assert!(tax.subsumes(Taxonomy::TOP, v));
        assert!(tax.subsumes(v, Taxonomy::BOTTOM));
        assert!(!tax.subsumes(v, Taxonomy::TOP));
    }

    #[test]
    fn snapshot_round_trips() {
        let mut tax = Taxonomy::new();
        tax.insert(7, vec![Taxonomy::TOP], vec![Taxonomy::BOTTOM]);
        let names: HashMap<ConceptId, String> = [(7, "A".to_string())].into_iter().collect();
        let snap = tax.to_snapshot(|c| names[&c].clone());
        assert_eq!(snap.version, SNAPSHOT_VERSION);

        let restored = Taxonomy::from_snapshot(&snap, |n| (n == "A").then_some(7)).unwrap();
        assert_eq!(restored.vertex_of_concept(7), Some(2));
        assert_eq!(restored.len(), tax.len());
    }
}
