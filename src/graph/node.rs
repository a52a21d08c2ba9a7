//! Completion-graph nodes and labels

use crate::dag::Bp;
use crate::deps::DepSet;

/// Index of a node in the completion graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of an edge in the completion graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A concept together with the dep-set under which it entered a label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptWDep {
    pub bp: Bp,
    pub dep: DepSet,
}

impl ConceptWDep {
    pub fn new(bp: Bp, dep: DepSet) -> Self {
        ConceptWDep { bp, dep }
    }
}

/// Node label, split into simple entries (names, data, conjunctions) and
/// complex entries (quantified restrictions). Cache compatibility and
/// blocking only inspect the simple half.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CgLabel {
    pub simple: Vec<ConceptWDep>,
    pub complex: Vec<ConceptWDep>,
}

impl CgLabel {
    pub fn clear(&mut self) {
        self.simple.clear();
        self.complex.clear();
    }

    pub fn half(&self, complex: bool) -> &[ConceptWDep] {
        if complex {
            &self.complex
        } else {
            &self.simple
        }
    }

    pub(crate) fn half_mut(&mut self, complex: bool) -> &mut Vec<ConceptWDep> {
        if complex {
            &mut self.complex
        } else {
            &mut self.simple
        }
    }

    pub fn get(&self, complex: bool, offset: usize) -> &ConceptWDep {
        &self.half(complex)[offset]
    }

    /// Find `bp` in either half and return its dep-set
    pub fn find(&self, bp: Bp) -> Option<&DepSet> {
        self.simple
            .iter()
            .chain(self.complex.iter())
            .find(|c| c.bp == bp)
            .map(|c| &c.dep)
    }

    pub fn contains(&self, bp: Bp) -> bool {
        self.find(bp).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConceptWDep> {
        self.simple.iter().chain(self.complex.iter())
    }

    /// Subset test on the simple half, the blocking condition
    pub fn simple_subset_of(&self, other: &CgLabel) -> bool {
        self.simple
            .iter()
            .all(|c| other.simple.iter().any(|o| o.bp == c.bp))
    }
}

/// One node of the completion graph
///
/// Nodes are pooled: a node object survives `restore` and is re-initialised
/// when handed out again. The blocker link is a plain index, never an owning
/// reference; it is journalled and rewound with everything else.
#[derive(Debug, Clone)]
pub struct CgNode {
    pub(crate) id: NodeId,
    /// `Some(0)` for named individuals; nominal nodes are never blocked
    pub(crate) nominal_level: Option<u32>,
    pub(crate) label: CgLabel,
    /// Creating edge's source, fixed at creation time
    pub(crate) parent: Option<NodeId>,
    /// Direct blocker, if the node is currently blocked
    pub(crate) blocker: Option<NodeId>,
    /// The node is approximated by a model cache and not expanded
    pub(crate) cached: bool,
    /// Set when the node was merged away; carries the merge dep-set
    pub(crate) purge_dep: Option<DepSet>,
    pub(crate) merged_into: Option<NodeId>,
    /// Nodes this one must stay distinct from
    pub(crate) inequal: Vec<(NodeId, DepSet)>,
    /// The node holds concrete data values, not individuals
    pub(crate) data_node: bool,
}

impl CgNode {
    pub(crate) fn fresh(id: NodeId) -> Self {
        CgNode {
            id,
            nominal_level: None,
            label: CgLabel::default(),
            parent: None,
            blocker: None,
            cached: false,
            purge_dep: None,
            merged_into: None,
            inequal: Vec::new(),
            data_node: false,
        }
    }

    pub(crate) fn reinit(&mut self, parent: Option<NodeId>, data_node: bool) {
        self.nominal_level = None;
        self.label.clear();
        self.parent = parent;
        self.blocker = None;
        self.cached = false;
        self.purge_dep = None;
        self.merged_into = None;
        self.inequal.clear();
        self.data_node = data_node;
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn label(&self) -> &CgLabel {
        &self.label
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_nominal(&self) -> bool {
        self.nominal_level.is_some()
    }

    pub fn is_data_node(&self) -> bool {
        self.data_node
    }

    pub fn is_purged(&self) -> bool {
        self.purge_dep.is_some()
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn blocker(&self) -> Option<NodeId> {
        self.blocker
    }

    /// Dep-set under which this node was merged away, if it was
    pub fn purge_dep(&self) -> Option<&DepSet> {
        self.purge_dep.as_ref()
    }

    /// Dep-set of the inequality with `other`, if asserted
    pub fn inequal_to(&self, other: NodeId) -> Option<&DepSet> {
        self.inequal
            .iter()
            .find(|(n, _)| *n == other)
            .map(|(_, d)| d)
    }
}

/// One edge of the completion graph, owned by its source node's direction.
/// The role labels each carry the dep-set that introduced them.
#[derive(Debug, Clone)]
pub struct CgEdge {
    pub(crate) from: NodeId,
    pub(crate) to: NodeId,
    pub(crate) labels: Vec<(crate::roles::RoleId, DepSet)>,
}

impl CgEdge {
    pub fn from(&self) -> NodeId {
        self.from
    }

    pub fn to(&self) -> NodeId {
        self.to
    }

    pub fn labels(&self) -> &[(crate::roles::RoleId, DepSet)] {
        &self.labels
    }
}
