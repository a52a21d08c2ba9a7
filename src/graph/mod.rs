//! Completion Graph
//!
//! The labelled graph grown by the tableau procedure. Every mutation is
//! journalled at the current branch level; `restore(k)` replays the journal
//! in reverse until only entries at or below level `k` remain, which makes
//! the graph bit-identical to its state when `save` raised the level past
//! `k`. Nodes and edges are pooled and reused across save/restore; the pool
//! is only reset at the start of a new top-level query.

mod node;

pub use node::{CgEdge, CgLabel, CgNode, ConceptWDep, EdgeId, NodeId};

#[cfg(test)]
use crate::dag::Bp;
use crate::deps::{BranchLevel, DepSet};
use crate::roles::{RoleId, RoleMaster};

/// One journalled mutation; stored with the level it happened at
#[derive(Debug)]
enum CgChange {
    NewNode,
    NewEdge,
    AddConcept { node: NodeId, complex: bool },
    AddRoleLabel { edge: EdgeId },
    SetBlocker { node: NodeId, old: Option<NodeId> },
    SetCached { node: NodeId, old: bool },
    SetNominalLevel { node: NodeId, old: Option<u32> },
    Purge { node: NodeId },
    RetargetEdge { edge: EdgeId, was_from: bool, old: NodeId },
    AddInequality { node: NodeId },
}

/// The completion graph with journalled save/restore
#[derive(Debug, Default)]
pub struct CompletionGraph {
    nodes: Vec<CgNode>,
    edges: Vec<CgEdge>,
    /// Pool high-water marks: only the prefix is live
    used_nodes: usize,
    used_edges: usize,
    level: BranchLevel,
    journal: Vec<(BranchLevel, CgChange)>,
    max_size: usize,
    n_saves: u64,
    n_restores: u64,
}

impl CompletionGraph {
    pub fn new() -> Self {
        CompletionGraph {
            level: 1,
            ..CompletionGraph::default()
        }
    }

    /// Reset for a new top-level query; pooled storage is retained
    pub fn clear(&mut self) {
        self.used_nodes = 0;
        self.used_edges = 0;
        self.level = 1;
        self.journal.clear();
    }

    pub fn size(&self) -> usize {
        self.used_nodes
    }

    /// Largest node count this graph ever reached
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn saves(&self) -> u64 {
        self.n_saves
    }

    pub fn restores(&self) -> u64 {
        self.n_restores
    }

    pub fn node(&self, id: NodeId) -> &CgNode {
        &self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &CgEdge {
        &self.edges[id.0]
    }

    /// Live nodes, purged ones included (callers filter)
    pub fn nodes(&self) -> impl Iterator<Item = &CgNode> {
        self.nodes[..self.used_nodes].iter()
    }

    /// Follow merge links to the node currently standing in for `id`
    pub fn resolve(&self, mut id: NodeId) -> NodeId {
        while let Some(next) = self.nodes[id.0].merged_into {
            id = next;
        }
        id
    }

    /// Hand out a node from the pool
    pub fn new_node(&mut self, parent: Option<NodeId>, data_node: bool) -> NodeId {
        let id = NodeId(self.used_nodes);
        if self.used_nodes == self.nodes.len() {
            self.nodes.push(CgNode::fresh(id));
        } else {
            self.nodes[id.0].reinit(parent, data_node);
        }
        self.nodes[id.0].parent = parent;
        self.nodes[id.0].data_node = data_node;
        self.used_nodes += 1;
        self.max_size = self.max_size.max(self.used_nodes);
        self.journal.push((self.level, CgChange::NewNode));
        id
    }

    /// Append a concept to a node label half; returns the entry offset
    pub fn add_concept(&mut self, node: NodeId, entry: ConceptWDep, complex: bool) -> usize {
        let half = self.nodes[node.0].label.half_mut(complex);
        half.push(entry);
        let offset = half.len() - 1;
        self.journal.push((self.level, CgChange::AddConcept { node, complex }));
        offset
    }

    /// Add a role label between two nodes, reusing an existing edge in the
    /// same direction; returns the edge
    pub fn add_role_edge(&mut self, from: NodeId, to: NodeId, role: RoleId, dep: DepSet) -> EdgeId {
        let existing = self.edges[..self.used_edges]
            .iter()
            .position(|e| e.from == from && e.to == to);
        let edge = match existing {
            Some(idx) => EdgeId(idx),
            None => {
                let id = EdgeId(self.used_edges);
                if self.used_edges == self.edges.len() {
                    self.edges.push(CgEdge {
                        from,
                        to,
                        labels: Vec::new(),
                    });
                } else {
                    let e = &mut self.edges[id.0];
                    e.from = from;
                    e.to = to;
                    e.labels.clear();
                }
                self.used_edges += 1;
                self.journal.push((self.level, CgChange::NewEdge));
                id
            }
        };
        self.edges[edge.0].labels.push((role, dep));
        self.journal.push((self.level, CgChange::AddRoleLabel { edge }));
        edge
    }

    pub fn set_blocker(&mut self, node: NodeId, blocker: Option<NodeId>) {
        let old = self.nodes[node.0].blocker;
        if old != blocker {
            self.nodes[node.0].blocker = blocker;
            self.journal.push((self.level, CgChange::SetBlocker { node, old }));
        }
    }

    pub fn set_cached(&mut self, node: NodeId, cached: bool) {
        let old = self.nodes[node.0].cached;
        if old != cached {
            self.nodes[node.0].cached = cached;
            self.journal.push((self.level, CgChange::SetCached { node, old }));
        }
    }

    pub fn set_nominal_level(&mut self, node: NodeId, level: Option<u32>) {
        let old = self.nodes[node.0].nominal_level;
        if old != level {
            self.nodes[node.0].nominal_level = level;
            self.journal
                .push((self.level, CgChange::SetNominalLevel { node, old }));
        }
    }

    /// Record that two nodes must stay distinct
    pub fn add_inequality(&mut self, a: NodeId, b: NodeId, dep: &DepSet) {
        self.nodes[a.0].inequal.push((b, dep.clone()));
        self.journal.push((self.level, CgChange::AddInequality { node: a }));
        self.nodes[b.0].inequal.push((a, dep.clone()));
        self.journal.push((self.level, CgChange::AddInequality { node: b }));
    }

    /// Merge `from` into `to`: purge `from` and retarget its edges.
    ///
    /// Label entries are NOT copied here; the tableau re-adds them through
    /// its clash-checking insertion path.
    pub fn merge(&mut self, from: NodeId, to: NodeId, dep: &DepSet) {
        debug_assert!(from != to);
        let node = &mut self.nodes[from.0];
        debug_assert!(node.purge_dep.is_none());
        node.purge_dep = Some(dep.clone());
        node.merged_into = Some(to);
        self.journal.push((self.level, CgChange::Purge { node: from }));

        for idx in 0..self.used_edges {
            let (efrom, eto) = (self.edges[idx].from, self.edges[idx].to);
            if efrom == from && eto != to {
                self.edges[idx].from = to;
                self.journal.push((
                    self.level,
                    CgChange::RetargetEdge {
                        edge: EdgeId(idx),
                        was_from: true,
                        old: from,
                    },
                ));
            }
            if eto == from && efrom != to {
                self.edges[idx].to = to;
                self.journal.push((
                    self.level,
                    CgChange::RetargetEdge {
                        edge: EdgeId(idx),
                        was_from: false,
                        old: from,
                    },
                ));
            }
        }
    }

    /// Successor/predecessor nodes reachable over a sub-role of `role`,
    /// with the dep-set of the first matching role label
    pub fn neighbours(
        &self,
        node: NodeId,
        role: RoleId,
        roles: &RoleMaster,
    ) -> Vec<(NodeId, DepSet)> {
        let mut out: Vec<(NodeId, DepSet)> = Vec::new();
        let mut push = |out: &mut Vec<(NodeId, DepSet)>, m: NodeId, d: &DepSet| {
            let m = self.resolve(m);
            if !self.nodes[m.0].is_purged() && !out.iter().any(|(n, _)| *n == m) {
                out.push((m, d.clone()));
            }
        };
        for e in &self.edges[..self.used_edges] {
            if e.from == node {
                // outgoing: edge role T must satisfy T ⊑ role
                if let Some((_, d)) = e.labels.iter().find(|(t, _)| roles.is_subrole(*t, role)) {
                    push(&mut out, e.to, d);
                }
            }
            if e.to == node {
                // incoming S-edge seen from here is an S⁻-successor
                if let Some((_, d)) = e
                    .labels
                    .iter()
                    .find(|(t, _)| roles.is_subrole(t.inverse(), role))
                {
                    push(&mut out, e.from, d);
                }
            }
        }
        out
    }

    /// Every role label on an edge touching `node`, seen from `node`:
    /// incoming labels are reported through the inverse role. Purged
    /// counterparts are resolved to their merge targets.
    pub fn edge_labels_at(&self, node: NodeId) -> Vec<(NodeId, RoleId, DepSet)> {
        let mut out = Vec::new();
        for e in &self.edges[..self.used_edges] {
            if e.from == node {
                for (t, d) in &e.labels {
                    out.push((self.resolve(e.to), *t, d.clone()));
                }
            }
            if e.to == node {
                for (t, d) in &e.labels {
                    out.push((self.resolve(e.from), t.inverse(), d.clone()));
                }
            }
        }
        out
    }

    /// Dep-set of an R-labelled self-loop on `node`, if one exists
    pub fn self_loop(&self, node: NodeId, role: RoleId, roles: &RoleMaster) -> Option<DepSet> {
        self.edges[..self.used_edges]
            .iter()
            .filter(|e| self.resolve(e.from) == node && self.resolve(e.to) == node)
            .flat_map(|e| e.labels.iter())
            .find(|(t, _)| roles.is_subrole(*t, role) || roles.is_subrole(t.inverse(), role))
            .map(|(_, d)| d.clone())
    }

    /// Raise the branch level; subsequent mutations land above it
    pub fn save(&mut self) {
        self.level += 1;
        self.n_saves += 1;
    }

    /// Rewind the journal until the graph matches its state at level `k`
    pub fn restore(&mut self, k: BranchLevel) {
        while let Some((level, _)) = self.journal.last() {
            if *level <= k {
                break;
            }
            let (_, change) = self.journal.pop().expect("journal entry vanished");
            self.undo(change);
        }
        self.level = k;
        self.n_restores += 1;
    }

    fn undo(&mut self, change: CgChange) {
        match change {
            CgChange::NewNode => {
                self.used_nodes -= 1;
            }
            CgChange::NewEdge => {
                self.used_edges -= 1;
            }
            CgChange::AddConcept { node, complex } => {
                self.nodes[node.0].label.half_mut(complex).pop();
            }
            CgChange::AddRoleLabel { edge } => {
                self.edges[edge.0].labels.pop();
            }
            CgChange::SetBlocker { node, old } => {
                self.nodes[node.0].blocker = old;
            }
            CgChange::SetCached { node, old } => {
                self.nodes[node.0].cached = old;
            }
            CgChange::SetNominalLevel { node, old } => {
                self.nodes[node.0].nominal_level = old;
            }
            CgChange::Purge { node } => {
                self.nodes[node.0].purge_dep = None;
                self.nodes[node.0].merged_into = None;
            }
            CgChange::RetargetEdge { edge, was_from, old } => {
                if was_from {
                    self.edges[edge.0].from = old;
                } else {
                    self.edges[edge.0].to = old;
                }
            }
            CgChange::AddInequality { node } => {
                self.nodes[node.0].inequal.pop();
            }
        }
    }

    /// Ancestor chain of a node, merge links resolved
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.nodes[node.0].parent;
        while let Some(p) = cur {
            let p = self.resolve(p);
            if out.contains(&p) {
                break; // merge loops on nominal graphs
            }
            out.push(p);
            cur = self.nodes[p.0].parent;
        }
        out
    }

    /// Snapshot of the live structure, for save/restore verification
    #[cfg(test)]
    pub(crate) fn fingerprint(&self) -> Vec<(usize, Vec<Bp>, Vec<Bp>)> {
        self.nodes[..self.used_nodes]
            .iter()
            .map(|n| {
                (
                    n.id.0,
                    n.label.simple.iter().map(|c| c.bp).collect(),
                    n.label.complex.iter().map(|c| c.bp).collect(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_rewinds_labels_and_nodes() {
        let mut cg = CompletionGraph::new();
        let root = cg.new_node(None, false);
        cg.add_concept(root, ConceptWDep::new(Bp::TOP, DepSet::empty()), false);
        let before = cg.fingerprint();

        cg.save(); // level 2
        let child = cg.new_node(Some(root), false);
        cg.add_concept(child, ConceptWDep::new(Bp::TOP, DepSet::singleton(2)), false);
        cg.add_concept(root, ConceptWDep::new(Bp::BOTTOM, DepSet::singleton(2)), true);
        assert_eq!(cg.size(), 2);

        cg.restore(1);
        assert_eq!(cg.fingerprint(), before);
        assert_eq!(cg.size(), 1);
    }

    #[test]
    fn restore_unwinds_merge() {
        let mut rm = RoleMaster::new();
        let r = rm.add_role("r", false).unwrap();
        rm.finalize().unwrap();

        let mut cg = CompletionGraph::new();
        let root = cg.new_node(None, false);
        let a = cg.new_node(Some(root), false);
        let b = cg.new_node(Some(root), false);
        cg.add_role_edge(root, a, r, DepSet::empty());
        cg.add_role_edge(root, b, r, DepSet::empty());

        cg.save();
        cg.merge(b, a, &DepSet::singleton(2));
        assert!(cg.node(b).is_purged());
        assert_eq!(cg.resolve(b), a);

        cg.restore(1);
        assert!(!cg.node(b).is_purged());
        assert_eq!(cg.resolve(b), b);
        assert_eq!(cg.neighbours(root, r, &rm).len(), 2);
    }

    #[test]
    fn neighbours_see_inverse_direction() {
        let mut rm = RoleMaster::new();
        let r = rm.add_role("r", false).unwrap();
        rm.finalize().unwrap();

        let mut cg = CompletionGraph::new();
        let root = cg.new_node(None, false);
        let child = cg.new_node(Some(root), false);
        cg.add_role_edge(root, child, r, DepSet::empty());

        let back = cg.neighbours(child, r.inverse(), &rm);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].0, root);
    }

    #[test]
    fn pool_is_reused_after_clear() {
        let mut cg = CompletionGraph::new();
        let n = cg.new_node(None, false);
        cg.add_concept(n, ConceptWDep::new(Bp::TOP, DepSet::empty()), false);
        cg.clear();
        assert_eq!(cg.size(), 0);
        let n2 = cg.new_node(None, false);
        assert_eq!(n2.index(), 0);
        assert!(cg.node(n2).label().simple.is_empty());
    }
}
