//! Blocking
//!
//! A blockable node is blocked when an earlier node's simple label already
//! subsumes its own (subset blocking): expanding it again could only repeat
//! the blocker's subtree, so generating rules stop there. Candidates are
//! ancestors by default, or any earlier node under anywhere blocking.
//! Nominal nodes are never blocked.
//!
//! Blocker links are established lazily and re-validated by
//! [`SatTester::retest_blocked_status`] just before a model is accepted.

use super::SatTester;
use crate::graph::NodeId;

impl SatTester<'_> {
    /// Whether the node is blocked, establishing a blocker if one exists.
    /// Consulted by the generating tactics only.
    pub(crate) fn check_blocked(&mut self, node: NodeId) -> bool {
        let n = self.cgraph.node(node);
        if n.is_nominal() || n.is_data_node() {
            return false;
        }
        if let Some(blocker) = n.blocker() {
            if self.config.reasoning.use_lazy_blocking {
                // trust the link; the pre-model retest validates it
                return true;
            }
            let bn = self.cgraph.node(blocker);
            let still_valid = !bn.is_purged()
                && bn.blocker().is_none()
                && !self.has_blocked_ancestor(blocker)
                && self.cgraph.node(node).label().simple_subset_of(bn.label());
            if still_valid {
                return true;
            }
            self.cgraph.set_blocker(node, None);
        }
        if self.has_blocked_ancestor(node) {
            return true;
        }
        if let Some(blocker) = self.find_blocker(node) {
            log::trace!("node {} blocked by {}", node.index(), blocker.index());
            self.cgraph.set_blocker(node, Some(blocker));
            return true;
        }
        false
    }

    /// Directly-blocked test over the ancestor chain
    fn has_blocked_ancestor(&self, node: NodeId) -> bool {
        self.cgraph
            .ancestors(node)
            .iter()
            .any(|&a| self.cgraph.node(a).blocker().is_some())
    }

    /// Search for a valid blocker: an unblocked, blockable node whose
    /// simple label is a superset of this node's
    fn find_blocker(&self, node: NodeId) -> Option<NodeId> {
        let label = self.cgraph.node(node).label();
        let valid = |b: NodeId| {
            let bn = self.cgraph.node(b);
            b != node
                && !bn.is_nominal()
                && !bn.is_data_node()
                && !bn.is_purged()
                && bn.blocker().is_none()
                && !self.has_blocked_ancestor(b)
                && label.simple_subset_of(bn.label())
        };

        if self.anywhere_blocking {
            // earlier nodes only, so blocker chains strictly decrease
            self.cgraph
                .nodes()
                .map(|n| n.id())
                .filter(|b| b.index() < node.index())
                .find(|&b| valid(b))
        } else {
            self.cgraph.ancestors(node).into_iter().find(|&b| valid(b))
        }
    }

    /// Re-validate every blocker link before accepting a model. Nodes whose
    /// blocker no longer covers them wake up and re-queue their whole label.
    pub(crate) fn retest_blocked_status(&mut self) {
        loop {
            let mut invalidated: Vec<NodeId> = Vec::new();
            for idx in 0..self.cgraph.size() {
                let id = NodeId(idx);
                let n = self.cgraph.node(id);
                if n.is_purged() {
                    continue;
                }
                let Some(blocker) = n.blocker() else {
                    continue;
                };
                let bn = self.cgraph.node(blocker);
                let still_valid = !bn.is_purged()
                    && bn.blocker().is_none()
                    && !self.has_blocked_ancestor(blocker)
                    && n.label().simple_subset_of(bn.label());
                if !still_valid {
                    invalidated.push(id);
                }
            }
            if invalidated.is_empty() {
                return;
            }
            for id in invalidated {
                log::trace!("node {} lost its blocker", id.index());
                self.cgraph.set_blocker(id, None);
                self.requeue_all(id);
            }
        }
    }

    /// Reactive fairness: a blocked loop that never passes through a
    /// fairness concept rejects the candidate model
    pub(crate) fn fairness_violated(&mut self) -> bool {
        for idx in 0..self.cgraph.size() {
            let id = NodeId(idx);
            let n = self.cgraph.node(id);
            if n.is_purged() {
                continue;
            }
            let Some(blocker) = n.blocker() else {
                continue;
            };
            // the loop the blocked node folds back into: node up to blocker
            let mut path = vec![id];
            for a in self.cgraph.ancestors(id) {
                path.push(a);
                if a == blocker {
                    break;
                }
            }
            if !path.contains(&blocker) {
                // not an ancestor loop; nothing to test
                continue;
            }
            for fc in self.fairness.clone() {
                let satisfied = path
                    .iter()
                    .any(|&p| self.cgraph.node(p).label().contains(fc));
                if !satisfied {
                    log::debug!(
                        "fairness constraint {} violated on the loop at node {}",
                        self.dag.describe(fc),
                        id.index()
                    );
                    return true;
                }
            }
        }
        false
    }
}
