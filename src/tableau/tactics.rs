//! Expansion Rules
//!
//! `common_tactic` dispatches on the tag and polarity of the concept under
//! processing. Deterministic rules grow the current branch level's dep-set;
//! non-deterministic ones (disjunction, choose, at-most merging, NN) open a
//! branching context and raise the level per attempt.

use super::branching::BcAlternatives;
use super::{SatTester, TacticUsage};
use crate::dag::{Bp, DagVertex};
use crate::deps::DepSet;
use crate::graph::NodeId;
use crate::roles::RoleId;

impl SatTester<'_> {
    /// Apply the expansion rule for the current entry
    pub(crate) fn common_tactic(&mut self) -> TacticUsage {
        self.stats.tactic_calls += 1;
        let (node, cwd) = self.cur.clone().expect("tactic without a current entry");
        let node = self.cgraph.resolve(node);
        if self.cgraph.node(node).is_purged() || self.cgraph.node(node).is_cached() {
            return TacticUsage::Unusable;
        }

        let bp = cwd.bp;
        let dep = cwd.dep;
        let positive = bp.is_positive();

        match self.dag.get(bp).clone() {
            DagVertex::Top => TacticUsage::Unusable,
            DagVertex::Concept { .. } | DagVertex::Singleton { .. } => {
                self.tactic_id(node, bp, &dep)
            }
            DagVertex::And { children } => {
                if positive {
                    self.tactic_and(node, &children, &dep)
                } else {
                    self.tactic_or(node, &children, &dep)
                }
            }
            DagVertex::Forall { role, concept } => {
                if positive {
                    self.tactic_forall(node, bp, role, concept, &dep)
                } else {
                    self.tactic_some(node, role, concept.inverse(), &dep)
                }
            }
            DagVertex::AtMost { n, role, concept } => {
                if positive {
                    self.tactic_le(node, n, role, concept, &dep)
                } else {
                    self.tactic_ge(node, n + 1, role, concept, &dep)
                }
            }
            DagVertex::SelfRef { role } => {
                if positive {
                    self.tactic_self(node, role, &dep)
                } else {
                    self.tactic_irr(node, role, &dep)
                }
            }
            DagVertex::Proj {
                role,
                guard,
                proj_role,
            } => {
                if positive {
                    self.tactic_proj(node, role, guard, proj_role, &dep)
                } else {
                    TacticUsage::Unusable
                }
            }
            // data entries were handed to the interval reasoner at insertion
            DagVertex::DataType { .. } | DagVertex::DataValue { .. } | DagVertex::DataExpr { .. } => {
                TacticUsage::Unusable
            }
            // collections expand at insertion and never reach a label
            DagVertex::Collection { .. } => TacticUsage::Unusable,
        }
    }

    /// Unfold a named concept or nominal
    fn tactic_id(&mut self, node: NodeId, bp: Bp, dep: &DepSet) -> TacticUsage {
        self.stats.id_calls += 1;
        let positive = bp.is_positive();
        let base = if positive { bp } else { bp.inverse() };

        // a positive nominal pins the node to the individual's node
        if positive {
            if let DagVertex::Singleton { .. } = self.dag.get(bp) {
                match self.nominal_nodes.get(&bp).copied() {
                    None => {
                        self.nominal_nodes.insert(bp, node);
                    }
                    Some(home) => {
                        let home = self.cgraph.resolve(home);
                        if home != node {
                            self.stats.merges += 1;
                            return self.merge_nodes(node, home, dep.clone());
                        }
                    }
                }
            }
        }

        let definition = self.dag.definition(base);
        if !definition.is_valid() {
            return TacticUsage::Unusable;
        }
        if positive {
            self.add_todo_entry(node, definition, dep)
        } else if self.dag.get(base).is_primitive_name()
            || matches!(self.dag.get(base), DagVertex::Singleton { .. })
        {
            // told subsumptions only unfold positively
            TacticUsage::Unusable
        } else {
            self.add_todo_entry(node, definition.inverse(), dep)
        }
    }

    /// Conjunction: add every conjunct under the same dep-set
    fn tactic_and(&mut self, node: NodeId, children: &[Bp], dep: &DepSet) -> TacticUsage {
        self.stats.and_calls += 1;
        for &child in children {
            if self.add_todo_entry(node, child, dep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
        }
        TacticUsage::Done
    }

    /// Disjunction: branch over the negated children of the `And`
    fn tactic_or(&mut self, node: NodeId, children: &[Bp], dep: &DepSet) -> TacticUsage {
        self.stats.or_calls += 1;
        let mut options: Vec<Bp> = children.iter().map(|c| c.inverse()).collect();
        if self.config.reasoning.use_sorted_reasoning {
            options.sort_unstable();
        }

        if !self.bcontext_active {
            // satisfied already?
            let label = self.cgraph.node(node).label();
            if options.iter().any(|&alt| label.contains(alt)) {
                return TacticUsage::Unusable;
            }
            // alternatives contradicted by the label fail on the spot; their
            // causes seed the accumulated branch dep-set
            let mut branch_dep = dep.clone();
            let mut viable = Vec::with_capacity(options.len());
            for &alt in &options {
                match self.cgraph.node(node).label().find(alt.inverse()) {
                    Some(cause) => branch_dep = branch_dep.union(cause),
                    None => viable.push(alt),
                }
            }
            if viable.is_empty() {
                self.set_clash(branch_dep);
                return TacticUsage::Clash;
            }
            self.push_bc(BcAlternatives::Or { options: viable }, branch_dep);
        }

        let bc = self.stack.last_mut().expect("or-tactic without context");
        let level = bc.level;
        let (choice, failed) = match &bc.alternatives {
            BcAlternatives::Or { options } => {
                let choice = options[bc.next_option];
                let failed: Vec<Bp> = options[..bc.next_option].to_vec();
                (choice, failed)
            }
            other => unreachable!("or-tactic on a {other:?} context"),
        };
        bc.next_option += 1;
        let branch_dep = bc.branch_dep.clone();

        self.save();
        let choice_dep = dep.with(level);
        if self.config.reasoning.use_semantic_branching {
            // failed disjuncts are known false in this branch
            let failure_dep = branch_dep.with(level);
            for alt in failed {
                if self.add_todo_entry(node, alt.inverse(), &failure_dep) == TacticUsage::Clash {
                    return TacticUsage::Clash;
                }
            }
        }
        self.add_todo_entry(node, choice, &choice_dep)
    }

    /// Universal restriction: push the filler over every matching edge,
    /// chaining through transitive sub-roles
    fn tactic_forall(
        &mut self,
        node: NodeId,
        bp: Bp,
        role: RoleId,
        concept: Bp,
        dep: &DepSet,
    ) -> TacticUsage {
        self.stats.forall_calls += 1;
        for (m, t, edep) in self.cgraph.edge_labels_at(node) {
            if self.cgraph.node(m).is_purged() || !self.roles.is_subrole(t, role) {
                continue;
            }
            let push_dep = dep.union(&edep);
            if self.add_todo_entry(m, concept, &push_dep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
            for tr in self.roles.transitive_between(t, role) {
                if let Some(chain) = self.dag.existing_forall(tr, concept) {
                    if chain == bp && m == node {
                        continue;
                    }
                    if self.add_todo_entry(m, chain, &push_dep) == TacticUsage::Clash {
                        return TacticUsage::Clash;
                    }
                }
            }
        }
        TacticUsage::Done
    }

    /// Existential restriction: create (or reuse) a filler successor
    fn tactic_some(&mut self, node: NodeId, role: RoleId, c: Bp, dep: &DepSet) -> TacticUsage {
        self.stats.some_calls += 1;
        if self.check_blocked(node) {
            return TacticUsage::Unusable;
        }

        let neighbours = self.cgraph.neighbours(node, role, self.roles);
        if neighbours
            .iter()
            .any(|(m, _)| c == Bp::TOP || self.cgraph.node(*m).label().contains(c))
        {
            return TacticUsage::Unusable;
        }
        // a functional role reuses its unique neighbour
        if self.roles.is_functional(role) {
            if let Some((m, edep)) = neighbours.first() {
                return self.add_todo_entry(*m, c, &dep.union(edep));
            }
        }

        let data = self.roles.role(role).is_data();
        let m = self.cgraph.new_node(Some(node), data);
        self.cgraph.add_role_edge(node, m, role, dep.clone());
        if self.setup_edge(node, m, role, dep) == TacticUsage::Clash {
            return TacticUsage::Clash;
        }
        let m = self.cgraph.resolve(m);
        if !data {
            if self.gci.is_valid()
                && self.gci != Bp::TOP
                && self.add_todo_entry(m, self.gci, dep) == TacticUsage::Clash
            {
                return TacticUsage::Clash;
            }
            if self.apply_reflexive_roles(m, dep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
        }
        if c != Bp::TOP && self.add_todo_entry(m, c, dep) == TacticUsage::Clash {
            return TacticUsage::Clash;
        }
        if !data {
            if let TacticUsage::Clash = self.try_cache_node(m) {
                return TacticUsage::Clash;
            }
        }
        TacticUsage::Done
    }

    /// At-least restriction: `count` pairwise-distinct fillers
    fn tactic_ge(
        &mut self,
        node: NodeId,
        count: u32,
        role: RoleId,
        c: Bp,
        dep: &DepSet,
    ) -> TacticUsage {
        self.stats.some_calls += 1;
        if self.check_blocked(node) {
            return TacticUsage::Unusable;
        }

        // idempotence: satisfied if enough provably distinct fillers exist
        let holders: Vec<NodeId> = self
            .cgraph
            .neighbours(node, role, self.roles)
            .into_iter()
            .filter(|(m, _)| c == Bp::TOP || self.cgraph.node(*m).label().contains(c))
            .map(|(m, _)| m)
            .collect();
        if holders.len() >= count as usize {
            let all_distinct = holders.iter().enumerate().all(|(i, &a)| {
                holders[i + 1..]
                    .iter()
                    .all(|&b| self.cgraph.node(a).inequal_to(b).is_some())
            });
            if all_distinct {
                return TacticUsage::Unusable;
            }
        }

        let data = self.roles.role(role).is_data();
        let mut created: Vec<NodeId> = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let m = self.cgraph.new_node(Some(node), data);
            for &prev in &created {
                self.cgraph.add_inequality(m, prev, dep);
            }
            self.cgraph.add_role_edge(node, m, role, dep.clone());
            if self.setup_edge(node, m, role, dep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
            if !data {
                if self.gci.is_valid()
                    && self.gci != Bp::TOP
                    && self.add_todo_entry(m, self.gci, dep) == TacticUsage::Clash
                {
                    return TacticUsage::Clash;
                }
                if self.apply_reflexive_roles(m, dep) == TacticUsage::Clash {
                    return TacticUsage::Clash;
                }
            }
            if c != Bp::TOP && self.add_todo_entry(m, c, dep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
            created.push(m);
        }
        TacticUsage::Done
    }

    /// At-most restriction: decide undecided neighbours, then branch over
    /// merge candidates when the bound is exceeded
    fn tactic_le(
        &mut self,
        node: NodeId,
        n: u32,
        role: RoleId,
        c: Bp,
        dep: &DepSet,
    ) -> TacticUsage {
        self.stats.le_calls += 1;
        debug_assert!(
            self.roles.role(role).is_simple(),
            "non-simple role in a cardinality survived preprocessing"
        );

        if self.nn_applicable(node, role) {
            return self.tactic_nn(node, n, role, c, dep);
        }

        let neighbours = self.cgraph.neighbours(node, role, self.roles);

        // choose-rule: every neighbour must be decided on the filler
        if c != Bp::TOP {
            for (m, _) in &neighbours {
                let label = self.cgraph.node(*m).label();
                if !label.contains(c) && !label.contains(c.inverse()) {
                    let target = *m;
                    return self.choose_branch(node, target, c, dep);
                }
            }
        }

        let holders: Vec<(NodeId, DepSet)> = neighbours
            .into_iter()
            .filter(|(m, _)| c == Bp::TOP || self.cgraph.node(*m).label().contains(c))
            .collect();
        if holders.len() <= n as usize {
            return TacticUsage::Unusable;
        }

        // candidate merges among pairs not told apart
        let mut pairs: Vec<(NodeId, NodeId)> = Vec::new();
        for (i, (a, _)) in holders.iter().enumerate() {
            for (b, _) in &holders[i + 1..] {
                if self.cgraph.node(*a).inequal_to(*b).is_none() {
                    // merge toward the nominal or elder node
                    if self.cgraph.node(*b).is_nominal() && !self.cgraph.node(*a).is_nominal() {
                        pairs.push((*a, *b));
                    } else {
                        pairs.push((*b, *a));
                    }
                }
            }
        }

        if pairs.is_empty() {
            // every pair is distinct: a genuine cardinality clash
            let mut clash = dep.clone();
            for (m, edep) in &holders {
                clash = clash.union(edep);
                if c != Bp::TOP {
                    if let Some(ldep) = self.cgraph.node(*m).label().find(c) {
                        clash = clash.union(ldep);
                    }
                }
                for (other, _) in &holders {
                    if let Some(idep) = self.cgraph.node(*m).inequal_to(*other) {
                        clash = clash.union(idep);
                    }
                }
            }
            self.set_clash(clash);
            return TacticUsage::Clash;
        }

        if !self.bcontext_active {
            self.push_bc(BcAlternatives::MaxMerge { pairs }, dep.clone());
        }

        let bc = self.stack.last_mut().expect("le-tactic without context");
        let level = bc.level;
        let (victim, survivor) = match &bc.alternatives {
            BcAlternatives::MaxMerge { pairs } => pairs[bc.next_option],
            other => unreachable!("le-tactic on a {other:?} context"),
        };
        bc.next_option += 1;

        self.save();
        let mut merge_dep = dep.with(level);
        for (m, edep) in &holders {
            if *m == victim || *m == survivor {
                merge_dep = merge_dep.union(edep);
            }
        }
        self.stats.merges += 1;
        let ret = self.merge_nodes(victim, survivor, merge_dep);
        if ret == TacticUsage::Clash {
            return ret;
        }
        // the bound may still be exceeded
        self.requeue_complex(node);
        ret
    }

    /// Semantic split of a neighbour on the at-most filler
    fn choose_branch(&mut self, owner: NodeId, target: NodeId, c: Bp, dep: &DepSet) -> TacticUsage {
        if !self.bcontext_active {
            self.push_bc(
                BcAlternatives::Choose { target, concept: c },
                dep.clone(),
            );
        }
        let bc = self.stack.last_mut().expect("choose without context");
        let level = bc.level;
        let choice = if bc.next_option == 0 { c } else { c.inverse() };
        bc.next_option += 1;

        self.save();
        // the split is complete, so only the decision level is a cause
        let ret = self.add_todo_entry(target, choice, &DepSet::singleton(level));
        if ret == TacticUsage::Clash {
            return ret;
        }
        // let the owning at-most fire again with the neighbour decided
        self.requeue_complex(owner);
        ret
    }

    /// NN-rule precondition: an at-most on a nominal node with a blockable
    /// neighbour over the restricted role
    fn nn_applicable(&self, node: NodeId, role: RoleId) -> bool {
        self.cgraph.node(node).is_nominal()
            && self
                .cgraph
                .neighbours(node, role, self.roles)
                .iter()
                .any(|(m, _)| !self.cgraph.node(*m).is_nominal())
    }

    /// NN-rule: guess how many distinct nominal fillers exist (1..=n),
    /// assert the tighter bound, and materialise them
    fn tactic_nn(&mut self, node: NodeId, n: u32, role: RoleId, c: Bp, dep: &DepSet) -> TacticUsage {
        self.stats.nn_calls += 1;
        if !self.bcontext_active {
            self.push_bc(BcAlternatives::Nn { n }, dep.clone());
        }
        let bc = self.stack.last_mut().expect("nn-tactic without context");
        let level = bc.level;
        let m_count = bc.next_option as u32 + 1;
        bc.next_option += 1;

        self.save();
        let ddep = dep.with(level);

        if let Some(tighter) = self.dag.existing_atmost(m_count, role, c) {
            if self.add_todo_entry(node, tighter, &ddep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
        }

        let next_level = self.cgraph.node(node).nominal_level.map_or(1, |l| l + 1);
        let mut created: Vec<NodeId> = Vec::with_capacity(m_count as usize);
        for _ in 0..m_count {
            let s = self.cgraph.new_node(Some(node), false);
            self.cgraph.set_nominal_level(s, Some(next_level));
            for &prev in &created {
                self.cgraph.add_inequality(s, prev, &ddep);
            }
            self.cgraph.add_role_edge(node, s, role, ddep.clone());
            if self.setup_edge(node, s, role, &ddep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
            if self.gci.is_valid()
                && self.gci != Bp::TOP
                && self.add_todo_entry(s, self.gci, &ddep) == TacticUsage::Clash
            {
                return TacticUsage::Clash;
            }
            if self.apply_reflexive_roles(s, &ddep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
            if c != Bp::TOP && self.add_todo_entry(s, c, &ddep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
            created.push(s);
        }
        TacticUsage::Done
    }

    /// ∃R.Self: an R-loop through the node
    fn tactic_self(&mut self, node: NodeId, role: RoleId, dep: &DepSet) -> TacticUsage {
        self.stats.forall_calls += 1;
        if self.cgraph.self_loop(node, role, self.roles).is_some() {
            return TacticUsage::Unusable;
        }
        self.cgraph.add_role_edge(node, node, role, dep.clone());
        self.setup_edge(node, node, role, dep)
    }

    /// ¬∃R.Self: clash with any existing R-loop; future loops are caught
    /// by `setup_edge`
    fn tactic_irr(&mut self, node: NodeId, role: RoleId, dep: &DepSet) -> TacticUsage {
        if let Some(ldep) = self.cgraph.self_loop(node, role, self.roles) {
            self.set_clash(dep.union(&ldep));
            return TacticUsage::Clash;
        }
        TacticUsage::Done
    }

    /// Projection: mirror a guarded R-edge onto the projected role
    fn tactic_proj(
        &mut self,
        node: NodeId,
        role: RoleId,
        guard: Bp,
        proj_role: RoleId,
        dep: &DepSet,
    ) -> TacticUsage {
        for (m, edep) in self.cgraph.neighbours(node, role, self.roles) {
            let guard_dep = if guard == Bp::TOP {
                Some(DepSet::empty())
            } else {
                self.cgraph.node(m).label().find(guard).cloned()
            };
            if let Some(gdep) = guard_dep {
                let pdep = dep.union(&edep).union(&gdep);
                self.cgraph.add_role_edge(node, m, proj_role, pdep.clone());
                if self.setup_edge(node, m, proj_role, &pdep) == TacticUsage::Clash {
                    return TacticUsage::Clash;
                }
            }
        }
        TacticUsage::Done
    }
}
