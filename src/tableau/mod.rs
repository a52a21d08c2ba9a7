//! Tableau Satisfiability Engine
//!
//! Grows a completion graph under the expansion rules of the concept
//! language until it either saturates (satisfiable) or every branch ends in
//! a clash (unsatisfiable). Clashes carry dep-sets, so backtracking jumps
//! straight to the deepest contributing decision instead of unwinding
//! chronologically.
//!
//! Clash is a value (`TacticUsage::Clash`), never an error: errors escape
//! this module only for timeouts, cancellation, and internal invariant
//! violations.

mod blocking;
mod branching;
mod tactics;

pub use branching::{BcAlternatives, BranchingContext};

use crate::cache::{CacheState, ModelCache, ModelCacheRegistry};
use crate::config::Config;
use crate::dag::{Bp, Dag, DagVertex};
use crate::datatypes::DataTypeReasoner;
use crate::deps::{BranchLevel, DepSet};
use crate::graph::{CompletionGraph, ConceptWDep, NodeId};
use crate::reasoner::ReasoningError;
use crate::roles::{RoleId, RoleMaster};
use crate::todo::{EntryKind, ToDoQueue};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Poll the cancellation flag and timeout once per this many iterations
const POLL_INTERVAL: u32 = 5000;

/// Outcome of applying one expansion step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TacticUsage {
    /// The step changed the graph
    Done,
    /// Nothing to do for this entry
    Unusable,
    /// A contradiction was derived; the clash-set is set
    Clash,
}

/// Result of probing a label for a concept before insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddConceptResult {
    Done,
    Exist,
    Clash,
}

/// Cooperative cancellation and per-test timeout, polled at a fixed
/// iteration interval inside the tableau loop
#[derive(Debug, Clone)]
pub struct QueryGuard {
    cancelled: Arc<AtomicBool>,
    start: Instant,
    timeout: Option<Duration>,
}

impl QueryGuard {
    pub fn new(timeout_ms: u64, cancelled: Arc<AtomicBool>) -> Self {
        QueryGuard {
            cancelled,
            start: Instant::now(),
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        }
    }

    /// A guard that never fires
    pub fn infinite() -> Self {
        QueryGuard::new(0, Arc::new(AtomicBool::new(false)))
    }

    pub fn check(&self) -> Result<(), ReasoningError> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(ReasoningError::Cancelled);
        }
        if let Some(timeout) = self.timeout {
            let elapsed = self.start.elapsed();
            if elapsed > timeout {
                return Err(ReasoningError::Timeout {
                    budget_ms: timeout.as_millis() as u64,
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }
        }
        Ok(())
    }
}

/// Insertion-ordered concept set with truncation, for the per-session
/// "used concepts" probes
#[derive(Debug, Default)]
struct UsedSet {
    order: Vec<Bp>,
    set: HashSet<Bp>,
}

impl UsedSet {
    fn insert(&mut self, bp: Bp) {
        if self.set.insert(bp) {
            self.order.push(bp);
        }
    }

    fn contains(&self, bp: Bp) -> bool {
        self.set.contains(&bp)
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn truncate(&mut self, len: usize) {
        while self.order.len() > len {
            let bp = self.order.pop().expect("used-set order underflow");
            self.set.remove(&bp);
        }
    }

    fn clear(&mut self) {
        self.order.clear();
        self.set.clear();
    }
}

/// Counters for one reasoning session
#[derive(Debug, Default, Clone)]
pub struct ReasoningStats {
    pub tactic_calls: u64,
    pub id_calls: u64,
    pub and_calls: u64,
    pub or_calls: u64,
    pub some_calls: u64,
    pub forall_calls: u64,
    pub le_calls: u64,
    pub nn_calls: u64,
    pub merges: u64,
    pub state_saves: u64,
    pub state_restores: u64,
    pub cache_tries: u64,
    pub cached_sat: u64,
    pub cached_unsat: u64,
    pub fairness_violations: u64,
}

impl ReasoningStats {
    fn log(&self) {
        log::debug!(
            "tableau: {} tactic calls ({} id, {} and, {} or, {} some, {} forall, {} le, {} nn), \
             {} merges, {} saves, {} restores, {} cache tries ({} sat, {} unsat)",
            self.tactic_calls,
            self.id_calls,
            self.and_calls,
            self.or_calls,
            self.some_calls,
            self.forall_calls,
            self.le_calls,
            self.nn_calls,
            self.merges,
            self.state_saves,
            self.state_restores,
            self.cache_tries,
            self.cached_sat,
            self.cached_unsat,
        );
    }
}

/// The ABox preloaded into a nominal session: one entry per named
/// individual plus told role links between them
#[derive(Debug, Default, Clone)]
pub struct AboxInit {
    pub individuals: Vec<IndividualInit>,
    /// `(subject index, role, object index)`
    pub role_links: Vec<(usize, RoleId, usize)>,
    /// Pairs asserted distinct
    pub different: Vec<(usize, usize)>,
    /// Pairs asserted equal
    pub same: Vec<(usize, usize)>,
}

/// What a consistency run carries beyond the told ABox
#[derive(Debug, Clone, Copy)]
pub enum ConsistencyExtra {
    /// Plain consistency
    None,
    /// Force a concept onto one individual (instance checking)
    OnIndividual(usize, Bp),
    /// Load a concept at a fresh blockable node (nominal-aware
    /// satisfiability)
    OnFresh(Bp),
}

#[derive(Debug, Clone)]
pub struct IndividualInit {
    pub name: String,
    /// The nominal's own DAG pointer
    pub pname: Bp,
    /// Asserted concepts
    pub concepts: Vec<Bp>,
}

/// One satisfiability session over a fixed ontology
///
/// Borrows the read-only DAG and role hierarchy; owns the completion graph,
/// the ToDo queue, and the branching stack. Model-cache slots are the only
/// state written back, through the registry.
pub struct SatTester<'a> {
    dag: &'a Dag,
    roles: &'a RoleMaster,
    config: &'a Config,
    caches: &'a mut ModelCacheRegistry,
    /// The internalised global assertion added to every fresh node
    gci: Bp,
    reflexive_roles: Vec<RoleId>,
    fairness: Vec<Bp>,
    guard: QueryGuard,
    /// DAG caches are unsafe once nominal merging is possible
    use_dag_cache: bool,
    /// Forced off when fairness constraints exist
    anywhere_blocking: bool,

    cgraph: CompletionGraph,
    todo: ToDoQueue,
    stack: Vec<BranchingContext>,
    try_level: BranchLevel,
    /// Entry under processing; re-read from the branching context on restore
    cur: Option<(NodeId, ConceptWDep)>,
    /// Set when the stack top was entered through a restore
    bcontext_active: bool,
    clash_set: DepSet,
    p_used: UsedSet,
    n_used: UsedSet,
    dtr: DataTypeReasoner,
    /// Pointers whose cache construction is underway; breaks cascade cycles
    in_process: HashSet<Bp>,
    /// Nominal pointer → its completion-graph node, for this session
    nominal_nodes: HashMap<Bp, NodeId>,
    /// Advisory record of nominal pairs merged during this session
    same_individuals: Vec<(String, String)>,
    stats: ReasoningStats,
}

impl<'a> SatTester<'a> {
    pub fn new(
        dag: &'a Dag,
        roles: &'a RoleMaster,
        config: &'a Config,
        caches: &'a mut ModelCacheRegistry,
        gci: Bp,
        fairness: Vec<Bp>,
        has_nominals: bool,
        guard: QueryGuard,
    ) -> Self {
        let mut anywhere_blocking = config.reasoning.use_anywhere_blocking;
        if !fairness.is_empty() && anywhere_blocking {
            log::info!("fairness constraints present: disabling anywhere blocking");
            anywhere_blocking = false;
        }
        let reflexive_roles = roles.reflexive_roles();
        SatTester {
            dag,
            roles,
            config,
            caches,
            gci,
            reflexive_roles,
            fairness,
            guard,
            use_dag_cache: !has_nominals,
            anywhere_blocking,
            cgraph: CompletionGraph::new(),
            todo: ToDoQueue::new(config.priorities.clone()),
            stack: Vec::new(),
            try_level: 1,
            cur: None,
            bcontext_active: false,
            clash_set: DepSet::empty(),
            p_used: UsedSet::default(),
            n_used: UsedSet::default(),
            dtr: DataTypeReasoner::new(),
            in_process: HashSet::new(),
            nominal_nodes: HashMap::new(),
            same_individuals: Vec::new(),
            stats: ReasoningStats::default(),
        }
    }

    pub fn stats(&self) -> &ReasoningStats {
        &self.stats
    }

    /// Nominal merges observed in the last session; advisory output only
    pub fn same_individuals(&self) -> &[(String, String)] {
        &self.same_individuals
    }

    pub fn graph(&self) -> &CompletionGraph {
        &self.cgraph
    }

    /// Satisfiability of a DAG pointer, answered from the model cache when
    /// possible
    pub fn is_satisfiable(&mut self, bp: Bp) -> Result<bool, ReasoningError> {
        if !bp.is_valid() {
            return Err(ReasoningError::Internal {
                detail: "satisfiability of an invalid pointer".to_string(),
            });
        }
        if self.use_dag_cache {
            let state = self.create_cache(bp)?.state();
            Ok(state != CacheState::Invalid)
        } else {
            self.run_sat(bp)
        }
    }

    /// Reset all per-query state and test one concept at a fresh root
    pub fn run_sat(&mut self, bp: Bp) -> Result<bool, ReasoningError> {
        self.prepare();
        let root = self.cgraph.new_node(None, false);
        if self.init_new_node(root, bp, &DepSet::empty()) == TacticUsage::Clash {
            log::debug!("clash while loading {} into the root", self.dag.describe(bp));
            return Ok(false);
        }
        let result = self.check_satisfiability();
        self.stats.log();
        result
    }

    /// Joint satisfiability of two pointers at one root node, the
    /// subsumption-test entry: `c ⊑ d` iff `run_sat_pair(c, ¬d)` is false
    pub fn run_sat_pair(&mut self, a: Bp, b: Bp) -> Result<bool, ReasoningError> {
        self.prepare();
        let root = self.cgraph.new_node(None, false);
        if self.init_new_node(root, a, &DepSet::empty()) == TacticUsage::Clash {
            return Ok(false);
        }
        if self.add_todo_entry(root, b, &DepSet::empty()) == TacticUsage::Clash {
            return Ok(false);
        }
        let result = self.check_satisfiability();
        self.stats.log();
        result
    }

    /// Consistency of the preloaded ABox, with an optional extra concept
    /// forced onto one individual (instance checking)
    pub fn run_consistency(
        &mut self,
        abox: &AboxInit,
        extra: ConsistencyExtra,
    ) -> Result<bool, ReasoningError> {
        self.prepare();

        // one level-0 node per named individual
        let mut nodes = Vec::with_capacity(abox.individuals.len());
        for ind in &abox.individuals {
            let node = self.cgraph.new_node(None, false);
            self.cgraph.set_nominal_level(node, Some(0));
            self.nominal_nodes.insert(ind.pname, node);
            nodes.push(node);
        }
        for (i, ind) in abox.individuals.iter().enumerate() {
            let node = nodes[i];
            if self.init_new_node(node, ind.pname, &DepSet::empty()) == TacticUsage::Clash {
                return Ok(false);
            }
            for &c in &ind.concepts {
                if self.add_todo_entry(node, c, &DepSet::empty()) == TacticUsage::Clash {
                    return Ok(false);
                }
            }
        }
        for &(s, role, o) in &abox.role_links {
            let (from, to) = (self.cgraph.resolve(nodes[s]), self.cgraph.resolve(nodes[o]));
            self.cgraph.add_role_edge(from, to, role, DepSet::empty());
            if self.setup_edge(from, to, role, &DepSet::empty()) == TacticUsage::Clash {
                return Ok(false);
            }
        }
        for &(a, b) in &abox.different {
            let (a, b) = (self.cgraph.resolve(nodes[a]), self.cgraph.resolve(nodes[b]));
            if a == b {
                // already identified: told inequality is violated outright
                self.set_clash(DepSet::empty());
                return Ok(false);
            }
            self.cgraph.add_inequality(a, b, &DepSet::empty());
        }
        for &(a, b) in &abox.same {
            let (a, b) = (self.cgraph.resolve(nodes[a]), self.cgraph.resolve(nodes[b]));
            if a != b && self.merge_nodes(a, b, DepSet::empty()) == TacticUsage::Clash {
                return Ok(false);
            }
        }

        match extra {
            ConsistencyExtra::None => {}
            ConsistencyExtra::OnIndividual(idx, c) => {
                let node = self.cgraph.resolve(nodes[idx]);
                if self.add_todo_entry(node, c, &DepSet::empty()) == TacticUsage::Clash {
                    return Ok(false);
                }
            }
            ConsistencyExtra::OnFresh(c) => {
                let node = self.cgraph.new_node(None, false);
                if self.init_new_node(node, c, &DepSet::empty()) == TacticUsage::Clash {
                    return Ok(false);
                }
            }
        }

        // everything so far is deterministic; wall it off so backtracking
        // can never unwind the told ABox
        self.push_bc(BcAlternatives::Barrier, DepSet::empty());
        self.save();

        let result = self.check_satisfiability();
        self.stats.log();
        result
    }

    fn prepare(&mut self) {
        self.cgraph.clear();
        self.todo.clear();
        self.stack.clear();
        self.try_level = 1;
        self.cur = None;
        self.bcontext_active = false;
        self.clash_set = DepSet::empty();
        self.p_used.clear();
        self.n_used.clear();
        self.nominal_nodes.clear();
        self.same_individuals.clear();
    }

    /// Global assertion, reflexive self-loops, then the concept itself
    fn init_new_node(&mut self, node: NodeId, bp: Bp, dep: &DepSet) -> TacticUsage {
        if self.gci.is_valid() && self.gci != Bp::TOP {
            if self.add_todo_entry(node, self.gci, dep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
        }
        if self.apply_reflexive_roles(node, dep) == TacticUsage::Clash {
            return TacticUsage::Clash;
        }
        self.add_todo_entry(node, bp, dep)
    }

    /// Insert an R-labelled loop for every reflexive role R
    fn apply_reflexive_roles(&mut self, node: NodeId, dep: &DepSet) -> TacticUsage {
        for role in self.reflexive_roles.clone() {
            self.cgraph.add_role_edge(node, node, role, dep.clone());
            if self.setup_edge(node, node, role, dep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
        }
        TacticUsage::Done
    }

    /// The saturation loop
    fn check_satisfiability(&mut self) -> Result<bool, ReasoningError> {
        let mut loop_count: u32 = 0;
        loop {
            if self.cur.is_none() {
                if self.todo.is_empty() {
                    // make sure every blocked node is still blocked
                    self.retest_blocked_status();
                    if self.todo.is_empty() {
                        if !self.fairness.is_empty() && self.fairness_violated() {
                            self.stats.fairness_violations += 1;
                            if self.straightforward_restore() {
                                return Ok(false);
                            }
                            continue;
                        }
                        return Ok(true);
                    }
                }
                match self.todo.next_entry() {
                    Some(entry) => {
                        let cwd = self
                            .cgraph
                            .node(entry.node)
                            .label()
                            .get(entry.complex, entry.offset)
                            .clone();
                        self.cur = Some((entry.node, cwd));
                    }
                    None => continue,
                }
            }

            loop_count += 1;
            if loop_count == POLL_INTERVAL {
                loop_count = 0;
                self.guard.check()?;
            }

            if self.common_tactic() == TacticUsage::Clash {
                if self.tuned_restore() {
                    return Ok(false);
                }
            } else {
                self.cur = None;
            }
        }
    }

    pub(crate) fn set_clash(&mut self, dep: DepSet) {
        self.clash_set = dep;
    }

    pub(crate) fn clash_set(&self) -> &DepSet {
        &self.clash_set
    }

    //-------------------------------------------------------------------
    // save / restore
    //-------------------------------------------------------------------

    /// Push a branching context owning the current level
    fn push_bc(&mut self, alternatives: BcAlternatives, branch_dep: DepSet) {
        self.stack.push(BranchingContext {
            level: self.try_level,
            cur: self.cur.clone(),
            p_used_len: self.p_used.len(),
            n_used_len: self.n_used.len(),
            branch_dep,
            alternatives,
            next_option: 0,
        });
        self.bcontext_active = true;
    }

    /// Snapshot graph and queue, then raise the branch level
    fn save(&mut self) {
        self.cgraph.save();
        self.todo.save(self.try_level);
        self.try_level += 1;
        self.bcontext_active = false;
        self.stats.state_saves += 1;
    }

    /// Rewind everything to branch level `level`; the stack top must own it
    fn restore_to(&mut self, level: BranchLevel) {
        debug_assert!(level > 0, "restore below the initial level");
        self.try_level = level;
        self.cgraph.restore(level);
        self.todo.restore(level);
        let bc = self.stack.last().expect("restore with an empty stack");
        debug_assert_eq!(bc.level, level, "branching stack has gaps");
        self.cur = bc.cur.clone();
        self.p_used.truncate(bc.p_used_len);
        self.n_used.truncate(bc.n_used_len);
        self.bcontext_active = true;
        self.stats.state_restores += 1;
    }

    /// Dependency-directed backtracking. Returns true iff the clash
    /// survives to the initial level, i.e. the test concept is UNSAT.
    fn tuned_restore(&mut self) -> bool {
        loop {
            let level = if self.config.reasoning.use_backjumping {
                self.clash_set.max_level()
            } else {
                self.try_level.saturating_sub(1)
            };
            if level == 0 {
                return true;
            }

            // levels above the jump target contributed nothing: drop them
            while let Some(bc) = self.stack.last() {
                if bc.level > level {
                    self.stack.pop();
                } else {
                    break;
                }
            }
            let Some(bc) = self.stack.last() else {
                return true;
            };
            // with backjumping off, the clash may point below the top BC
            let level = bc.level.min(level);

            self.restore_to(level);
            let clash = self.clash_set.clone();
            let bc = self.stack.last_mut().expect("stack vanished after restore");
            bc.branch_dep = bc.branch_dep.union(&clash);

            if matches!(bc.alternatives, BcAlternatives::Barrier) {
                // the query part is exhausted; told facts cannot be undone
                return true;
            }
            if bc.has_next_option() {
                return false;
            }

            // exhausted: propagate the accumulated dep-set upward, without
            // this decision's own level
            self.clash_set = bc.branch_dep.restricted_below(level);
            self.stack.pop();
            self.bcontext_active = false;
        }
    }

    /// Chronological backtrack used by the fairness sweep, where there is
    /// no clash-set to follow
    fn straightforward_restore(&mut self) -> bool {
        while let Some(bc) = self.stack.last() {
            let level = bc.level;
            if matches!(bc.alternatives, BcAlternatives::Barrier) {
                return true;
            }
            self.restore_to(level);
            let bc = self.stack.last().expect("stack vanished after restore");
            if bc.has_next_option() {
                return false;
            }
            self.stack.pop();
            self.bcontext_active = false;
        }
        true
    }

    //-------------------------------------------------------------------
    // label insertion
    //-------------------------------------------------------------------

    /// Add a concept to a node label and queue it for expansion.
    ///
    /// TOP is a no-op; BOTTOM is an immediate clash at `dep`; collections
    /// expand in place like conjunctions.
    pub(crate) fn add_todo_entry(&mut self, node: NodeId, bp: Bp, dep: &DepSet) -> TacticUsage {
        if bp == Bp::TOP {
            return TacticUsage::Unusable;
        }
        if bp == Bp::BOTTOM {
            self.set_clash(dep.clone());
            return TacticUsage::Clash;
        }

        let vertex = self.dag.get(bp);
        // collections never appear in node labels
        if let DagVertex::Collection { children } = vertex {
            if !bp.is_positive() {
                return TacticUsage::Unusable;
            }
            let children = children.clone();
            for child in children {
                if self.add_todo_entry(node, child, dep) == TacticUsage::Clash {
                    return TacticUsage::Clash;
                }
            }
            return TacticUsage::Done;
        }

        let complex = matches!(
            vertex,
            DagVertex::Forall { .. }
                | DagVertex::AtMost { .. }
                | DagVertex::SelfRef { .. }
                | DagVertex::Proj { .. }
        );

        match self.try_add_concept(node, bp, dep, complex) {
            AddConceptResult::Exist => TacticUsage::Unusable,
            AddConceptResult::Clash => TacticUsage::Clash,
            AddConceptResult::Done => self.insert_todo_entry(node, bp, dep, complex),
        }
    }

    /// Probe the label half for `bp` or its negation, using the session's
    /// used-concept sets to skip impossible scans
    fn try_add_concept(
        &mut self,
        node: NodeId,
        bp: Bp,
        dep: &DepSet,
        complex: bool,
    ) -> AddConceptResult {
        let can_c = self.is_used(bp);
        let can_neg = self.is_used(bp.inverse());
        if !can_c && !can_neg {
            return AddConceptResult::Done;
        }

        let inv = bp.inverse();
        let mut clash: Option<DepSet> = None;
        let mut exists = false;
        for entry in self.cgraph.node(node).label().half(complex) {
            if can_c && entry.bp == bp {
                exists = true;
                break;
            }
            if can_neg && entry.bp == inv {
                clash = Some(dep.union(&entry.dep));
                break;
            }
        }
        if exists {
            return AddConceptResult::Exist;
        }
        if let Some(clash) = clash {
            self.set_clash(clash);
            return AddConceptResult::Clash;
        }
        AddConceptResult::Done
    }

    fn insert_todo_entry(
        &mut self,
        node: NodeId,
        bp: Bp,
        dep: &DepSet,
        complex: bool,
    ) -> TacticUsage {
        let offset = self
            .cgraph
            .add_concept(node, ConceptWDep::new(bp, dep.clone()), complex);
        self.set_used(bp);

        if self.cgraph.node(node).is_cached() {
            let ret = self.correct_cached_entry(node);
            return if ret == TacticUsage::Unusable {
                TacticUsage::Done
            } else {
                ret
            };
        }

        let kind = self.entry_kind(node, bp);
        self.todo.add_entry(node, complex, offset, kind);

        if self.cgraph.node(node).is_data_node() {
            return self.check_data_node(node);
        }
        TacticUsage::Done
    }

    fn is_used(&self, bp: Bp) -> bool {
        if bp.is_positive() {
            self.p_used.contains(bp)
        } else {
            self.n_used.contains(bp)
        }
    }

    fn set_used(&mut self, bp: Bp) {
        if bp.is_positive() {
            self.p_used.insert(bp);
        } else {
            self.n_used.insert(bp);
        }
    }

    /// Queue bucket for a label entry
    fn entry_kind(&self, node: NodeId, bp: Bp) -> EntryKind {
        let positive = bp.is_positive();
        match self.dag.get(bp) {
            DagVertex::Concept { .. } | DagVertex::Singleton { .. } => EntryKind::Id,
            DagVertex::And { .. } => {
                if positive {
                    EntryKind::And
                } else {
                    EntryKind::Or
                }
            }
            DagVertex::Forall { .. } => {
                if positive {
                    EntryKind::Forall
                } else {
                    EntryKind::Exists
                }
            }
            DagVertex::AtMost { .. } => {
                if !positive {
                    EntryKind::Exists
                } else if self.cgraph.node(node).is_nominal() {
                    EntryKind::Nn
                } else {
                    EntryKind::Le
                }
            }
            DagVertex::SelfRef { .. } | DagVertex::Proj { .. } => EntryKind::Forall,
            _ => EntryKind::Id,
        }
    }

    /// Run the interval reasoner over a data node's simple label
    fn check_data_node(&mut self, node: NodeId) -> TacticUsage {
        self.dtr.clear();
        let entries: Vec<ConceptWDep> = self.cgraph.node(node).label().simple.to_vec();
        for entry in &entries {
            let vertex = self.dag.get(entry.bp);
            if self.dtr.add_entry(vertex, entry.bp.is_positive(), &entry.dep) {
                let clash = self.dtr.clash_set().clone();
                self.set_clash(clash);
                return TacticUsage::Clash;
            }
        }
        if self.dtr.check_clash() {
            let clash = self.dtr.clash_set().clone();
            self.set_clash(clash);
            return TacticUsage::Clash;
        }
        TacticUsage::Done
    }

    //-------------------------------------------------------------------
    // edges and merging
    //-------------------------------------------------------------------

    /// Consequences of a fresh role label `from --role--> to`: domains and
    /// ranges, irreflexivity, functional merging, and re-queueing of the
    /// quantified entries that may now fire across the new edge
    pub(crate) fn setup_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        role: RoleId,
        dep: &DepSet,
    ) -> TacticUsage {
        for d in self.roles.domain(role).to_vec() {
            if self.add_todo_entry(from, d, dep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
        }
        for r in self.roles.range(role).to_vec() {
            if self.add_todo_entry(to, r, dep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
        }

        if self.cgraph.resolve(from) == self.cgraph.resolve(to)
            && self.reflexivity_clash(from, role, dep) == TacticUsage::Clash
        {
            return TacticUsage::Clash;
        }

        // told-disjoint roles labelling the same pair of nodes
        for (m, other, odep) in self.cgraph.edge_labels_at(from) {
            if m == to && other != role && self.roles.are_disjoint(other, role) {
                self.set_clash(dep.union(&odep));
                return TacticUsage::Clash;
            }
        }

        if self.apply_functional(from, role, dep) == TacticUsage::Clash {
            return TacticUsage::Clash;
        }
        if self.apply_functional(to, role.inverse(), dep) == TacticUsage::Clash {
            return TacticUsage::Clash;
        }

        self.requeue_complex(from);
        self.requeue_complex(to);
        TacticUsage::Done
    }

    /// A self-loop over an irreflexive role or a negated-self entry
    fn reflexivity_clash(&mut self, node: NodeId, role: RoleId, dep: &DepSet) -> TacticUsage {
        if self.roles.role(role).is_irreflexive() {
            self.set_clash(dep.clone());
            return TacticUsage::Clash;
        }
        let entries: Vec<ConceptWDep> = self.cgraph.node(node).label().complex.to_vec();
        for entry in entries {
            if entry.bp.is_positive() {
                continue;
            }
            if let DagVertex::SelfRef { role: forbidden } = self.dag.get(entry.bp) {
                if self.roles.is_subrole(role, *forbidden) {
                    self.set_clash(dep.union(&entry.dep));
                    return TacticUsage::Clash;
                }
            }
        }
        TacticUsage::Done
    }

    /// Deterministic at-most-one merging over functional super-roles
    fn apply_functional(&mut self, node: NodeId, role: RoleId, dep: &DepSet) -> TacticUsage {
        for f in self.roles.ancestors(role).collect::<Vec<_>>() {
            if !self.roles.is_functional(f) {
                continue;
            }
            loop {
                let neighbours = self.cgraph.neighbours(node, f, self.roles);
                if neighbours.len() < 2 {
                    break;
                }
                let (keep, kdep) = neighbours[0].clone();
                let (victim, vdep) = neighbours[1].clone();
                // merge toward the nominal or elder node
                let (victim, keep) = if self.cgraph.node(victim).is_nominal()
                    && !self.cgraph.node(keep).is_nominal()
                {
                    (keep, victim)
                } else {
                    (victim, keep)
                };
                let merge_dep = dep.union(&kdep).union(&vdep);
                self.stats.merges += 1;
                if self.merge_nodes(victim, keep, merge_dep) == TacticUsage::Clash {
                    return TacticUsage::Clash;
                }
            }
        }
        TacticUsage::Done
    }

    /// Merge `from` into `to`: purge, retarget edges, and replay the purged
    /// label through the clash-checking insertion path
    pub(crate) fn merge_nodes(&mut self, from: NodeId, to: NodeId, dep: DepSet) -> TacticUsage {
        debug_assert!(from != to);
        if let Some(ineq) = self.cgraph.node(from).inequal_to(to) {
            self.set_clash(dep.union(ineq));
            return TacticUsage::Clash;
        }

        // advisory same-individual record for nominal pairs
        if self.cgraph.node(from).is_nominal() && self.cgraph.node(to).is_nominal() {
            if let (Some(a), Some(b)) = (self.nominal_name(from), self.nominal_name(to)) {
                self.same_individuals.push((a, b));
            }
        }

        let inequalities: Vec<(NodeId, DepSet)> = self.cgraph.node(from).inequal.clone();
        let entries: Vec<ConceptWDep> = self
            .cgraph
            .node(from)
            .label()
            .iter()
            .cloned()
            .collect();

        self.cgraph.merge(from, to, &dep);

        for entry in entries {
            if self.add_todo_entry(to, entry.bp, &entry.dep.union(&dep)) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
        }
        for (other, idep) in inequalities {
            let other = self.cgraph.resolve(other);
            if other == to {
                self.set_clash(dep.union(&idep));
                return TacticUsage::Clash;
            }
            self.cgraph.add_inequality(to, other, &idep.union(&dep));
        }

        // the survivor picked up the victim's edges
        self.requeue_complex(to);
        if self.apply_functional_all(to, &dep) == TacticUsage::Clash {
            return TacticUsage::Clash;
        }
        TacticUsage::Done
    }

    /// Re-check functional constraints over every role on the node's edges
    fn apply_functional_all(&mut self, node: NodeId, dep: &DepSet) -> TacticUsage {
        let labels = self.cgraph.edge_labels_at(node);
        for (_, role, _) in labels {
            if self.apply_functional(node, role, dep) == TacticUsage::Clash {
                return TacticUsage::Clash;
            }
        }
        TacticUsage::Done
    }

    fn nominal_name(&self, node: NodeId) -> Option<String> {
        self.cgraph.node(node).label().simple.iter().find_map(|e| {
            if let DagVertex::Singleton { name, .. } = self.dag.get(e.bp) {
                e.bp.is_positive().then(|| name.clone())
            } else {
                None
            }
        })
    }

    /// Re-queue the quantified label entries of a node after its edge set
    /// changed; tactics are idempotent, so duplicates are harmless
    pub(crate) fn requeue_complex(&mut self, node: NodeId) {
        let kinds: Vec<(usize, EntryKind)> = self
            .cgraph
            .node(node)
            .label()
            .complex
            .iter()
            .enumerate()
            .map(|(offset, e)| (offset, self.entry_kind(node, e.bp)))
            .collect();
        for (offset, kind) in kinds {
            self.todo.add_entry(node, true, offset, kind);
        }
    }

    /// Re-queue everything on a node, used when it loses its blocker or
    /// its cached approximation
    pub(crate) fn requeue_all(&mut self, node: NodeId) {
        let entries: Vec<(bool, usize, EntryKind)> = {
            let label = self.cgraph.node(node).label();
            let simple = label
                .simple
                .iter()
                .enumerate()
                .map(|(o, e)| (false, o, self.entry_kind(node, e.bp)));
            let complex = label
                .complex
                .iter()
                .enumerate()
                .map(|(o, e)| (true, o, self.entry_kind(node, e.bp)));
            simple.chain(complex).collect()
        };
        for (complex, offset, kind) in entries {
            self.todo.add_entry(node, complex, offset, kind);
        }
    }

    //-------------------------------------------------------------------
    // model-cache support
    //-------------------------------------------------------------------

    /// Get or build the model cache for a DAG pointer, recursively caching
    /// the sub-DAG first. The in-process set spans the whole cascade, so a
    /// cyclic concept comes back to its own pending entry and is built
    /// without the cyclic sub-part.
    pub fn create_cache(&mut self, bp: Bp) -> Result<Arc<ModelCache>, ReasoningError> {
        if let Some(cache) = self.caches.get(bp) {
            return Ok(Arc::clone(cache));
        }
        self.prepare_cascaded_cache(bp)?;
        // a cycle may have filled the slot already
        if let Some(cache) = self.caches.get(bp) {
            return Ok(Arc::clone(cache));
        }
        let cache = self.build_cache(bp)?;
        Ok(self.caches.set(bp, cache))
    }

    fn prepare_cascaded_cache(&mut self, bp: Bp) -> Result<(), ReasoningError> {
        if self.in_process.contains(&bp) {
            // cycle: proceed without caching the cyclic sub-part
            log::debug!("cyclic reference through {} while caching", self.dag.describe(bp));
            return Ok(());
        }
        if self.caches.get(bp).is_some() {
            return Ok(());
        }
        let positive = bp.is_positive();
        match self.dag.get(bp).clone() {
            DagVertex::Top
            | DagVertex::DataType { .. }
            | DagVertex::DataValue { .. }
            | DagVertex::DataExpr { .. }
            | DagVertex::SelfRef { .. }
            | DagVertex::Proj { .. } => {}
            DagVertex::And { children } | DagVertex::Collection { children } => {
                for q in children {
                    let q = if positive { q } else { q.inverse() };
                    self.prepare_cascaded_cache(q)?;
                }
            }
            DagVertex::Concept {
                primitive,
                definition,
                ..
            } => {
                // a negated primitive name has nothing to unfold
                if !positive && primitive {
                    return Ok(());
                }
                if definition.is_valid() {
                    self.in_process.insert(bp);
                    let d = if positive {
                        definition
                    } else {
                        definition.inverse()
                    };
                    self.prepare_cascaded_cache(d)?;
                    self.in_process.remove(&bp);
                }
            }
            DagVertex::Singleton { definition, .. } => {
                if definition.is_valid() {
                    self.in_process.insert(bp);
                    let d = if positive {
                        definition
                    } else {
                        definition.inverse()
                    };
                    self.prepare_cascaded_cache(d)?;
                    self.in_process.remove(&bp);
                }
            }
            DagVertex::Forall { role, concept } | DagVertex::AtMost { role, concept, .. } => {
                if self.roles.role(role).is_data() {
                    return Ok(());
                }
                let filler = if positive { concept } else { concept.inverse() };
                if filler.is_valid() && filler != Bp::TOP {
                    self.in_process.insert(filler);
                    self.create_cache(filler)?;
                    self.in_process.remove(&filler);
                }
                for r in self.roles.range(role).to_vec() {
                    if r != Bp::TOP {
                        self.in_process.insert(r);
                        self.create_cache(r)?;
                        self.in_process.remove(&r);
                    }
                }
            }
        }
        Ok(())
    }

    /// Run a dedicated SAT test for the pointer and summarise the outcome
    fn build_cache(&mut self, bp: Bp) -> Result<ModelCache, ReasoningError> {
        log::debug!("building model cache for {}", self.dag.describe(bp));
        let sat = self.run_sat(bp)?;
        if !sat {
            log::debug!("DAG entry {} is unsatisfiable", self.dag.describe(bp));
        }
        Ok(self.build_cache_by_cgraph(sat))
    }

    /// Summarise the current completion graph into a model cache
    pub fn build_cache_by_cgraph(&self, sat: bool) -> ModelCache {
        if !sat {
            return ModelCache::invalid();
        }
        let mut builder = ModelCache::builder();
        let root = NodeId(0);
        let root_node = self.cgraph.node(self.cgraph.resolve(root));
        for entry in root_node.label().iter() {
            builder.add_concept(entry.bp);
            match self.dag.get(entry.bp) {
                DagVertex::Forall { role, .. } | DagVertex::AtMost { role, .. } => {
                    builder.add_constrained_role(*role);
                }
                _ => {}
            }
        }
        for (_, role, _) in self.cgraph.edge_labels_at(root_node.id()) {
            builder.add_existing_role(role, self.roles);
        }
        if self.cgraph.size() > 1 {
            builder.mark_deep();
        }
        builder.finish()
    }

    /// Check whether every label element of a node carries a cache, making
    /// the node cacheable at all
    fn can_be_cached(&mut self, node: NodeId) -> bool {
        let n = self.cgraph.node(node);
        if n.is_nominal() || n.is_data_node() {
            return false;
        }
        self.stats.cache_tries += 1;
        let mut shallow = true;
        let mut size = 0;
        for entry in n.label().iter() {
            match self.caches.get(entry.bp) {
                None => return false,
                Some(cache) => {
                    shallow &= cache.is_shallow();
                    size += 1;
                }
            }
        }
        // a label summarised only by shallow caches tells us nothing
        !(shallow && size != 0)
    }

    /// Merge the label element caches; it is known that all exist
    fn do_cache_node(&mut self, node: NodeId) -> ModelCache {
        let mut acc = ModelCache::empty();
        let mut dep = DepSet::empty();
        let entries: Vec<ConceptWDep> =
            self.cgraph.node(node).label().iter().cloned().collect();
        for entry in entries {
            dep = dep.union(&entry.dep);
            let element = self
                .caches
                .get(entry.bp)
                .expect("can_be_cached checked cache presence")
                .clone();
            match acc.merge(&element) {
                CacheState::Valid => {}
                CacheState::Invalid => {
                    self.set_clash(dep);
                    return acc;
                }
                _ => return acc,
            }
        }
        // fold in the single incoming arc, if the node has one
        let n = self.cgraph.node(node);
        if let Some(parent) = n.parent() {
            let incoming = self
                .cgraph
                .edge_labels_at(node)
                .into_iter()
                .find(|(m, _, _)| *m == parent);
            if let Some((_, role, _)) = incoming {
                let parent_cache = ModelCache::from_parent_edge(role.inverse(), self.roles);
                acc.merge(&parent_cache);
            }
        }
        acc
    }

    /// Try to approximate a node by its model cache instead of expanding it
    pub(crate) fn try_cache_node(&mut self, node: NodeId) -> TacticUsage {
        if !self.use_dag_cache || !self.can_be_cached(node) {
            self.cgraph.set_cached(node, false);
            return TacticUsage::Unusable;
        }
        let cache = self.do_cache_node(node);
        match cache.state() {
            CacheState::Valid => {
                self.stats.cached_sat += 1;
                self.cgraph.set_cached(node, true);
                TacticUsage::Done
            }
            CacheState::Invalid => {
                self.stats.cached_unsat += 1;
                TacticUsage::Clash
            }
            CacheState::Failed | CacheState::Unknown => TacticUsage::Unusable,
        }
    }

    /// A concept reached a cached node: re-validate the approximation, or
    /// wake the node up and expand it for real
    fn correct_cached_entry(&mut self, node: NodeId) -> TacticUsage {
        debug_assert!(self.cgraph.node(node).is_cached());
        let ret = self.try_cache_node(node);
        if ret == TacticUsage::Unusable {
            self.cgraph.set_cached(node, false);
            self.requeue_all(node);
        }
        ret
    }
}
