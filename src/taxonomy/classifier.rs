//! Two-Phase Classification
//!
//! Concepts classify one at a time. Told subsumers classify first, driven
//! by a wait stack; a told-subsumer cycle collapses into one synonym vertex
//! with a warning. The actual placement runs a top-down phase from ⊤ (find
//! the most specific subsumers) and a bottom-up phase from ⊥ (find the most
//! general subsumees), pruning with taxonomy monotonicity and told hints so
//! most candidate tests never reach the tableau.

use super::{Taxonomy, VertexId};
use crate::dag::Bp;
use crate::kb::{ConceptId, ConceptInfo};
use crate::reasoner::ReasoningError;
use crate::tableau::SatTester;
use std::collections::{HashMap, HashSet, VecDeque};

/// Per-concept classification callbacks; returning false cancels the run
pub trait ProgressMonitor {
    fn concept_classified(&mut self, name: &str, current: usize, total: usize) -> bool {
        let _ = (name, current, total);
        true
    }
}

/// Monitor that never cancels
pub struct NullMonitor;

impl ProgressMonitor for NullMonitor {}

/// Builds a taxonomy over one knowledge base view
pub struct Classifier<'a> {
    tester: SatTester<'a>,
    concepts: &'a [ConceptInfo],
    disjoint_pairs: &'a HashSet<(ConceptId, ConceptId)>,
    use_completely_defined: bool,
    taxonomy: Taxonomy,
    n_classified: usize,
    n_sat_tests: u64,
}

impl<'a> Classifier<'a> {
    pub fn new(
        tester: SatTester<'a>,
        concepts: &'a [ConceptInfo],
        disjoint_pairs: &'a HashSet<(ConceptId, ConceptId)>,
        use_completely_defined: bool,
    ) -> Self {
        Classifier {
            tester,
            concepts,
            disjoint_pairs,
            use_completely_defined,
            taxonomy: Taxonomy::new(),
            n_classified: 0,
            n_sat_tests: 0,
        }
    }

    /// Classify every concept in `order` and return the finished taxonomy
    pub fn classify(
        mut self,
        order: &[ConceptId],
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<Taxonomy, ReasoningError> {
        let total = order.len();
        for &p in order {
            self.classify_entry(p)?;
            if !monitor.concept_classified(&self.concepts[p].name, self.n_classified, total) {
                return Err(ReasoningError::Cancelled);
            }
        }
        log::info!(
            "classified {} concepts with {} subsumption tests",
            self.n_classified,
            self.n_sat_tests
        );
        Ok(self.taxonomy)
    }

    fn is_classified(&self, c: ConceptId) -> bool {
        self.taxonomy.vertex_of_concept(c).is_some()
    }

    /// Told-subsumer-driven scheduling for one concept
    fn classify_entry(&mut self, p: ConceptId) -> Result<(), ReasoningError> {
        if self.is_classified(p) {
            return Ok(());
        }
        let mut wait_stack: Vec<ConceptId> = vec![p];
        while let Some(&top) = wait_stack.last() {
            let pending = self.concepts[top]
                .told_subsumers
                .iter()
                .copied()
                .find(|&ts| !self.is_classified(ts));
            match pending {
                Some(ts) if wait_stack.contains(&ts) => {
                    self.classify_cycle(&mut wait_stack, ts)?;
                }
                Some(ts) => wait_stack.push(ts),
                None => {
                    self.do_classification(top)?;
                    self.n_classified += 1;
                    wait_stack.pop();
                }
            }
        }
        Ok(())
    }

    /// A told-subsumer cycle: every member becomes a synonym of the first.
    /// Rejected only when a told disjointness over two members would make
    /// the collapse contradictory.
    fn classify_cycle(
        &mut self,
        wait_stack: &mut Vec<ConceptId>,
        head: ConceptId,
    ) -> Result<(), ReasoningError> {
        let pos = wait_stack
            .iter()
            .position(|&c| c == head)
            .expect("cycle head is on the stack");
        let cycle: Vec<ConceptId> = wait_stack.split_off(pos);

        let names: Vec<&str> = cycle.iter().map(|&c| self.concepts[c].name.as_str()).collect();
        log::warn!("concept definition cycle found: {}", names.join(", "));

        for (i, &a) in cycle.iter().enumerate() {
            for &b in &cycle[i + 1..] {
                if self.disjoint_pairs.contains(&(a.min(b), a.max(b))) {
                    return Err(ReasoningError::InconsistentKb);
                }
            }
        }

        self.do_classification(head)?;
        self.n_classified += 1;
        let vertex = self
            .taxonomy
            .vertex_of_concept(head)
            .expect("cycle head was just classified");
        for &c in cycle.iter().skip(1) {
            self.taxonomy.add_to_vertex(vertex, c);
            self.n_classified += 1;
        }
        Ok(())
    }

    fn primer_bp(&self, v: VertexId) -> Bp {
        match v {
            Taxonomy::TOP => Bp::TOP,
            Taxonomy::BOTTOM => Bp::BOTTOM,
            _ => {
                let primer = self.taxonomy.vertex(v).synonyms[0];
                self.concepts[primer].pname
            }
        }
    }

    /// Place one concept whose told subsumers are all classified
    fn do_classification(&mut self, p: ConceptId) -> Result<(), ReasoningError> {
        log::debug!("classifying {}", self.concepts[p].name);
        let pbp = self.concepts[p].pname;

        // trivial placements first
        self.n_sat_tests += 1;
        if !self.tester.is_satisfiable(pbp)? {
            log::debug!("{} is unsatisfiable", self.concepts[p].name);
            self.taxonomy.add_to_vertex(Taxonomy::BOTTOM, p);
            return Ok(());
        }
        self.n_sat_tests += 1;
        if !self.tester.is_satisfiable(pbp.inverse())? {
            self.taxonomy.add_to_vertex(Taxonomy::TOP, p);
            return Ok(());
        }

        // subsumption valuations, seeded by the told hints
        let mut valued: HashMap<VertexId, bool> = HashMap::new();
        valued.insert(Taxonomy::TOP, true);
        valued.insert(Taxonomy::BOTTOM, false);
        let told_vertices: Vec<VertexId> = self.concepts[p]
            .told_subsumers
            .iter()
            .filter_map(|&ts| self.taxonomy.vertex_of_concept(ts))
            .collect();
        for &v in &told_vertices {
            valued.insert(v, true);
            for a in self.taxonomy.ancestors(v) {
                valued.insert(a, true);
            }
        }

        let parents = if self.use_completely_defined
            && self.concepts[p].completely_defined
            && !told_vertices.is_empty()
        {
            // told subsumers alone determine the parents
            self.non_redundant(&told_vertices)
        } else {
            self.top_down_phase(pbp, &mut valued)?
        };

        let children = self.bottom_up_phase(pbp)?;

        // equivalence with an existing vertex
        if let Some(&v) = parents.iter().find(|v| children.contains(v)) {
            log::debug!(
                "{} is a synonym of {}",
                self.concepts[p].name,
                self.taxonomy
                    .vertex(v)
                    .synonyms
                    .first()
                    .map_or("?", |&c| self.concepts[c].name.as_str())
            );
            self.taxonomy.add_to_vertex(v, p);
            return Ok(());
        }

        self.taxonomy.insert(p, parents, children);
        Ok(())
    }

    /// Drop told candidates that another candidate already lies below
    fn non_redundant(&self, candidates: &[VertexId]) -> Vec<VertexId> {
        let mut out = Vec::new();
        for &v in candidates {
            let redundant = candidates
                .iter()
                .any(|&w| w != v && self.taxonomy.ancestors(w).contains(&v));
            if !redundant && !out.contains(&v) {
                out.push(v);
            }
        }
        out
    }

    /// BFS from ⊤ over the children of known subsumers; the most specific
    /// subsumers become the parent candidates
    fn top_down_phase(
        &mut self,
        pbp: Bp,
        valued: &mut HashMap<VertexId, bool>,
    ) -> Result<Vec<VertexId>, ReasoningError> {
        let mut queue: VecDeque<VertexId> = VecDeque::new();
        let mut visited: HashSet<VertexId> = HashSet::new();
        let mut subsumers: Vec<VertexId> = vec![Taxonomy::TOP];
        queue.push_back(Taxonomy::TOP);
        visited.insert(Taxonomy::TOP);

        while let Some(v) = queue.pop_front() {
            for c in self.taxonomy.children(v).to_vec() {
                if !visited.insert(c) {
                    continue;
                }
                if self.subsumes_p(c, pbp, valued)? {
                    subsumers.push(c);
                    queue.push_back(c);
                }
            }
        }

        // most specific: no child is also a subsumer
        let subsumer_set: HashSet<VertexId> = subsumers.iter().copied().collect();
        Ok(subsumers
            .iter()
            .copied()
            .filter(|&v| {
                !self
                    .taxonomy
                    .children(v)
                    .iter()
                    .any(|c| subsumer_set.contains(c))
            })
            .collect())
    }

    /// Memoised `p ⊑ primer(v)` test
    fn subsumes_p(
        &mut self,
        v: VertexId,
        pbp: Bp,
        valued: &mut HashMap<VertexId, bool>,
    ) -> Result<bool, ReasoningError> {
        if let Some(&known) = valued.get(&v) {
            return Ok(known);
        }
        self.n_sat_tests += 1;
        let vbp = self.primer_bp(v);
        let result = !self.tester.run_sat_pair(pbp, vbp.inverse())?;
        valued.insert(v, result);
        if !result {
            // a non-subsumer prunes its descendants from being parents,
            // but they may still be tested; nothing more to record
            log::trace!("not subsumed by vertex {v}");
        }
        Ok(result)
    }

    /// BFS upward from ⊥ over vertices subsumed by `p`; the most general
    /// ones become the child candidates. Parent candidates are tested like
    /// any other vertex: one of them ending up here means `p` is equivalent
    /// to it, and the caller merges the two.
    fn bottom_up_phase(&mut self, pbp: Bp) -> Result<Vec<VertexId>, ReasoningError> {
        let mut subsumed: HashSet<VertexId> = HashSet::new();
        subsumed.insert(Taxonomy::BOTTOM);
        let mut memo: HashMap<VertexId, bool> = HashMap::new();
        memo.insert(Taxonomy::BOTTOM, true);
        memo.insert(Taxonomy::TOP, false);

        let mut queue: VecDeque<VertexId> = VecDeque::new();
        queue.push_back(Taxonomy::BOTTOM);
        while let Some(v) = queue.pop_front() {
            for &u in self.taxonomy.parents(v) {
                if memo.contains_key(&u) && !memo[&u] {
                    continue;
                }
                if subsumed.contains(&u) {
                    continue;
                }
                let below = match memo.get(&u) {
                    Some(&b) => b,
                    None => {
                        self.n_sat_tests += 1;
                        let ubp = self.primer_bp(u);
                        let b = !self.tester.run_sat_pair(ubp, pbp.inverse())?;
                        memo.insert(u, b);
                        b
                    }
                };
                if below {
                    subsumed.insert(u);
                    queue.push_back(u);
                }
            }
        }

        // most general: no parent is also subsumed
        Ok(subsumed
            .iter()
            .copied()
            .filter(|&v| {
                !self
                    .taxonomy
                    .parents(v)
                    .iter()
                    .any(|u| subsumed.contains(u))
            })
            .collect())
    }
}
