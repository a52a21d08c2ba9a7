//! Reasoner Façade
//!
//! The language-neutral surface callers talk to: load axioms, preprocess,
//! ask boolean queries, navigate the classified hierarchies, and control
//! timeout and cancellation. Clashes never surface here; only the error
//! taxonomy below escapes.
//!
//! ## Usage
//!
//! ```rust
//! use tableaux::{Axiom, ConceptExpr, Reasoner};
//!
//! let mut reasoner = Reasoner::new();
//! reasoner.load_axiom(Axiom::ConceptInclusion {
//!     sub: ConceptExpr::name("Cat"),
//!     sup: ConceptExpr::name("Animal"),
//! }).unwrap();
//! reasoner.preprocess().unwrap();
//!
//! assert!(reasoner.is_subsumed_by(
//!     &ConceptExpr::name("Cat"),
//!     &ConceptExpr::name("Animal"),
//! ).unwrap());
//! ```

use crate::axiom::Axiom;
use crate::config::Config;
use crate::dag::Bp;
use crate::expr::ConceptExpr;
use crate::kb::{KbStatus, KnowledgeBase};
use crate::preprocess;
use crate::roles::{RoleError, RoleId};
use crate::tableau::{ConsistencyExtra, QueryGuard};
use crate::taxonomy::{NullMonitor, ProgressMonitor, Taxonomy, TaxonomySnapshot, VertexId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Synonym-set names used for the builtin vertices
pub const TOP_NAME: &str = "*TOP*";
pub const BOTTOM_NAME: &str = "*BOTTOM*";

/// Everything that can go wrong at the reasoning surface
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReasoningError {
    /// A symbol used inconsistently, an unregistered name after locking,
    /// or a cardinality over a non-simple role
    #[error("malformed input: {detail}")]
    MalformedInput { detail: String },

    #[error("cycle in role inclusion involving '{role}'")]
    CycleInRoleInclusion { role: String },

    #[error("knowledge base is inconsistent")]
    InconsistentKb,

    #[error("query exceeded its {budget_ms} ms budget (ran for {elapsed_ms} ms)")]
    Timeout { budget_ms: u64, elapsed_ms: u64 },

    #[error("query cancelled")]
    Cancelled,

    /// Modification attempted after preprocessing locked the KB
    #[error("knowledge base is locked after preprocessing")]
    KbLocked,

    /// A broken invariant; indicates a bug, not a caller error
    #[error("internal invariant violated: {detail}")]
    Internal { detail: String },
}

impl From<RoleError> for ReasoningError {
    fn from(e: RoleError) -> Self {
        match e {
            RoleError::CycleInRoleInclusion { role } => {
                ReasoningError::CycleInRoleInclusion { role }
            }
            other => ReasoningError::MalformedInput {
                detail: other.to_string(),
            },
        }
    }
}

/// Cooperative cancellation for the query currently running
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A description-logic reasoner over one knowledge base
pub struct Reasoner {
    kb: KnowledgeBase,
    cancel_flag: Arc<AtomicBool>,
    timeout_ms: u64,
}

impl Reasoner {
    pub fn new() -> Self {
        Reasoner::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let timeout_ms = config.reasoning.test_timeout_ms;
        Reasoner {
            kb: KnowledgeBase::new(config),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            timeout_ms,
        }
    }

    pub fn config(&self) -> &Config {
        &self.kb.config
    }

    /// Queue an axiom; rejected once preprocessing has locked the KB
    pub fn load_axiom(&mut self, axiom: Axiom) -> Result<(), ReasoningError> {
        self.kb.add_axiom(axiom)
    }

    /// Normalise and internalise everything loaded so far; idempotent
    pub fn preprocess(&mut self) -> Result<(), ReasoningError> {
        preprocess::preprocess(&mut self.kb)
    }

    /// Per-query time budget in milliseconds; 0 disables it
    pub fn set_timeout(&mut self, ms: u64) {
        self.timeout_ms = ms;
    }

    /// Handle for cancelling the running query from another thread
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancel_flag),
        }
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    /// Fresh guard for one query; clears a stale cancellation
    fn guard(&self) -> QueryGuard {
        self.cancel_flag.store(false, Ordering::Relaxed);
        QueryGuard::new(self.timeout_ms, Arc::clone(&self.cancel_flag))
    }

    fn ensure_preprocessed(&mut self) -> Result<(), ReasoningError> {
        if self.kb.status() == KbStatus::Loading {
            self.preprocess()?;
        }
        Ok(())
    }

    fn intern(&mut self, expr: &ConceptExpr) -> Result<Bp, ReasoningError> {
        preprocess::intern_concept(&mut self.kb, expr, true)
    }

    //-------------------------------------------------------------------
    // boolean queries
    //-------------------------------------------------------------------

    /// Whether the knowledge base has a model
    pub fn is_consistent(&mut self) -> Result<bool, ReasoningError> {
        self.ensure_preprocessed()?;
        if let Some(known) = self.kb.consistent {
            return Ok(known);
        }
        let guard = self.guard();
        let consistent = if self.kb.has_individuals() {
            self.kb
                .abox_consistent(ConsistencyExtra::None, None, guard)?
        } else {
            self.kb.is_satisfiable_bp(Bp::TOP, guard)?
        };
        if !consistent {
            log::warn!("knowledge base is inconsistent");
        }
        self.kb.consistent = Some(consistent);
        Ok(consistent)
    }

    /// Satisfiability of a concept expression.
    /// Over an inconsistent KB every concept is unsatisfiable.
    pub fn is_satisfiable(&mut self, concept: &ConceptExpr) -> Result<bool, ReasoningError> {
        self.ensure_preprocessed()?;
        if !self.is_consistent()? {
            return Ok(false);
        }
        let bp = self.intern(concept)?;
        let guard = self.guard();
        if self.kb.has_individuals() {
            // nominal-aware satisfiability runs against the told ABox
            return self
                .kb
                .abox_consistent(ConsistencyExtra::OnFresh(bp), None, guard);
        }
        self.kb.is_satisfiable_bp(bp, guard)
    }

    /// `sub ⊑ sup`. Over an inconsistent KB every subsumption holds.
    pub fn is_subsumed_by(
        &mut self,
        sub: &ConceptExpr,
        sup: &ConceptExpr,
    ) -> Result<bool, ReasoningError> {
        self.ensure_preprocessed()?;
        if !self.is_consistent()? {
            return Ok(true);
        }
        let c = self.intern(sub)?;
        let d = self.intern(sup)?;
        let guard = self.guard();
        self.kb.is_subsumed_bp(c, d, guard)
    }

    /// Whether the two concepts can share no instance
    pub fn is_disjoint(
        &mut self,
        a: &ConceptExpr,
        b: &ConceptExpr,
    ) -> Result<bool, ReasoningError> {
        self.ensure_preprocessed()?;
        if !self.is_consistent()? {
            return Ok(true);
        }
        let abp = self.intern(a)?;
        let bbp = self.intern(b)?;
        let guard = self.guard();
        let mut tester = self.kb.tester(guard);
        Ok(!tester.run_sat_pair(abp, bbp)?)
    }

    /// Whether the individual is an instance of the concept
    pub fn is_instance(
        &mut self,
        individual: &str,
        concept: &ConceptExpr,
    ) -> Result<bool, ReasoningError> {
        self.ensure_preprocessed()?;
        if !self.is_consistent()? {
            return Ok(true);
        }
        let idx = self.individual_index(individual)?;
        let neg = self.intern(concept)?.inverse();
        let guard = self.guard();
        Ok(!self
            .kb
            .abox_consistent(ConsistencyExtra::OnIndividual(idx, neg), None, guard)?)
    }

    /// Whether two individuals denote the same element in every model
    pub fn is_same_individuals(&mut self, a: &str, b: &str) -> Result<bool, ReasoningError> {
        self.ensure_preprocessed()?;
        if !self.is_consistent()? {
            return Ok(true);
        }
        let ia = self.individual_index(a)?;
        let ib = self.individual_index(b)?;
        if ia == ib {
            return Ok(true);
        }
        let guard = self.guard();
        Ok(!self
            .kb
            .abox_consistent(ConsistencyExtra::None, Some((ia, ib)), guard)?)
    }

    //-------------------------------------------------------------------
    // classification and taxonomy navigation
    //-------------------------------------------------------------------

    /// Classify every named concept into the taxonomy
    pub fn classify(&mut self) -> Result<(), ReasoningError> {
        self.classify_with_monitor(&mut NullMonitor)
    }

    /// Classification with per-concept progress callbacks; the monitor may
    /// cancel between concepts
    pub fn classify_with_monitor(
        &mut self,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<(), ReasoningError> {
        self.ensure_preprocessed()?;
        if !self.is_consistent()? {
            return Err(ReasoningError::InconsistentKb);
        }
        let guard = self.guard();
        self.kb.classify(guard, monitor)
    }

    pub fn taxonomy(&self) -> Option<&Taxonomy> {
        self.kb.taxonomy()
    }

    /// Export the classified taxonomy as a versioned snapshot
    pub fn taxonomy_snapshot(&self) -> Option<TaxonomySnapshot> {
        let tax = self.kb.taxonomy()?;
        Some(tax.to_snapshot(|c| self.kb.concepts[c].name.clone()))
    }

    fn concept_vertex(&mut self, name: &str) -> Result<VertexId, ReasoningError> {
        self.classify()?;
        let id = *self
            .kb
            .concept_names
            .get(name)
            .ok_or_else(|| ReasoningError::MalformedInput {
                detail: format!("unregistered concept '{name}'"),
            })?;
        let id = self.kb.resolve_synonym(id);
        self.kb
            .taxonomy()
            .and_then(|t| t.vertex_of_concept(id))
            .ok_or_else(|| ReasoningError::Internal {
                detail: format!("concept '{name}' missing from the taxonomy"),
            })
    }

    fn vertex_names(&self, v: VertexId) -> Vec<String> {
        let tax = self.kb.taxonomy().expect("taxonomy present after classify");
        match v {
            Taxonomy::TOP if tax.vertex(v).synonyms.is_empty() => vec![TOP_NAME.to_string()],
            Taxonomy::BOTTOM if tax.vertex(v).synonyms.is_empty() => {
                vec![BOTTOM_NAME.to_string()]
            }
            _ => tax
                .vertex(v)
                .synonyms
                .iter()
                .map(|&c| self.kb.concepts[c].name.clone())
                .collect(),
        }
    }

    /// Direct subsumers: one synonym set per parent vertex
    pub fn parents(&mut self, concept: &str) -> Result<Vec<Vec<String>>, ReasoningError> {
        let v = self.concept_vertex(concept)?;
        let tax = self.kb.taxonomy().expect("classified");
        let parents = tax.parents(v).to_vec();
        Ok(parents.into_iter().map(|p| self.vertex_names(p)).collect())
    }

    /// Direct subsumees: one synonym set per child vertex
    pub fn children(&mut self, concept: &str) -> Result<Vec<Vec<String>>, ReasoningError> {
        let v = self.concept_vertex(concept)?;
        let tax = self.kb.taxonomy().expect("classified");
        let children = tax.children(v).to_vec();
        Ok(children.into_iter().map(|c| self.vertex_names(c)).collect())
    }

    /// All subsumers, transitively
    pub fn ancestors(&mut self, concept: &str) -> Result<Vec<Vec<String>>, ReasoningError> {
        let v = self.concept_vertex(concept)?;
        let tax = self.kb.taxonomy().expect("classified");
        let up = tax.ancestors(v);
        Ok(up.into_iter().map(|a| self.vertex_names(a)).collect())
    }

    /// All subsumees, transitively
    pub fn descendants(&mut self, concept: &str) -> Result<Vec<Vec<String>>, ReasoningError> {
        let v = self.concept_vertex(concept)?;
        let tax = self.kb.taxonomy().expect("classified");
        let down = tax.descendants(v);
        Ok(down.into_iter().map(|d| self.vertex_names(d)).collect())
    }

    /// Concepts equivalent to the given one, itself included
    pub fn equivalents(&mut self, concept: &str) -> Result<Vec<String>, ReasoningError> {
        let v = self.concept_vertex(concept)?;
        Ok(self.vertex_names(v))
    }

    //-------------------------------------------------------------------
    // role hierarchy navigation
    //-------------------------------------------------------------------

    fn role_id(&self, role: &str) -> Result<RoleId, ReasoningError> {
        self.kb
            .roles
            .get(role)
            .ok_or_else(|| ReasoningError::MalformedInput {
                detail: format!("unregistered role '{role}'"),
            })
    }

    pub fn role_parents(&mut self, role: &str) -> Result<Vec<String>, ReasoningError> {
        self.ensure_preprocessed()?;
        let id = self.role_id(role)?;
        Ok(self
            .kb
            .roles
            .parents(id)
            .into_iter()
            .map(|r| self.kb.roles.name_of(r))
            .collect())
    }

    pub fn role_children(&mut self, role: &str) -> Result<Vec<String>, ReasoningError> {
        self.ensure_preprocessed()?;
        let id = self.role_id(role)?;
        let down = self.kb.roles.descendants(id);
        Ok(down
            .into_iter()
            .filter(|r| self.kb.roles.parents(*r).contains(&id))
            .map(|r| self.kb.roles.name_of(r))
            .collect())
    }

    pub fn role_ancestors(&mut self, role: &str) -> Result<Vec<String>, ReasoningError> {
        self.ensure_preprocessed()?;
        let id = self.role_id(role)?;
        Ok(self
            .kb
            .roles
            .ancestors(id)
            .filter(|&r| r != id)
            .map(|r| self.kb.roles.name_of(r))
            .collect())
    }

    pub fn role_descendants(&mut self, role: &str) -> Result<Vec<String>, ReasoningError> {
        self.ensure_preprocessed()?;
        let id = self.role_id(role)?;
        Ok(self
            .kb
            .roles
            .descendants(id)
            .into_iter()
            .map(|r| self.kb.roles.name_of(r))
            .collect())
    }

    pub fn role_equivalents(&mut self, role: &str) -> Result<Vec<String>, ReasoningError> {
        self.ensure_preprocessed()?;
        let id = self.role_id(role)?;
        Ok(self
            .kb
            .roles
            .equivalents(id)
            .into_iter()
            .map(|r| self.kb.roles.name_of(r))
            .collect())
    }

    //-------------------------------------------------------------------
    // individual queries
    //-------------------------------------------------------------------

    fn individual_index(&self, name: &str) -> Result<usize, ReasoningError> {
        self.kb
            .individual_names
            .get(name)
            .copied()
            .ok_or_else(|| ReasoningError::MalformedInput {
                detail: format!("unregistered individual '{name}'"),
            })
    }

    /// Named concepts the individual provably belongs to, grouped by
    /// taxonomy vertex
    pub fn types(&mut self, individual: &str) -> Result<Vec<Vec<String>>, ReasoningError> {
        self.classify()?;
        let mut out = Vec::new();
        let vertex_count = self.kb.taxonomy().expect("classified").len();
        // walk down from ⊤: instance-of is monotone along subsumption
        let mut known: Vec<Option<bool>> = vec![None; vertex_count];
        known[Taxonomy::TOP] = Some(true);
        known[Taxonomy::BOTTOM] = Some(false);
        for v in 0..vertex_count {
            let primer = {
                let tax = self.kb.taxonomy().expect("classified");
                tax.vertex(v).synonyms.first().copied()
            };
            let Some(primer) = primer else { continue };
            let instance = match known[v] {
                Some(b) => b,
                None => {
                    let expr = ConceptExpr::Name(self.kb.concepts[primer].name.clone());
                    let b = self.is_instance(individual, &expr)?;
                    known[v] = Some(b);
                    b
                }
            };
            if instance {
                out.push(self.vertex_names(v));
                let ancestors = self.kb.taxonomy().expect("classified").ancestors(v);
                for a in ancestors {
                    known[a] = Some(true);
                }
            }
        }
        Ok(out)
    }

    /// Individuals provably belonging to the concept
    pub fn instances(&mut self, concept: &ConceptExpr) -> Result<Vec<String>, ReasoningError> {
        self.ensure_preprocessed()?;
        let names: Vec<String> = self.kb.individuals.iter().map(|i| i.name.clone()).collect();
        let mut out = Vec::new();
        for name in names {
            if self.is_instance(&name, concept)? {
                out.push(name);
            }
        }
        Ok(out)
    }

    /// Told fillers of `role` at `individual`, sub-roles included
    pub fn role_fillers(
        &mut self,
        individual: &str,
        role: &str,
    ) -> Result<Vec<String>, ReasoningError> {
        self.ensure_preprocessed()?;
        let idx = self.individual_index(individual)?;
        let id = self.role_id(role)?;
        let mut out = Vec::new();
        for &(s, r, o) in &self.kb.abox.role_links {
            if s == idx && self.kb.roles.is_subrole(r, id) {
                out.push(self.kb.individuals[o].name.clone());
            }
            if o == idx && self.kb.roles.is_subrole(r.inverse(), id) {
                out.push(self.kb.individuals[s].name.clone());
            }
        }
        out.dedup();
        Ok(out)
    }

    /// Told pairs related by `role`, sub-roles included
    pub fn related_individuals(
        &mut self,
        role: &str,
    ) -> Result<Vec<(String, String)>, ReasoningError> {
        self.ensure_preprocessed()?;
        let id = self.role_id(role)?;
        let mut out = Vec::new();
        for &(s, r, o) in &self.kb.abox.role_links {
            let (s, o) = if self.kb.roles.is_subrole(r, id) {
                (s, o)
            } else if self.kb.roles.is_subrole(r.inverse(), id) {
                (o, s)
            } else {
                continue;
            };
            out.push((
                self.kb.individuals[s].name.clone(),
                self.kb.individuals[o].name.clone(),
            ));
        }
        Ok(out)
    }

    /// Nominal merges recorded during the last consistency check.
    /// Advisory only: use [`Reasoner::is_same_individuals`] for answers.
    pub fn same_individuals_advisory(&self) -> &[(String, String)] {
        &self.kb.same_individuals_advisory
    }
}

impl Default for Reasoner {
    fn default() -> Self {
        Reasoner::new()
    }
}
