//! Knowledge Base
//!
//! Holds everything an ontology internalises to: the concept and individual
//! registries, the DAG, the role hierarchy, the global assertion left over
//! from absorption, and the model-cache slots. Axioms accumulate while the
//! KB is loading; preprocessing locks it and later modifications are
//! rejected rather than silently invalidating published cache entries.

use crate::axiom::Axiom;
use crate::cache::ModelCacheRegistry;
use crate::config::Config;
use crate::dag::{Bp, Dag};
use crate::expr::ConceptExpr;
use crate::reasoner::ReasoningError;
use crate::roles::RoleMaster;
use crate::tableau::{AboxInit, ConsistencyExtra, QueryGuard, SatTester};
use crate::taxonomy::{Classifier, ProgressMonitor, Taxonomy};
use std::collections::{HashMap, HashSet};

/// Index into the concept registry
pub type ConceptId = usize;

/// One registered named concept
#[derive(Debug, Clone)]
pub struct ConceptInfo {
    pub name: String,
    /// The concept's own DAG pointer
    pub pname: Bp,
    /// Primitive concepts carry told inclusions; defined ones a definition
    pub primitive: bool,
    /// Accumulated told inclusions (right-hand sides of `name ⊑ …`)
    pub told_exprs: Vec<ConceptExpr>,
    /// The defining expression of a non-primitive concept
    pub definition_expr: Option<ConceptExpr>,
    /// Named concepts known to subsume this one, the classification hints
    pub told_subsumers: Vec<ConceptId>,
    pub synonym_of: Option<ConceptId>,
    /// The whole description is a conjunction of names
    pub completely_defined: bool,
}

/// One registered individual
#[derive(Debug, Clone)]
pub struct IndividualInfo {
    pub name: String,
    /// The nominal's DAG pointer
    pub pname: Bp,
    /// Raw asserted types; internalised during preprocessing
    pub types: Vec<ConceptExpr>,
    /// Internalised asserted types
    pub concept_bps: Vec<Bp>,
}

/// Lifecycle of the knowledge base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KbStatus {
    Loading,
    Preprocessed,
    Classified,
}

/// The internalised ontology plus all per-ontology reasoning state
pub struct KnowledgeBase {
    pub(crate) config: Config,
    pub(crate) dag: Dag,
    pub(crate) roles: RoleMaster,
    pub(crate) caches: ModelCacheRegistry,

    pub(crate) concepts: Vec<ConceptInfo>,
    pub(crate) concept_names: HashMap<String, ConceptId>,
    pub(crate) individuals: Vec<IndividualInfo>,
    pub(crate) individual_names: HashMap<String, usize>,

    /// Raw axioms until preprocessing consumes them
    pub(crate) axioms: Vec<Axiom>,
    /// Role-name aliases from equivalence and inverse axioms:
    /// `name → (canonical name, inverted)`
    pub(crate) role_aliases: HashMap<String, (String, bool)>,
    /// The internalised global assertion (`T_G`), TOP when fully absorbed
    pub(crate) gci_bp: Bp,
    pub(crate) fairness: Vec<Bp>,
    /// Told-disjoint concept pairs, consulted when a told-subsumer cycle
    /// is collapsed into synonyms
    pub(crate) disjoint_pairs: HashSet<(ConceptId, ConceptId)>,
    /// The preloaded ABox for nominal sessions
    pub(crate) abox: AboxInit,

    pub(crate) status: KbStatus,
    pub(crate) consistent: Option<bool>,
    pub(crate) taxonomy: Option<Taxonomy>,
    /// Nominal merges seen in the last consistency run; advisory only
    pub(crate) same_individuals_advisory: Vec<(String, String)>,
}

impl KnowledgeBase {
    pub fn new(config: Config) -> Self {
        KnowledgeBase {
            config,
            dag: Dag::new(),
            roles: RoleMaster::new(),
            caches: ModelCacheRegistry::new(),
            concepts: Vec::new(),
            concept_names: HashMap::new(),
            individuals: Vec::new(),
            individual_names: HashMap::new(),
            axioms: Vec::new(),
            role_aliases: HashMap::new(),
            gci_bp: Bp::TOP,
            fairness: Vec::new(),
            disjoint_pairs: HashSet::new(),
            abox: AboxInit::default(),
            status: KbStatus::Loading,
            consistent: None,
            taxonomy: None,
            same_individuals_advisory: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn status(&self) -> KbStatus {
        self.status
    }

    /// Queue an axiom; rejected once the KB is preprocessed
    pub fn add_axiom(&mut self, axiom: Axiom) -> Result<(), ReasoningError> {
        if self.status != KbStatus::Loading {
            return Err(ReasoningError::KbLocked);
        }
        self.axioms.push(axiom);
        Ok(())
    }

    /// Register (or fetch) a named concept. A name already used for a role
    /// or an individual is malformed input.
    pub(crate) fn concept_id(&mut self, name: &str) -> Result<ConceptId, ReasoningError> {
        if let Some(&id) = self.concept_names.get(name) {
            return Ok(id);
        }
        if self.roles.get(name).is_some() || self.individual_names.contains_key(name) {
            return Err(ReasoningError::MalformedInput {
                detail: format!("'{name}' is already used as a role or individual"),
            });
        }
        let pname = self.dag.named_concept(name, true);
        let id = self.concepts.len();
        self.concepts.push(ConceptInfo {
            name: name.to_string(),
            pname,
            primitive: true,
            told_exprs: Vec::new(),
            definition_expr: None,
            told_subsumers: Vec::new(),
            synonym_of: None,
            completely_defined: false,
        });
        self.concept_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Register (or fetch) an individual
    pub(crate) fn individual_id(&mut self, name: &str) -> Result<usize, ReasoningError> {
        if let Some(&id) = self.individual_names.get(name) {
            return Ok(id);
        }
        if self.roles.get(name).is_some() || self.concept_names.contains_key(name) {
            return Err(ReasoningError::MalformedInput {
                detail: format!("'{name}' is already used as a role or concept"),
            });
        }
        let pname = self.dag.named_singleton(name);
        let id = self.individuals.len();
        self.individuals.push(IndividualInfo {
            name: name.to_string(),
            pname,
            types: Vec::new(),
            concept_bps: Vec::new(),
        });
        self.individual_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Resolve a concept through the synonym chain
    pub(crate) fn resolve_synonym(&self, mut id: ConceptId) -> ConceptId {
        while let Some(next) = self.concepts[id].synonym_of {
            id = next;
        }
        id
    }

    pub fn has_individuals(&self) -> bool {
        !self.individuals.is_empty()
    }

    pub fn taxonomy(&self) -> Option<&Taxonomy> {
        self.taxonomy.as_ref()
    }

    /// A fresh tableau session over this KB
    pub(crate) fn tester(&mut self, guard: QueryGuard) -> SatTester<'_> {
        SatTester::new(
            &self.dag,
            &self.roles,
            &self.config,
            &mut self.caches,
            self.gci_bp,
            self.fairness.clone(),
            !self.individuals.is_empty(),
            guard,
        )
    }

    /// Satisfiability of an internalised pointer
    pub(crate) fn is_satisfiable_bp(
        &mut self,
        bp: Bp,
        guard: QueryGuard,
    ) -> Result<bool, ReasoningError> {
        let mut tester = self.tester(guard);
        tester.is_satisfiable(bp)
    }

    /// Subsumption `c ⊑ d`, tested as unsatisfiability of `c ⊓ ¬d`
    pub(crate) fn is_subsumed_bp(
        &mut self,
        c: Bp,
        d: Bp,
        guard: QueryGuard,
    ) -> Result<bool, ReasoningError> {
        if c == d || d == Bp::TOP || c == Bp::BOTTOM {
            return Ok(true);
        }
        let mut tester = self.tester(guard);
        Ok(!tester.run_sat_pair(c, d.inverse())?)
    }

    /// Consistency of the preloaded ABox, optionally with one extra
    /// concept forced somewhere or one extra inequality
    pub(crate) fn abox_consistent(
        &mut self,
        extra: ConsistencyExtra,
        extra_different: Option<(usize, usize)>,
        guard: QueryGuard,
    ) -> Result<bool, ReasoningError> {
        let mut abox = self.abox.clone();
        if let Some(pair) = extra_different {
            abox.different.push(pair);
        }
        let mut tester = SatTester::new(
            &self.dag,
            &self.roles,
            &self.config,
            &mut self.caches,
            self.gci_bp,
            self.fairness.clone(),
            true,
            guard,
        );
        let result = tester.run_consistency(&abox, extra);
        self.same_individuals_advisory = tester.same_individuals().to_vec();
        result
    }

    /// Build the concept taxonomy; idempotent once classified
    pub(crate) fn classify(
        &mut self,
        guard: QueryGuard,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<(), ReasoningError> {
        if self.taxonomy.is_some() {
            return Ok(());
        }
        let use_cd = self.config.reasoning.use_completely_defined;
        let order: Vec<ConceptId> = (0..self.concepts.len())
            .filter(|&i| self.concepts[i].synonym_of.is_none())
            .collect();
        let tester = SatTester::new(
            &self.dag,
            &self.roles,
            &self.config,
            &mut self.caches,
            self.gci_bp,
            self.fairness.clone(),
            !self.individuals.is_empty(),
            guard,
        );
        let classifier = Classifier::new(tester, &self.concepts, &self.disjoint_pairs, use_cd);
        let mut taxonomy = classifier.classify(&order, monitor)?;

        // synonyms discovered during preprocessing share their target's vertex
        for id in 0..self.concepts.len() {
            if self.concepts[id].synonym_of.is_some() {
                let target = self.resolve_synonym(id);
                if let Some(v) = taxonomy.vertex_of_concept(target) {
                    taxonomy.add_to_vertex(v, id);
                }
            }
        }
        self.taxonomy = Some(taxonomy);
        self.status = KbStatus::Classified;
        Ok(())
    }
}
