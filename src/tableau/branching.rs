//! Branching Contexts
//!
//! Every non-deterministic decision the tableau takes is recorded in a
//! branching context on the save stack: the kind of decision, the remaining
//! alternatives, the processing position at decision time, and the
//! accumulated dep-set of failed attempts. `restore` re-reads the position
//! from the context and advances to the next alternative.

use crate::dag::Bp;
use crate::deps::{BranchLevel, DepSet};
use crate::graph::{ConceptWDep, NodeId};

/// The alternatives of one decision
#[derive(Debug, Clone)]
pub enum BcAlternatives {
    /// Disjunction: one concept per disjunct
    Or { options: Vec<Bp> },
    /// Choose-rule: force `concept` or its negation onto a neighbour
    Choose { target: NodeId, concept: Bp },
    /// At-most violation: candidate pairs to merge, `(victim, survivor)`
    MaxMerge { pairs: Vec<(NodeId, NodeId)> },
    /// NN-rule: guess the number of fresh nominal successors, 1..=n
    Nn { n: u32 },
    /// Session boundary; carries no alternatives
    Barrier,
}

/// One entry of the save stack
#[derive(Debug, Clone)]
pub struct BranchingContext {
    /// The branch level this decision owns
    pub level: BranchLevel,
    /// Processing position when the decision was made
    pub cur: Option<(NodeId, ConceptWDep)>,
    /// Sizes of the used-concept sets at decision time
    pub p_used_len: usize,
    pub n_used_len: usize,
    /// Union of the clash-sets of all failed alternatives
    pub branch_dep: DepSet,
    pub alternatives: BcAlternatives,
    /// Index of the next alternative to try
    pub next_option: usize,
}

impl BranchingContext {
    pub fn option_count(&self) -> usize {
        match &self.alternatives {
            BcAlternatives::Or { options } => options.len(),
            BcAlternatives::Choose { .. } => 2,
            BcAlternatives::MaxMerge { pairs } => pairs.len(),
            BcAlternatives::Nn { n } => *n as usize,
            BcAlternatives::Barrier => 0,
        }
    }

    pub fn has_next_option(&self) -> bool {
        self.next_option < self.option_count()
    }
}
