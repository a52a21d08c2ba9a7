//! # Tableaux Description Logic Reasoner
//!
//! A tableau-based reasoner for an expressive description logic: load
//! axioms, check consistency and satisfiability, classify the named
//! concepts into a taxonomy, and answer subsumption and instance queries.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Axioms (value API, no surface syntax)
//!     ↓
//! [Preprocessing]        → synonyms, GCI absorption, told subsumers
//!     ↓
//! [Internalisation]      → hash-consed concept DAG (bipolar pointers)
//!                          + closed role hierarchy
//!     ↓
//! [Tableau SAT engine]   → completion graph, prioritised ToDo queue,
//!                          dependency-directed backtracking, blocking,
//!                          datatype intervals, model caches
//!     ↓
//! [Classification]       → two-phase taxonomy (top-down, bottom-up)
//!     ↓
//! Queries: subsumption, instances, hierarchy navigation
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use tableaux::{Axiom, ConceptExpr, Reasoner};
//!
//! let mut reasoner = Reasoner::new();
//! reasoner.load_axiom(Axiom::ConceptInclusion {
//!     sub: ConceptExpr::name("A"),
//!     sup: ConceptExpr::name("B"),
//! }).unwrap();
//! reasoner.load_axiom(Axiom::ConceptInclusion {
//!     sub: ConceptExpr::name("B"),
//!     sup: ConceptExpr::name("C"),
//! }).unwrap();
//! reasoner.preprocess().unwrap();
//!
//! assert!(reasoner
//!     .is_subsumed_by(&ConceptExpr::name("A"), &ConceptExpr::name("C"))
//!     .unwrap());
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `deps` | Branch-level dependency sets for backjumping |
//! | `dag` | Hash-consed concept store addressed by bipolar pointers |
//! | `roles` | Role hierarchy with inverses, closure, simplicity |
//! | `datatypes` | Interval reasoning over concrete values |
//! | `graph` | Completion graph with journalled save/restore |
//! | `todo` | Priority-stratified expansion queue |
//! | `cache` | Model caches with merge semantics |
//! | `tableau` | The SAT engine: tactics, branching, blocking |
//! | `taxonomy` | Two-phase classification into a concept hierarchy |
//! | `preprocess` | Axiom normalisation, absorption, internalisation |
//! | `reasoner` | The public façade |

// Core data structures
pub mod dag;
pub mod datatypes;
pub mod deps;
pub mod graph;
pub mod roles;

// Reasoning machinery
pub mod cache;
pub mod tableau;
pub mod todo;

// Ontology handling
pub mod axiom;
pub mod expr;
pub mod kb;
pub mod preprocess;
pub mod taxonomy;

// Configuration and façade
pub mod config;
pub mod reasoner;

// Re-export the public surface
pub use axiom::Axiom;
pub use cache::{CacheState, ModelCache};
pub use config::{Config, ReasoningOptions};
pub use dag::{Bp, Dag, DagVertex};
pub use datatypes::{DataTypeKind, DataTypeReasoner, DataValue, Facet};
pub use deps::{BranchLevel, DepSet};
pub use expr::{ConceptExpr, DataRange, RoleExpr};
pub use kb::{KbStatus, KnowledgeBase};
pub use reasoner::{CancelHandle, Reasoner, ReasoningError, BOTTOM_NAME, TOP_NAME};
pub use roles::{RoleId, RoleMaster};
pub use tableau::{QueryGuard, ReasoningStats, SatTester};
pub use taxonomy::{
    NullMonitor, ProgressMonitor, Taxonomy, TaxonomySnapshot, VertexId,
};
pub use todo::{EntryKind, PriorityTable, ToDoQueue};
