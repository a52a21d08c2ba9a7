//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - tableaux.toml (default configuration)
//! - tableaux.local.toml (git-ignored local overrides)
//! - Environment variables (TABLEAUX_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # tableaux.toml
//! [reasoning]
//! use_semantic_branching = true
//! test_timeout_ms = 30000
//!
//! [priorities]
//! or = 2
//! exists = 4
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! TABLEAUX_REASONING__USE_BACKJUMPING=false
//! TABLEAUX_REASONING__TEST_TIMEOUT_MS=5000
//! ```

use crate::todo::PriorityTable;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reasoning: ReasoningOptions,

    /// ToDo-queue priority table, injected into the tableau at construction
    #[serde(default)]
    pub priorities: PriorityTable,
}

/// Tableau and classification switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningOptions {
    /// On a failed disjunct, assert its negation in the surviving branches
    #[serde(default = "default_true")]
    pub use_semantic_branching: bool,

    /// Jump straight to the deepest branch level in the clash-set instead
    /// of unwinding chronologically
    #[serde(default = "default_true")]
    pub use_backjumping: bool,

    /// Validate blocking lazily, just before declaring a model complete
    #[serde(default = "default_true")]
    pub use_lazy_blocking: bool,

    /// Allow any earlier node as a blocker, not only ancestors. Forced off
    /// when fairness constraints are present.
    #[serde(default = "default_true")]
    pub use_anywhere_blocking: bool,

    /// Classification shortcut for completely defined concepts: told
    /// subsumers alone determine the parents, no subsumption tests
    #[serde(default = "default_true")]
    pub use_completely_defined: bool,

    /// Process disjunction alternatives in DAG order
    #[serde(default)]
    pub use_sorted_reasoning: bool,

    /// Prefer turning `C = D` into a definition over a pair of inclusions
    /// when both readings are possible
    #[serde(default = "default_true")]
    pub always_prefer_equals: bool,

    /// Per-test budget in milliseconds; 0 disables the timeout
    #[serde(default)]
    pub test_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

impl Default for ReasoningOptions {
    fn default() -> Self {
        ReasoningOptions {
            use_semantic_branching: true,
            use_backjumping: true,
            use_lazy_blocking: true,
            use_anywhere_blocking: true,
            use_completely_defined: true,
            use_sorted_reasoning: false,
            always_prefer_equals: true,
            test_timeout_ms: 0,
        }
    }
}

impl Config {
    /// Load configuration from tableaux.toml, tableaux.local.toml, and
    /// TABLEAUX_* environment variables (later sources win)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("tableaux.toml"))
            .merge(Toml::file("tableaux.local.toml"))
            .merge(Env::prefixed("TABLEAUX_").split("__"))
            .extract()
    }

    /// Load configuration from a specific TOML file plus the environment
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("TABLEAUX_").split("__"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert!(config.reasoning.use_backjumping);
        assert!(config.reasoning.use_anywhere_blocking);
        assert_eq!(config.reasoning.test_timeout_ms, 0);
        // deterministic buckets drain before branching ones
        assert!(config.priorities.and < config.priorities.or);
        assert!(config.priorities.or < config.priorities.le);
    }
}
