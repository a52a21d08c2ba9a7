//! Configuration loading through figment.

use std::io::Write;
use tableaux::Config;

#[test]
fn defaults_enable_the_optimisations() {
    let config = Config::default();
    assert!(config.reasoning.use_semantic_branching);
    assert!(config.reasoning.use_backjumping);
    assert!(config.reasoning.use_lazy_blocking);
    assert!(config.reasoning.use_anywhere_blocking);
    assert!(config.reasoning.use_completely_defined);
    assert!(!config.reasoning.use_sorted_reasoning);
    assert!(config.reasoning.always_prefer_equals);
    assert_eq!(config.reasoning.test_timeout_ms, 0);
}

#[test]
fn toml_file_overrides_defaults() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    writeln!(
        file,
        "[reasoning]\nuse_backjumping = false\ntest_timeout_ms = 1234\n\n[priorities]\nor = 7\n"
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert!(!config.reasoning.use_backjumping);
    assert_eq!(config.reasoning.test_timeout_ms, 1234);
    assert_eq!(config.priorities.or, 7);
    // untouched sections keep their defaults
    assert!(config.reasoning.use_semantic_branching);
    assert_eq!(config.priorities.and, 1);
}

#[test]
fn partial_priority_table_fills_in() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    writeln!(file, "[priorities]\nnn = 0\nle = 9\n").unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.priorities.le, 9);
    assert_eq!(config.priorities.exists, 4);
}

#[test]
fn config_round_trips_through_toml() {
    let config = Config::default();
    let rendered = toml::to_string(&config).unwrap();
    let back: Config = toml::from_str(&rendered).unwrap();
    assert_eq!(
        back.reasoning.use_anywhere_blocking,
        config.reasoning.use_anywhere_blocking
    );
    assert_eq!(back.priorities.forall, config.priorities.forall);
}
