//! Direct tableau-session behaviour: reflexive loops, guards, statistics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tableaux::cache::ModelCacheRegistry;
use tableaux::{Bp, Config, Dag, QueryGuard, ReasoningError, RoleMaster, SatTester};

#[test]
fn reflexive_roles_put_a_loop_on_every_node() {
    let mut dag = Dag::new();
    let mut roles = RoleMaster::new();
    let r = roles.add_role("likes", false).unwrap();
    roles.set_reflexive(r);
    roles.finalize().unwrap();
    let a = dag.named_concept("A", true);

    let config = Config::default();
    let mut caches = ModelCacheRegistry::new();
    let mut tester = SatTester::new(
        &dag,
        &roles,
        &config,
        &mut caches,
        Bp::TOP,
        Vec::new(),
        false,
        QueryGuard::infinite(),
    );

    assert!(tester.run_sat(a).unwrap());
    for node in tester.graph().nodes() {
        if node.is_purged() {
            continue;
        }
        assert!(
            tester.graph().self_loop(node.id(), r, &roles).is_some(),
            "node {} lacks its reflexive loop",
            node.id().index()
        );
    }
}

#[test]
fn guard_times_out_after_its_budget() {
    let guard = QueryGuard::new(5, Arc::new(AtomicBool::new(false)));
    std::thread::sleep(std::time::Duration::from_millis(25));
    match guard.check() {
        Err(ReasoningError::Timeout { budget_ms, .. }) => assert_eq!(budget_ms, 5),
        other => unreachable!("expected a timeout, got {other:?}"),
    }
}

#[test]
fn guard_reports_cancellation() {
    let flag = Arc::new(AtomicBool::new(false));
    let guard = QueryGuard::new(0, Arc::clone(&flag));
    assert!(guard.check().is_ok());
    flag.store(true, Ordering::Relaxed);
    assert!(matches!(guard.check(), Err(ReasoningError::Cancelled)));
}

#[test]
fn statistics_count_the_work() {
    let mut dag = Dag::new();
    let mut roles = RoleMaster::new();
    let r = roles.add_role("r", false).unwrap();
    roles.finalize().unwrap();
    let a = dag.named_concept("A", true);
    let b = dag.named_concept("B", true);
    // A ⊑ B ⊔ ∃r.B
    let some_b = dag.exists(r, b, &roles);
    let def = dag.or(vec![b, some_b]);
    dag.set_definition(a, def);

    let config = Config::default();
    let mut caches = ModelCacheRegistry::new();
    let mut tester = SatTester::new(
        &dag,
        &roles,
        &config,
        &mut caches,
        Bp::TOP,
        Vec::new(),
        false,
        QueryGuard::infinite(),
    );
    assert!(tester.run_sat(a).unwrap());
    let stats = tester.stats();
    assert!(stats.tactic_calls > 0);
    assert!(stats.id_calls > 0);
    assert!(stats.or_calls > 0);
}

#[test]
fn unsatisfiable_pair_at_one_root() {
    let mut dag = Dag::new();
    let roles = {
        let mut rm = RoleMaster::new();
        rm.finalize().unwrap();
        rm
    };
    let a = dag.named_concept("A", true);

    let config = Config::default();
    let mut caches = ModelCacheRegistry::new();
    let mut tester = SatTester::new(
        &dag,
        &roles,
        &config,
        &mut caches,
        Bp::TOP,
        Vec::new(),
        false,
        QueryGuard::infinite(),
    );
    assert!(!tester.run_sat_pair(a, a.inverse()).unwrap());
    assert!(tester.run_sat_pair(a, Bp::TOP).unwrap());
}
