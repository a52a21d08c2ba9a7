//! Criterion benchmarks over satisfiability and classification.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tableaux::{Axiom, ConceptExpr, Reasoner};

/// A told chain C0 ⊑ C1 ⊑ … ⊑ Cn with a few existentials mixed in
fn chain_reasoner(n: usize) -> Reasoner {
    let mut reasoner = Reasoner::new();
    for i in 0..n {
        reasoner
            .load_axiom(Axiom::ConceptInclusion {
                sub: ConceptExpr::name(&format!("C{i}")),
                sup: ConceptExpr::name(&format!("C{}", i + 1)),
            })
            .unwrap();
        if i % 4 == 0 {
            reasoner
                .load_axiom(Axiom::ConceptInclusion {
                    sub: ConceptExpr::name(&format!("C{i}")),
                    sup: ConceptExpr::exists("r", ConceptExpr::name(&format!("C{}", i + 1))),
                })
                .unwrap();
        }
    }
    reasoner.preprocess().unwrap();
    reasoner
}

fn bench_subsumption(c: &mut Criterion) {
    c.bench_function("subsumption_chain_32", |b| {
        let mut reasoner = chain_reasoner(32);
        let sub = ConceptExpr::name("C0");
        let sup = ConceptExpr::name("C32");
        b.iter(|| {
            let result = reasoner.is_subsumed_by(black_box(&sub), black_box(&sup)).unwrap();
            assert!(result);
        });
    });
}

fn bench_classification(c: &mut Criterion) {
    c.bench_function("classify_chain_32", |b| {
        b.iter(|| {
            let mut reasoner = chain_reasoner(32);
            reasoner.classify().unwrap();
            black_box(reasoner.taxonomy().map(tableaux::Taxonomy::len));
        });
    });
}

fn bench_satisfiability(c: &mut Criterion) {
    c.bench_function("satisfiability_disjunctions", |b| {
        let mut reasoner = Reasoner::new();
        reasoner
            .load_axiom(Axiom::ConceptInclusion {
                sub: ConceptExpr::name("A"),
                sup: ConceptExpr::or(
                    (0..8).map(|i| ConceptExpr::name(&format!("D{i}"))).collect(),
                ),
            })
            .unwrap();
        reasoner.preprocess().unwrap();
        let a = ConceptExpr::name("A");
        b.iter(|| reasoner.is_satisfiable(black_box(&a)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_subsumption,
    bench_classification,
    bench_satisfiability
);
criterion_main!(benches);
