//! # Ledger Benchmarks
//!
//! | Operation | Expectation |
//! |-----------|-------------|
//! | `add_block` at capacity | constant per insert, evicts lowest |
//! | `snapshot` | linear in capacity |
//! | `plan_backfill` | linear in retained gap |

use chain_state::{plan_backfill, BlockLedger, MockNode, Smoother};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn bench_ledger_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger-insert");

    for capacity in [10usize, 100, 1000] {
        let blocks: Vec<_> = (0..5_000u64).map(MockNode::chain_block).collect();

        group.throughput(Throughput::Elements(blocks.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("ascending", capacity),
            &blocks,
            |b, blocks| {
                b.iter(|| {
                    let mut ledger = BlockLedger::new(capacity);
                    for block in blocks {
                        ledger.add_block(block.clone());
                    }
                    black_box(ledger.len())
                })
            },
        );
    }

    group.finish();
}

fn bench_ledger_snapshot(c: &mut Criterion) {
    let ledger = BlockLedger::seeded(100, (0..100u64).map(MockNode::chain_block));

    c.bench_function("ledger_snapshot_100", |b| {
        b.iter(|| black_box(ledger.snapshot()))
    });
}

fn bench_plan_backfill(c: &mut Criterion) {
    c.bench_function("plan_backfill_wide_gap", |b| {
        b.iter(|| black_box(plan_backfill(Some(1), black_box(1_000_000), 100)))
    });
}

fn bench_smoother(c: &mut Criterion) {
    c.bench_function("smoother_push_and_read", |b| {
        let mut smoother = Smoother::new(10);
        let mut x = 0.0;
        b.iter(|| {
            x += 1.0;
            smoother.push(x);
            black_box(smoother.value(Some(2)))
        })
    });
}

criterion_group!(
    benches,
    bench_ledger_insert,
    bench_ledger_snapshot,
    bench_plan_backfill,
    bench_smoother
);
criterion_main!(benches);
