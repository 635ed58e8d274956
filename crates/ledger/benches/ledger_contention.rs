use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use dentstock_core::{LocationId, SupplyId};
use dentstock_ledger::{InMemoryLedgerStore, LedgerKey, StockLedger};

const ADJUSTMENTS_PER_THREAD: u64 = 200;

fn run_threads(ledger: &StockLedger<InMemoryLedgerStore>, keys: &[(SupplyId, LocationId)]) {
    std::thread::scope(|s| {
        for &(supply, location) in keys {
            s.spawn(move || {
                for _ in 0..ADJUSTMENTS_PER_THREAD {
                    ledger
                        .adjust_location_stock(supply, location, 1)
                        .expect("adjust");
                }
            });
        }
    });
}

/// All threads hammer one (supply, location) row.
fn bench_same_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_same_key");

    for threads in [1usize, 2, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * ADJUSTMENTS_PER_THREAD));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let ledger = StockLedger::new(InMemoryLedgerStore::new());
            let key = (SupplyId::new(), LocationId::new());
            let keys = vec![key; threads];
            b.iter(|| run_threads(black_box(&ledger), &keys));
        });
    }

    group.finish();
}

/// Each thread owns its own row.
fn bench_disjoint_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_disjoint_keys");

    for threads in [1usize, 2, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * ADJUSTMENTS_PER_THREAD));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let ledger = StockLedger::new(InMemoryLedgerStore::new());
            let keys: Vec<_> = (0..threads)
                .map(|_| (SupplyId::new(), LocationId::new()))
                .collect();
            b.iter(|| run_threads(black_box(&ledger), &keys));
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let ledger = StockLedger::new(InMemoryLedgerStore::new());
    for _ in 0..1_000 {
        let supply = SupplyId::new();
        ledger
            .adjust_location_stock(supply, LocationId::new(), 5)
            .expect("seed");
        ledger.adjust_unassigned(supply, 3).expect("seed");
    }
    let probe = LedgerKey::unassigned(SupplyId::new());

    c.bench_function("ledger_snapshot_2000_rows", |b| {
        b.iter(|| {
            let snap = ledger.snapshot().expect("snapshot");
            black_box(snap.quantity(&probe))
        });
    });
}

criterion_group!(benches, bench_same_key, bench_disjoint_keys, bench_snapshot);
criterion_main!(benches);
