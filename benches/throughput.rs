//! Throughput benchmarks, `SPEC_FULL.md` §10.4: the disjoint-key (S5) and
//! single-hot-key (S6) workloads from `spec.md` §8, at a few block sizes.
//!
//! Grounded in the teacher's (`risechain-block-stm-revm`) `benches/mainnet.rs`
//! shape (a `criterion` benchmark group per workload), generalized away from
//! real mainnet block replay — which depends on a concrete VM and is out of
//! scope per `spec.md` §1 — to the two workloads the core's own testable
//! properties describe.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Mutex;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use block_stm_core::{
    execute_parallel, value_of, BaseStore, ExecError, ExecutionView, Key, MvmmError, StmConfig,
    Transaction, Value,
};

#[derive(Default)]
struct MemStore(Mutex<HashMap<Key, Value>>);

impl BaseStore for MemStore {
    type Error = std::convert::Infallible;

    fn read(&self, key: &Key) -> Result<Option<Value>, Self::Error> {
        Ok(self.0.lock().unwrap().get(key).cloned())
    }

    fn write(&self, key: &Key, value: Value) -> Result<(), Self::Error> {
        self.0.lock().unwrap().insert(key.clone(), value);
        Ok(())
    }
}

fn unreachable_mvmm_error(e: MvmmError) -> std::convert::Infallible {
    unreachable!("bench transactions never provoke a fatal MVMM error: {e}")
}

struct CopyTxn {
    from: Key,
    to: Key,
}

impl Transaction<MemStore> for CopyTxn {
    type Error = std::convert::Infallible;

    fn execute(&self, view: &mut ExecutionView<'_, MemStore>) -> Result<(), ExecError<Self::Error>> {
        let value = view.read(&self.from)?.unwrap_or_else(|| value_of(Vec::new()));
        view.write(&self.to, value).map_err(|e| ExecError::Fatal(unreachable_mvmm_error(e)))?;
        Ok(())
    }
}

struct IncrementTxn {
    key: Key,
}

impl Transaction<MemStore> for IncrementTxn {
    type Error = std::convert::Infallible;

    fn execute(&self, view: &mut ExecutionView<'_, MemStore>) -> Result<(), ExecError<Self::Error>> {
        let current = view.read(&self.key)?;
        let n = current.map(|v| u32::from_le_bytes(v[..4].try_into().unwrap())).unwrap_or(0);
        view.write(&self.key, value_of((n + 1).to_le_bytes().to_vec()))
            .map_err(|e| ExecError::Fatal(unreachable_mvmm_error(e)))?;
        Ok(())
    }
}

fn disjoint_keys_benchmark(c: &mut Criterion) {
    let config = StmConfig::default();
    let mut group = c.benchmark_group("disjoint-keys (S5)");
    for size in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let store = MemStore::default();
            for i in 0..size {
                store.write(&Key::from(format!("seed-{i}")), value_of(format!("val-{i}"))).unwrap();
            }
            let txns: Vec<CopyTxn> = (0..size)
                .map(|i| CopyTxn { from: Key::from(format!("seed-{i}")), to: Key::from(format!("key-{i}")) })
                .collect();
            b.iter(|| execute_parallel(black_box(&txns), black_box(&store), black_box(&config)).unwrap());
        });
    }
    group.finish();
}

fn hot_key_benchmark(c: &mut Criterion) {
    let config = StmConfig::default();
    let mut group = c.benchmark_group("single-hot-key (S6)");
    for size in [100usize, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let store = MemStore::default();
            let key = Key::from("hot-key");
            let txns: Vec<IncrementTxn> = (0..size).map(|_| IncrementTxn { key: key.clone() }).collect();
            b.iter(|| execute_parallel(black_box(&txns), black_box(&store), black_box(&config)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, disjoint_keys_benchmark, hot_key_benchmark);
criterion_main!(benches);
