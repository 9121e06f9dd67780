//! Read/write descriptors and per-transaction input/output tracking,
//! `spec.md` §4.2.

use std::collections::HashMap;

use crate::key::{Key, Value};
use crate::version::{TxIdx, Version};

/// Where a recorded read was satisfied from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadKind {
    /// Satisfied from the MVMM: some lower-indexed transaction's committed
    /// write.
    Map,
    /// Fell through to the base store: no MVMM cell existed below the
    /// reader's tx_idx.
    Storage,
}

/// A recorded read: which key, how it was satisfied, and (for `Map` reads)
/// which version produced the value.
///
/// For `Storage` reads the `version` field is conventionally zero and
/// unused by the validator — `spec.md` §3 notes validation only checks the
/// kind in that case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadDescriptor {
    /// The key read.
    pub path: Key,
    /// Whether the read hit the MVMM or fell through to the base store.
    pub kind: ReadKind,
    /// The version that produced the value, for `Map` reads; unused for
    /// `Storage` reads.
    pub version: Version,
}

impl ReadDescriptor {
    /// Builds a `Map`-kind descriptor recording the version that produced
    /// the read value.
    pub fn map(path: Key, version: Version) -> Self {
        Self { path, kind: ReadKind::Map, version }
    }

    /// Builds a `Storage`-kind descriptor; `version` is unused by the
    /// validator but set to the zero version for a well-defined value.
    pub fn storage(path: Key) -> Self {
        Self { path, kind: ReadKind::Storage, version: Version::new(0, 0) }
    }
}

/// A recorded write: which key, at which version, with what value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteDescriptor {
    /// The key written.
    pub path: Key,
    /// The version of the execution that produced this write.
    pub version: Version,
    /// The value written.
    pub value: Value,
}

/// The ordered set of reads one transaction execution performed.
///
/// Backed by a `path -> descriptor` map so that repeated reads of the same
/// key collapse to the first-observed descriptor (`spec.md` §4.2's
/// first-read-wins rule is enforced by [`crate::view::ExecutionView`]; this
/// type is the materialized, order-preserving result handed to the
/// scheduler).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxnInput {
    reads: Vec<ReadDescriptor>,
}

impl TxnInput {
    /// Builds a `TxnInput` from already-ordered descriptors (insertion
    /// order from the originating [`crate::view::ExecutionView`]).
    pub fn new(reads: Vec<ReadDescriptor>) -> Self {
        Self { reads }
    }

    /// The recorded read descriptors, in the order first observed.
    pub fn reads(&self) -> &[ReadDescriptor] {
        &self.reads
    }
}

/// The ordered set of writes one transaction execution performed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxnOutput {
    writes: Vec<WriteDescriptor>,
}

impl TxnOutput {
    /// Builds a `TxnOutput` from already-ordered descriptors (insertion
    /// order from the originating [`crate::view::ExecutionView`], last
    /// write per key wins).
    pub fn new(writes: Vec<WriteDescriptor>) -> Self {
        Self { writes }
    }

    /// The recorded write descriptors, in last-write-wins order.
    pub fn writes(&self) -> &[WriteDescriptor] {
        &self.writes
    }

    fn paths(&self) -> impl Iterator<Item = &Key> {
        self.writes.iter().map(|w| &w.path)
    }
}

/// `true` iff `new_output` writes to some key `prior_output` did not.
///
/// Grounded in `original_source/executor.go`'s `hasNewWrite`. Per `spec.md`
/// §9's open question, the scheduler only observes this (logged as a
/// diagnostic); the reaction it hints at — widening the revalidation range
/// to the newly written paths — is deliberately not implemented here.
pub(crate) fn has_new_write(new_output: &TxnOutput, prior_output: &TxnOutput) -> bool {
    let prior_paths: std::collections::HashSet<&Key> = prior_output.paths().collect();
    new_output.paths().any(|path| !prior_paths.contains(path))
}

/// Per-tx_idx storage of the most recent [`TxnInput`]/[`TxnOutput`] pair.
///
/// `spec.md` §5: touched exclusively by the orchestrator thread — workers
/// communicate their results over a channel rather than writing here
/// directly, so this type needs no internal locking.
#[derive(Debug)]
pub struct TxnInputOutput {
    inputs: Vec<Option<TxnInput>>,
    outputs: Vec<Option<TxnOutput>>,
}

impl TxnInputOutput {
    /// Builds an empty tracker sized for `n` transactions.
    pub fn new(n: usize) -> Self {
        Self {
            inputs: (0..n).map(|_| None).collect(),
            outputs: (0..n).map(|_| None).collect(),
        }
    }

    /// Replaces the read set recorded for `i`.
    pub fn record_read(&mut self, i: TxIdx, input: TxnInput) {
        self.inputs[i] = Some(input);
    }

    /// Replaces the write set recorded for `i`.
    pub fn record_write(&mut self, i: TxIdx, output: TxnOutput) {
        self.outputs[i] = Some(output);
    }

    /// The most recently recorded read set for `i`, or an empty slice if `i`
    /// has not yet completed an execution.
    pub fn read_set(&self, i: TxIdx) -> &[ReadDescriptor] {
        self.inputs[i].as_ref().map(TxnInput::reads).unwrap_or(&[])
    }

    /// The most recently recorded write set for `i`, or an empty slice if
    /// `i` has not yet completed an execution.
    pub fn write_set(&self, i: TxIdx) -> &[WriteDescriptor] {
        self.outputs[i].as_ref().map(TxnOutput::writes).unwrap_or(&[])
    }

    /// The prior (pre-overwrite) output for `i`, if any, compared against
    /// `new_output` via [`has_new_write`]. Convenience wrapper the
    /// orchestrator calls before committing the new output.
    pub fn had_new_write_since_last(&self, i: TxIdx, new_output: &TxnOutput) -> bool {
        match &self.outputs[i] {
            Some(prior) => has_new_write(new_output, prior),
            None => false,
        }
    }

    /// Snapshots the final read/write sets for every tx_idx, in order.
    ///
    /// Materializes the `path -> descriptor` buffering done during
    /// execution into the flat `(TxnInput, TxnOutput)` pairs `spec.md` §6
    /// describes `execute_parallel`'s successful return value as.
    pub fn into_pairs(self) -> Vec<(TxnInput, TxnOutput)> {
        self.inputs
            .into_iter()
            .zip(self.outputs)
            .map(|(i, o)| (i.unwrap_or_default(), o.unwrap_or_default()))
            .collect()
    }
}

/// Buffers reads/writes during one execution, enforcing first-read-wins and
/// last-write-wins, before being materialized into a [`TxnInput`]/
/// [`TxnOutput`] pair. Used by [`crate::view::ExecutionView`].
#[derive(Debug, Default)]
pub(crate) struct DescriptorBuffer {
    reads: HashMap<Key, ReadDescriptor>,
    read_order: Vec<Key>,
    writes: HashMap<Key, WriteDescriptor>,
    write_order: Vec<Key>,
}

impl DescriptorBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records a read descriptor unless this key was already read this
    /// execution (first-read-wins, `spec.md` §4.2/§4.4).
    pub(crate) fn record_read(&mut self, descriptor: ReadDescriptor) {
        if !self.reads.contains_key(&descriptor.path) {
            self.read_order.push(descriptor.path.clone());
            self.reads.insert(descriptor.path.clone(), descriptor);
        }
    }

    /// Records a write descriptor, overwriting any prior one for this key
    /// (last-write-wins, `spec.md` §4.4).
    pub(crate) fn record_write(&mut self, descriptor: WriteDescriptor) {
        if !self.writes.contains_key(&descriptor.path) {
            self.write_order.push(descriptor.path.clone());
        }
        self.writes.insert(descriptor.path.clone(), descriptor);
    }

    pub(crate) fn into_input_output(self) -> (TxnInput, TxnOutput) {
        let reads = self
            .read_order
            .into_iter()
            .map(|k| self.reads.get(&k).cloned().expect("recorded"))
            .collect();
        let writes = self
            .write_order
            .into_iter()
            .map(|k| self.writes.get(&k).cloned().expect("recorded"))
            .collect();
        (TxnInput::new(reads), TxnOutput::new(writes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Key {
        Key::from(s)
    }

    #[test]
    fn has_new_write_detects_new_path() {
        let prior = TxnOutput::new(vec![WriteDescriptor {
            path: key("a"),
            version: Version::new(0, 0),
            value: crate::key::value_of(vec![1]),
        }]);
        let same = TxnOutput::new(vec![WriteDescriptor {
            path: key("a"),
            version: Version::new(0, 1),
            value: crate::key::value_of(vec![2]),
        }]);
        let wider = TxnOutput::new(vec![
            WriteDescriptor { path: key("a"), version: Version::new(0, 1), value: crate::key::value_of(vec![2]) },
            WriteDescriptor { path: key("b"), version: Version::new(0, 1), value: crate::key::value_of(vec![3]) },
        ]);
        assert!(!has_new_write(&same, &prior));
        assert!(has_new_write(&wider, &prior));
    }

    #[test]
    fn descriptor_buffer_first_read_wins_last_write_wins() {
        let mut buf = DescriptorBuffer::new();
        buf.record_read(ReadDescriptor::storage(key("a")));
        buf.record_read(ReadDescriptor::map(key("a"), Version::new(3, 0)));
        buf.record_write(WriteDescriptor {
            path: key("b"),
            version: Version::new(1, 0),
            value: crate::key::value_of(vec![1]),
        });
        buf.record_write(WriteDescriptor {
            path: key("b"),
            version: Version::new(1, 0),
            value: crate::key::value_of(vec![2]),
        });
        let (input, output) = buf.into_input_output();
        assert_eq!(input.reads().len(), 1);
        assert_eq!(input.reads()[0].kind, ReadKind::Storage);
        assert_eq!(output.writes().len(), 1);
        assert_eq!(output.writes()[0].value, crate::key::value_of(vec![2]));
    }

    #[test]
    fn record_read_and_write_replace_prior_entry() {
        let mut tio = TxnInputOutput::new(2);
        tio.record_read(0, TxnInput::new(vec![ReadDescriptor::storage(key("a"))]));
        tio.record_read(0, TxnInput::new(vec![ReadDescriptor::storage(key("b"))]));
        assert_eq!(tio.read_set(0).len(), 1);
        assert_eq!(tio.read_set(0)[0].path, key("b"));
    }
}
