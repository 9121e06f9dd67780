//! The multi-version memory map (MVMM): a concurrent key -> ordered-by-tx_index
//! log of writes, per `spec.md` §4.1.
//!
//! Grounded directly on `go-block-stm`'s `MVHashMap` (`original_source/mvhashmap.go`):
//! an outer map from key to a per-key ordered structure, reader-writer locked
//! at both levels, with first-writer-wins creation of the inner structure. The
//! outer map is a [`DashMap`] (as in the teacher, `risechain-block-stm-revm`'s
//! `MvMemory`, and `aptos-mvhashmap`/`block-stm-executor`'s ports of the same
//! algorithm) rather than a hand-rolled `RwLock<HashMap>` — `DashMap` already
//! gives per-shard reader-writer locking and first-writer-wins entry creation
//! for free. The inner ordered structure needs predecessor ("floor") queries,
//! so it is a plain [`BTreeMap`] behind a [`RwLock`], exactly as `spec.md`
//! §9 ("Ordered-map requirement") calls for.

use std::collections::BTreeMap;
use std::sync::RwLock;

use dashmap::DashMap;

use crate::key::{Key, Value};
use crate::version::{Incarnation, TxIdx, Version};

/// A write cell: one `(flag, incarnation, value)` entry at `(key, tx_idx)`.
#[derive(Clone, Debug)]
struct WriteCell {
    flag: CellFlag,
    incarnation: Incarnation,
    value: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellFlag {
    Done,
    Estimate,
}

/// The ordered, per-key log of write cells, keyed by `tx_idx`.
type TxnIndexCells = RwLock<BTreeMap<TxIdx, WriteCell>>;

/// The result of [`Mvmm::read`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadResult {
    /// A `DONE` cell was found at `floor(key, tx_idx - 1)`.
    Done {
        /// The `tx_idx` of the cell that produced this value.
        dep_idx: TxIdx,
        /// The incarnation that produced this value.
        incarnation: Incarnation,
        /// The value written.
        value: Value,
    },
    /// An `ESTIMATE` cell was found at the floor; the reader must abort and
    /// be requeued, depending on `dep_idx` to settle first.
    Dependency {
        /// The `tx_idx` the reader is now dependent on.
        dep_idx: TxIdx,
    },
    /// No cell with `tx_idx` strictly less than the reader exists; the
    /// reader must fall back to the base store.
    None,
}

/// Fatal, programmer-error conditions raised by [`Mvmm`] operations.
///
/// `spec.md` §7 classifies these as bugs in the calling code, not recoverable
/// runtime conditions — a `Write` at a non-increasing incarnation, or a
/// `mark_estimate`/`delete` on a key that was never written, can only happen
/// if the scheduler's bookkeeping is broken.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum MvmmError {
    /// `write` was called with an incarnation not strictly greater than the
    /// one already recorded at `(key, tx_idx)`.
    #[error("write at tx_idx {tx_idx} must strictly increase the incarnation: existing {existing}, attempted {attempted}")]
    LowerIncarnation {
        /// The offending transaction index.
        tx_idx: TxIdx,
        /// The incarnation already stored.
        existing: Incarnation,
        /// The incarnation the caller attempted to write.
        attempted: Incarnation,
    },
    /// `mark_estimate` or `delete` was called on a `(key, tx_idx)` pair that
    /// has no cell.
    #[error("no cell at tx_idx {tx_idx} for this key")]
    MissingCell {
        /// The transaction index with no recorded cell.
        tx_idx: TxIdx,
    },
}

/// Concurrent map from key to an ordered-by-tx_index log of write cells.
///
/// Every public method is safe under concurrent invocation: the outer
/// [`DashMap`] serializes creation of a key's inner log (first-writer-wins,
/// double-checked under the shard's write lock), and each inner log is its
/// own [`RwLock<BTreeMap<..>>`] so unrelated keys never contend.
#[derive(Default)]
pub struct Mvmm {
    data: DashMap<Key, TxnIndexCells>,
}

impl Mvmm {
    /// Creates an empty MVMM.
    pub fn new() -> Self {
        Self { data: DashMap::new() }
    }

    /// Reads the value visible to `tx_idx` at `key`: the `DONE` cell at
    /// `floor(key, tx_idx - 1)`, or [`ReadResult::Dependency`] if that floor
    /// cell is an `ESTIMATE`, or [`ReadResult::None`] if there is none.
    pub fn read(&self, key: &Key, tx_idx: TxIdx) -> ReadResult {
        let Some(cells) = self.data.get(key) else {
            return ReadResult::None;
        };
        let cells = cells.read().expect("mvmm inner lock poisoned");
        match cells.range(..tx_idx).next_back() {
            None => ReadResult::None,
            Some((&dep_idx, cell)) => match cell.flag {
                CellFlag::Estimate => ReadResult::Dependency { dep_idx },
                CellFlag::Done => ReadResult::Done {
                    dep_idx,
                    incarnation: cell.incarnation,
                    value: cell.value.clone(),
                },
            },
        }
    }

    /// Inserts or updates the cell at `(key, version.tx_idx)` to
    /// `{DONE, version.incarnation, value}`.
    ///
    /// Fatal if a cell already exists at a greater-or-equal incarnation —
    /// every re-execution of the same transaction must strictly increase its
    /// incarnation (`spec.md` §3).
    pub fn write(&self, key: &Key, version: Version, value: Value) -> Result<(), MvmmError> {
        let cells = self.key_cells(key);
        let mut cells = cells.write().expect("mvmm inner lock poisoned");
        match cells.get_mut(&version.tx_idx) {
            Some(cell) => {
                if cell.incarnation >= version.incarnation {
                    return Err(MvmmError::LowerIncarnation {
                        tx_idx: version.tx_idx,
                        existing: cell.incarnation,
                        attempted: version.incarnation,
                    });
                }
                cell.flag = CellFlag::Done;
                cell.incarnation = version.incarnation;
                cell.value = value;
            }
            None => {
                cells.insert(
                    version.tx_idx,
                    WriteCell {
                        flag: CellFlag::Done,
                        incarnation: version.incarnation,
                        value,
                    },
                );
            }
        }
        Ok(())
    }

    /// Flips the cell at `(key, tx_idx)` to `ESTIMATE`.
    ///
    /// Fatal if no cell exists there — estimates mark writes that a reader
    /// has already depended on, so the cell must already exist.
    pub fn mark_estimate(&self, key: &Key, tx_idx: TxIdx) -> Result<(), MvmmError> {
        let Some(cells) = self.data.get(key) else {
            return Err(MvmmError::MissingCell { tx_idx });
        };
        let mut cells = cells.write().expect("mvmm inner lock poisoned");
        match cells.get_mut(&tx_idx) {
            Some(cell) => {
                cell.flag = CellFlag::Estimate;
                Ok(())
            }
            None => Err(MvmmError::MissingCell { tx_idx }),
        }
    }

    /// Removes the cell at `(key, tx_idx)`.
    ///
    /// Safe to call on an absent inner entry, but the outer key must already
    /// exist (mirrors `go-block-stm`'s `Delete`, which panics only when the
    /// path itself was never written).
    pub fn delete(&self, key: &Key, tx_idx: TxIdx) -> Result<(), MvmmError> {
        let Some(cells) = self.data.get(key) else {
            return Err(MvmmError::MissingCell { tx_idx });
        };
        let mut cells = cells.write().expect("mvmm inner lock poisoned");
        cells.remove(&tx_idx);
        Ok(())
    }

    /// Returns the value of the highest-indexed `DONE` cell for every key
    /// ever written, i.e. the final committed state.
    ///
    /// A convenience supplement grounded on `risechain-block-stm-revm`'s
    /// `MvMemory::snapshot` (teacher), generalized from EVM addresses to
    /// opaque keys.
    pub fn committed_values(&self) -> Vec<(Key, Value)> {
        self.data
            .iter()
            .filter_map(|entry| {
                let cells = entry.value().read().expect("mvmm inner lock poisoned");
                cells
                    .values()
                    .next_back()
                    .map(|cell| (entry.key().clone(), cell.value.clone()))
            })
            .collect()
    }

    fn key_cells(&self, key: &Key) -> dashmap::mapref::one::Ref<'_, Key, TxnIndexCells> {
        if let Some(cells) = self.data.get(key) {
            return cells;
        }
        // First-writer-wins: double-check after taking the entry API's lock.
        self.data.entry(key.clone()).or_default();
        self.data.get(key).expect("just inserted")
    }
}

impl std::fmt::Debug for Mvmm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mvmm").field("keys", &self.data.len()).finish()
    }
}
