//! The validator, `spec.md` §4.3: a pure check that a previously executed
//! transaction's reads are still consistent with the current MVMM state.

use crate::io::{ReadKind, TxnInputOutput};
use crate::mvmm::{Mvmm, ReadResult};
use crate::version::{TxIdx, Version};

/// Checks every read descriptor recorded for `tx_idx` against the MVMM's
/// current state, failing fast on the first mismatch.
///
/// Grounded on `original_source/executor.go`'s `validateVersion`, collapsed
/// per `spec.md` §9's resolution of the open question there: any deviation
/// from the recorded `(kind, version)` invalidates, with no separate
/// "assertion" tier.
pub(crate) fn validate(tx_idx: TxIdx, txn_io: &TxnInputOutput, mvmm: &Mvmm) -> bool {
    for read in txn_io.read_set(tx_idx) {
        let current = mvmm.read(&read.path, tx_idx);
        let ok = match current {
            ReadResult::Done { dep_idx, incarnation, .. } => {
                read.kind == ReadKind::Map && read.version == Version::new(dep_idx, incarnation)
            }
            ReadResult::Dependency { .. } => false,
            ReadResult::None => read.kind == ReadKind::Storage,
        };
        if !ok {
            return false;
        }
    }
    true
}
