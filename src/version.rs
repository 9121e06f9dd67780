//! [`Version`]: one speculative attempt of one transaction.

/// A transaction's position in the input batch; its serial priority.
pub type TxIdx = usize;

/// The number of times a transaction has been (re-)executed, counting from 0.
pub type Incarnation = usize;

/// Identifies one speculative attempt of one transaction.
///
/// Created by the scheduler on dispatch and immutable thereafter; a new
/// incarnation is a different `Version` of the same `tx_idx`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Position of the transaction in the input batch.
    pub tx_idx: TxIdx,
    /// The i-th attempt at executing this transaction, counting from 0.
    pub incarnation: Incarnation,
}

impl Version {
    /// Builds a version from a transaction index and incarnation.
    pub fn new(tx_idx: TxIdx, incarnation: Incarnation) -> Self {
        Self { tx_idx, incarnation }
    }
}
