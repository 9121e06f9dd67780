//! The base-store contract, `spec.md` §6: the fallback persistent key-value
//! store consulted only on MVMM miss.
//!
//! The core never persists through this trait itself — `spec.md` §6 is
//! explicit that "persisting the final MVMM/TxnInputOutput is the caller's
//! job and is out of scope" — `write` exists on the trait only because
//! `spec.md`'s contract names it, not because the core's engine calls it.

use crate::key::{Key, Value};

/// The fallback persistent key-value store an [`crate::view::ExecutionView`]
/// falls through to on an MVMM miss.
///
/// Grounded in the teacher's `Storage` trait shape (`risechain-block-stm-revm`'s
/// `vm.rs` `Database`-style fallback read), generalized from EVM account
/// storage slots to opaque byte keys.
pub trait BaseStore {
    /// The store's own error type, threaded through [`crate::error::StmError`]
    /// on a fatal failure.
    type Error;

    /// Reads the committed value at `key`, or `None` if it was never written.
    fn read(&self, key: &Key) -> Result<Option<Value>, Self::Error>;

    /// Writes `value` at `key`. Not called by the core itself; provided so
    /// that a caller's `BaseStore` implementation can be driven through the
    /// same trait object it hands to `execute_parallel`.
    fn write(&self, key: &Key, value: Value) -> Result<(), Self::Error>;
}
