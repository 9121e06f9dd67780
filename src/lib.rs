//! A parallel transaction execution engine core based on the Block-STM
//! algorithm: given an ordered batch of transactions with unknown read/write
//! sets, produces the exact state a serial execution in that order would
//! leave, exploiting parallelism wherever transactions prove non-conflicting.
//!
//! The crate is deliberately narrow: it owns the concurrent machinery
//! (multi-version memory map, scheduler, validator, per-execution view) and
//! treats the transaction body and the fallback persistent store as opaque
//! collaborators supplied by the caller through [`Transaction`] and
//! [`BaseStore`]. It does not know about any concrete VM, account model, or
//! wire format.

mod base_store;
mod config;
mod engine;
mod error;
mod io;
mod key;
mod mvmm;
mod status;
mod validator;
mod version;
mod view;

pub use base_store::BaseStore;
pub use config::StmConfig;
pub use engine::{execute_parallel, Transaction};
pub use error::{ExecError, MvmmError, StmError};
pub use io::{ReadDescriptor, ReadKind, TxnInput, TxnInputOutput, TxnOutput, WriteDescriptor};
pub use key::{value_of, Key, Value};
pub use mvmm::{Mvmm, ReadResult};
pub use version::{Incarnation, TxIdx, Version};
pub use view::ExecutionView;
