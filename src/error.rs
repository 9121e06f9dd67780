//! Error taxonomy, `spec.md` §7.
//!
//! Two enums: [`MvmmError`] (re-exported from [`crate::mvmm`], the programmer-error
//! taxonomy fatal to the whole batch) and [`StmError`], the result type of
//! [`crate::engine::execute_parallel`] parametrized over the base store's own
//! error type. The teacher (`risechain-block-stm-revm`) shapes its own
//! `PevmError`/`ReadError` the same way — a small enum distinguishing
//! expected, in-loop-recoverable conditions from fatal ones — but never
//! derives `std::error::Error` for them since they never cross a crate
//! boundary. `StmError` does cross one (`spec.md` §6's `execute_parallel` is
//! the library's public entry point), so both enums here derive
//! `thiserror::Error`, per `SPEC_FULL.md` §10.2.

pub use crate::mvmm::MvmmError;

/// Raised internally by [`crate::view::ExecutionView::read`] when the MVMM
/// reports [`crate::mvmm::ReadResult::Dependency`].
///
/// Expected and recovered in-loop by the orchestrator (`spec.md` §7): never
/// surfaced to the caller of `execute_parallel`. Also carries fatal errors
/// returned by the user's transaction body, so that a transaction's `Result`
/// type can use ordinary `?`-based propagation through the view without a
/// separate out-of-band abort signal.
#[derive(Debug)]
pub enum ExecError<E> {
    /// The read is blocked on an in-flight write at `blocking_tx_idx` that
    /// has not yet settled; the worker must abort this execution.
    Aborted {
        /// The transaction index this execution is now dependent on.
        blocking_tx_idx: crate::version::TxIdx,
    },
    /// A fatal error returned by the transaction body itself (not a
    /// dependency abort). Surfaced unchanged to the caller of
    /// `execute_parallel`.
    Fatal(E),
}

impl<E> ExecError<E> {
    /// Maps the fatal-error payload, leaving a dependency abort untouched.
    ///
    /// A transaction body whose own error type differs from the base
    /// store's calls this to fold `view.read`'s `ExecError<S::Error>` into
    /// its own `ExecError<Self::Error>` before propagating with `?`.
    pub fn map_fatal<E2>(self, f: impl FnOnce(E) -> E2) -> ExecError<E2> {
        match self {
            ExecError::Aborted { blocking_tx_idx } => ExecError::Aborted { blocking_tx_idx },
            ExecError::Fatal(e) => ExecError::Fatal(f(e)),
        }
    }
}

/// The error type returned by [`crate::engine::execute_parallel`].
///
/// Parametrized over `E`, the base store's own error type, so that a fatal
/// base-store failure and a fatal user/transaction-body failure both compose
/// cleanly into one type at the crate's public boundary.
#[derive(Debug, thiserror::Error)]
pub enum StmError<E> {
    /// A transaction body (or, transitively, the base store it called into)
    /// returned a fatal error. Partial MVMM state must be treated as
    /// abandoned (`spec.md` §7).
    #[error("transaction at tx_idx {tx_idx} failed fatally: {source}")]
    TransactionFailed {
        /// The transaction index that failed.
        tx_idx: crate::version::TxIdx,
        /// The underlying fatal error.
        #[source]
        source: E,
    },
    /// A programmer-error condition was detected in the MVMM bookkeeping —
    /// a lower-incarnation write or an operation against an unwritten cell.
    /// This can only happen if the scheduler's own invariants are broken.
    #[error("internal multi-version memory map invariant violated: {0}")]
    Mvmm(#[from] MvmmError),
    /// A worker thread disconnected from the orchestrator's channels
    /// unexpectedly (e.g. panicked mid-execution).
    #[error("a worker thread disconnected before the batch completed")]
    WorkerDisconnected,
}
