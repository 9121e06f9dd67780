//! Runtime tuning knobs for [`crate::engine::execute_parallel`], `SPEC_FULL.md` §10.3.

/// Configuration for one call to [`crate::engine::execute_parallel`].
///
/// The only two knobs `spec.md` names: the fixed worker-pool size `P` (§4.6,
/// "implementation default 10") and the validation-increment cap (§9, "set to
/// 5 in the source without justification; an implementation should treat it
/// as a tunable").
#[derive(Clone, Copy, Debug)]
pub struct StmConfig {
    /// Number of worker threads in the fixed pool.
    pub worker_pool_size: usize,
    /// Maximum number of validations run per orchestrator tick while the
    /// batch has not finished executing. Once execution is complete, every
    /// pending validation runs in that tick regardless of this cap.
    pub validation_increment: usize,
}

impl Default for StmConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 10,
            validation_increment: 5,
        }
    }
}
