use thiserror::Error;

/// The deadline fired while the branch-and-bound search was running.
///
/// The search unwinds without a result; the best solution found so far is
/// discarded rather than handed back, so a returned plan is always optimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("delivery planning cancelled after {after_steps} search steps")]
pub struct PlanCancelled {
    /// Search-tree entries visited before the cancellation poll hit.
    pub after_steps: u64,
}
