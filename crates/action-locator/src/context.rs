//! Execution context for a replayed action

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Cancellation and deadline shared by all attempts of one logical action.
///
/// Both are checked between attempts only; an attempt already handed to the
/// driver runs to completion.
#[derive(Debug, Clone, Default)]
pub struct ExecCtx {
    /// Deadline for the whole fallback run
    pub deadline: Option<Instant>,

    /// Cancellation token for cooperative cancellation
    pub cancel_token: CancellationToken,
}

impl ExecCtx {
    pub fn new(deadline: Option<Instant>, cancel_token: CancellationToken) -> Self {
        Self {
            deadline,
            cancel_token,
        }
    }

    /// Context expiring `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(Some(Instant::now() + timeout), CancellationToken::new())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn is_timeout(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Time left before the deadline; `None` without one.
    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_and_cancel() {
        let ctx = ExecCtx::default();
        assert!(!ctx.is_timeout());
        assert_eq!(ctx.remaining_time(), None);

        let expired = ExecCtx::with_timeout(Duration::ZERO);
        assert!(expired.is_timeout());

        let token = CancellationToken::new();
        let ctx = ExecCtx::new(None, token.clone());
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
