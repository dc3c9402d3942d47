//! Cooperative cancellation handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Caller-owned stop flag, shared by cloning.
///
/// The scheduler only polls it at batch entry and between windows; calls already in
/// flight run to completion (or their own timeout).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the handle can drive another operation.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
        other.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_independent_tokens_do_not_leak() {
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        a.cancel();
        assert!(!b.is_cancelled());
    }
}
