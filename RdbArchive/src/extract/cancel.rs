//! Cooperative cancellation flag shared by the tasks of one batch

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A flag that moves from "running" to "cancelled" once and never back.
///
/// Clones share the same flag. Tasks poll [`is_cancelled`](Self::is_cancelled)
/// at their checkpoints; nothing is interrupted forcibly.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns `true` only for the call that actually flipped it.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_and_sticky() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        assert!(token.cancel());
        assert!(clone.is_cancelled());

        // Second cancel is a no-op
        assert!(!clone.cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_fresh_tokens_are_independent() {
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        a.cancel();
        assert!(!b.is_cancelled());
    }
}
