//! Progress and rename-prompt implementations

use crate::features::type_migration::ports::{ProgressIndicator, RenamePrompt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Progress port that never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancel;

impl ProgressIndicator for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }

    fn report(&self, dequeued: usize, pending: usize) {
        trace!(dequeued, pending, "migration progress");
    }
}

/// Cancellation shared between the caller and a running migration.
#[derive(Debug, Default, Clone)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ProgressIndicator for CancellationFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Answers every rename question the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedRenameAnswer(pub bool);

impl RenamePrompt for FixedRenameAnswer {
    fn confirm_rename(&mut self, _current: &str, _suggested: &str) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_shared() {
        let flag = CancellationFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());
        handle.cancel();
        assert!(flag.is_cancelled());
        assert!(!NeverCancel.is_cancelled());
    }
}
