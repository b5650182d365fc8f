//! Cooperative run interruption.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag used to stop a run between engine steps.
///
/// Any holder may request an interrupt, typically a client reacting to an
/// `interrupt_check` notification. The scheduler observes the flag after
/// every step and clears it when a new run starts.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    requested: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the current run to stop after its current step.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_shared_between_clones() {
        let handle = InterruptHandle::new();
        let other = handle.clone();
        assert!(!handle.is_requested());

        other.request();
        assert!(handle.is_requested());
        assert!(handle.take());
        assert!(!other.is_requested());
        assert!(!handle.take());
    }
}
