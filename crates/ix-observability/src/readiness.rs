//! Readiness tracking. Two latches, set once and never cleared; a
//! restart starts a fresh [`Readiness`] and re-earns both.

use std::sync::atomic::{
    AtomicBool,
    Ordering,
};

#[derive(Default)]
pub struct Readiness {
    bootstrap_complete: AtomicBool,
    first_flush_succeeded: AtomicBool,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_bootstrap_complete(&self) {
        self.bootstrap_complete.store(true, Ordering::Release);
    }

    pub fn mark_flush_succeeded(&self) {
        self.first_flush_succeeded.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.bootstrap_complete.load(Ordering::Acquire) && self.first_flush_succeeded.load(Ordering::Acquire)
    }

    pub fn bootstrap_complete(&self) -> bool {
        self.bootstrap_complete.load(Ordering::Acquire)
    }

    pub fn first_flush_succeeded(&self) -> bool {
        self.first_flush_succeeded.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_until_both_latches_are_set() {
        let readiness = Readiness::new();
        assert!(!readiness.is_ready());
        readiness.mark_bootstrap_complete();
        assert!(!readiness.is_ready());
        readiness.mark_flush_succeeded();
        assert!(readiness.is_ready());
    }

    #[test]
    fn latches_never_clear_once_set() {
        let readiness = Readiness::new();
        readiness.mark_bootstrap_complete();
        readiness.mark_flush_succeeded();
        assert!(readiness.is_ready());
        // No reset API exists; a restart is the only way back to not-ready.
        assert!(readiness.bootstrap_complete());
        assert!(readiness.first_flush_succeeded());
    }
}
