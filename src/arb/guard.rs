//! Call-depth lock shared by every engine entry point that calls out to a
//! ledger or a venue.
//!
//! Acquiring the lock hands back a [`ReentrancyLock`] whose `Drop` clears the
//! flag, so the lock is released on every exit path: success, early `?`
//! returns, and unwinding panics raised inside a venue.
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;

use super::error::EngineError;

/// A single boolean lock guarding the engine.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    /// Set while a guarded operation is in flight
    locked: AtomicBool,
}

/// Proof that the guard is held. Releases it when dropped.
#[derive(Debug)]
#[must_use = "the guard is released as soon as the lock is dropped"]
pub struct ReentrancyLock<'a> {
    /// The guard this lock releases
    guard: &'a ReentrancyGuard,
}

impl ReentrancyGuard {
    /// Creates an open guard
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Takes the lock, or fails with [`EngineError::ReentrantCall`] if it is already held
    ///
    /// # Errors
    /// * If another guarded call is still in flight
    pub fn enter(&self) -> Result<ReentrancyLock<'_>, EngineError> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Reentrant call refused");
            return Err(EngineError::ReentrantCall);
        }
        Ok(ReentrancyLock { guard: self })
    }

    /// Whether a guarded call is in flight
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

impl Drop for ReentrancyLock<'_> {
    fn drop(&mut self) {
        self.guard.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_second_entry_is_refused() {
        let guard = ReentrancyGuard::new();
        let lock = guard.enter().unwrap();
        assert!(guard.is_locked());
        assert!(matches!(guard.enter(), Err(EngineError::ReentrantCall)));
        drop(lock);
        assert!(!guard.is_locked());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_released_on_early_return() {
        fn guarded(guard: &ReentrancyGuard) -> Result<(), EngineError> {
            let _lock = guard.enter()?;
            Err(EngineError::Overflow)
        }

        let guard = ReentrancyGuard::new();
        assert!(guarded(&guard).is_err());
        assert!(!guard.is_locked());
    }

    #[test]
    fn test_released_on_panic() {
        let guard = ReentrancyGuard::new();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _lock = guard.enter().unwrap();
            panic!("venue blew up");
        }));
        assert!(result.is_err());
        assert!(!guard.is_locked());
    }
}
