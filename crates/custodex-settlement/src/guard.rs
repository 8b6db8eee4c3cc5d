//! Non-reentrant execution guard.
//!
//! A value or asset transfer may invoke arbitrary external code. While an
//! externally-effecting operation is mid-flight, the ledger holds states
//! (debited but not yet transferred) that must never be visible to a
//! recursive call. The guard is a single mutual-exclusion flag acquired
//! before the first mutation and released on every exit path, including
//! failure.

use std::cell::Cell;

use custodex_types::{MarketError, Result};

/// Single-entry flag guarding externally-effecting operations.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    engaged: Cell<bool>,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            engaged: Cell::new(false),
        }
    }

    /// Acquire the guard for the duration of the returned scope.
    ///
    /// # Errors
    /// Returns `ReentrantCall` if an operation is already mid-flight.
    pub fn enter(&self) -> Result<GuardScope<'_>> {
        if self.engaged.replace(true) {
            return Err(MarketError::ReentrantCall);
        }
        Ok(GuardScope { guard: self })
    }

    /// Whether an operation currently holds the guard.
    #[must_use]
    pub fn is_engaged(&self) -> bool {
        self.engaged.get()
    }
}

/// Releases the guard when dropped, on success and failure paths alike.
#[derive(Debug)]
pub struct GuardScope<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        self.guard.engaged.set(false);
    }
}
