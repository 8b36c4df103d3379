//! Cancellable execution context threaded through every migration step.
//!
//! A [`MigrationContext`] carries a cancellation flag and an optional
//! deadline. Clones share the same cancellation state, so a clone handed to
//! another thread (a signal handler, a watchdog) can stop a running
//! traversal. Child contexts observe their parent's cancellation, but
//! cancelling a child leaves the parent untouched.
//!
//! # Example
//!
//! ```rust
//! use stepwise::context::MigrationContext;
//! use std::time::Duration;
//!
//! let ctx = MigrationContext::new();
//! let step = ctx.with_timeout(Duration::from_secs(30));
//! assert!(step.check().is_ok());
//!
//! ctx.cancel();
//! assert!(step.is_cancelled());
//! ```

use crate::migration::MigrationError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Arc<Inner>>,
}

impl Inner {
    fn cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        self.parent.as_ref().is_some_and(|p| p.cancelled())
    }

    /// Earliest deadline along the parent chain
    fn effective_deadline(&self) -> Option<Instant> {
        let inherited = self.parent.as_ref().and_then(|p| p.effective_deadline());
        match (self.deadline, inherited) {
            (Some(own), Some(parent)) => Some(own.min(parent)),
            (own, parent) => own.or(parent),
        }
    }
}

/// Cancellation and deadline state for one `up`/`down` call
#[derive(Debug, Clone)]
pub struct MigrationContext {
    inner: Arc<Inner>,
}

impl Default for MigrationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationContext {
    /// A root context with no deadline
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline: None,
                parent: None,
            }),
        }
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline,
                parent: Some(Arc::clone(&self.inner)),
            }),
        }
    }

    /// A child context that can be cancelled on its own
    #[must_use]
    pub fn child(&self) -> Self {
        self.derive(None)
    }

    /// A child context that expires `timeout` from now
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.derive(Some(Instant::now() + timeout))
    }

    /// A child context that expires at `deadline`
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.derive(Some(deadline))
    }

    /// Cancel this context and every child derived from it
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// The effective deadline, taking parents into account
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.effective_deadline()
    }

    /// Time left before the deadline, `None` when there is no deadline
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Whether the context was cancelled or its deadline has passed
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled() || self.deadline_passed()
    }

    fn deadline_passed(&self) -> bool {
        self.deadline().is_some_and(|d| Instant::now() >= d)
    }

    /// Fail fast when the context is no longer live
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Cancelled` after [`cancel`](Self::cancel) on this
    /// context or a parent, and `MigrationError::DeadlineExceeded` once the
    /// deadline has passed.
    pub fn check(&self) -> Result<(), MigrationError> {
        if self.inner.cancelled() {
            return Err(MigrationError::Cancelled);
        }
        if self.deadline_passed() {
            return Err(MigrationError::DeadlineExceeded);
        }
        Ok(())
    }
}
