//! Cooperative cancellation and wall-clock budgets.
//!
//! Strategies call [`SearchBudget::check`] between iterations and return the
//! best tour found so far when it reports an [`Interrupt`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared flag used to cancel an in-flight optimization.
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone, Default)]
pub struct SearchBudget {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl SearchBudget {
    /// No deadline, never cancelled unless the token is.
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_time_limit(limit: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(limit),
            token: CancellationToken::new(),
        }
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Tighten the deadline to `limit` from now if that is sooner.
    pub fn limited_to(mut self, limit: Option<Duration>) -> Self {
        if let Some(deadline) = limit.and_then(|limit| Instant::now().checked_add(limit)) {
            self.deadline = Some(self.deadline.map_or(deadline, |current| current.min(deadline)));
        }
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn check(&self) -> Option<Interrupt> {
        if self.token.is_cancelled() {
            return Some(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupt::TimedOut),
            _ => None,
        }
    }
}
