//! # Key Readiness
//!
//! Wake-up signal between the engine's keys-updated notification and decrypt
//! calls blocked on a key that is not usable yet.
//!
//! The signal is not per key. Every notification bumps a generation counter
//! and wakes all waiters; each waiter then re-queries the status of its own
//! key. Reading the generation *before* querying the key status closes the
//! window where a notification lands between the query and the wait.

use parking_lot::{Condvar, Mutex};
use std::time::Instant;

/// Why a wait ended without a new notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    TimedOut,
    Cancelled,
}

#[derive(Debug, Default)]
struct ReadinessState {
    generation: u64,
    cancelled: bool,
}

/// Level-triggered key-arrival signal.
#[derive(Debug, Default)]
pub struct KeyReadiness {
    state: Mutex<ReadinessState>,
    condvar: Condvar,
}

impl KeyReadiness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current notification generation.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Record that key statuses changed and wake every waiter.
    pub fn notify(&self) {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        drop(state);
        self.condvar.notify_all();
    }

    /// Block until the generation moves past `seen`.
    ///
    /// Returns immediately if a notification already happened since `seen`
    /// was read. `deadline` of `None` waits without bound.
    ///
    /// # Errors
    ///
    /// [`WaitError::Cancelled`] once [`cancel`](Self::cancel) has been called,
    /// [`WaitError::TimedOut`] when `deadline` passes first.
    pub fn wait_for_change(&self, seen: u64, deadline: Option<Instant>) -> Result<(), WaitError> {
        let mut state = self.state.lock();

        loop {
            if state.cancelled {
                return Err(WaitError::Cancelled);
            }
            if state.generation != seen {
                return Ok(());
            }

            match deadline {
                None => self.condvar.wait(&mut state),
                Some(deadline) => {
                    if self.condvar.wait_until(&mut state, deadline).timed_out() {
                        if state.cancelled {
                            return Err(WaitError::Cancelled);
                        }
                        if state.generation != seen {
                            return Ok(());
                        }
                        return Err(WaitError::TimedOut);
                    }
                }
            }
        }
    }

    /// Fail every current and future wait with [`WaitError::Cancelled`].
    pub fn cancel(&self) {
        self.state.lock().cancelled = true;
        self.condvar.notify_all();
    }

    /// Allow waits again after [`cancel`](Self::cancel).
    pub fn reset(&self) {
        self.state.lock().cancelled = false;
    }
}
