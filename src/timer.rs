//! Cancellation tokens, deferred one-shot timers and named task spawning.
//!
//! Every background activity in the panel sleeps through a [`CancelToken`]:
//! timed output effects, the polling loop and debounce re-verification.
//! Cancelling the token wakes the sleeper at once, so stopping never waits
//! out a remaining sleep.
//!
//! ```text
//!   owner ── cancel() ──▶ CancelToken ──▶ sleep() returns false
//!                              ▲
//!   task  ── sleep(d) ─────────┘
//! ```

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::debug;

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// All state guarded in this crate is plain data that stays consistent
/// across a panic mid-update, so recovery is always safe.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spawn a named thread.
pub fn spawn_task(
    name: &str,
    f: impl FnOnce() + Send + 'static,
) -> std::io::Result<JoinHandle<()>> {
    debug!("Spawning '{}'", name);
    std::thread::Builder::new().name(name.to_owned()).spawn(f)
}

// ───────────────────────────────────────────────────────────────
// CancelToken
// ───────────────────────────────────────────────────────────────

/// Shared one-way cancellation flag with an interruptible sleep.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake every sleeper.
    pub fn cancel(&self) {
        *lock(&self.inner.cancelled) = true;
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *lock(&self.inner.cancelled)
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` when the full duration elapsed and `false` when the
    /// token was (or already is) cancelled. A duration past the end of the
    /// clock's range waits for cancellation only.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);
        let mut cancelled = lock(&self.inner.cancelled);
        loop {
            if *cancelled {
                return false;
            }
            cancelled = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return true;
                    }
                    self.inner
                        .wake
                        .wait_timeout(cancelled, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .inner
                    .wake
                    .wait(cancelled)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}

// ───────────────────────────────────────────────────────────────
// OneShotTimer
// ───────────────────────────────────────────────────────────────

/// A deferred callback on its own thread that can be cancelled before it
/// fires.
///
/// The callback receives the timer's token. A callback that takes a lock
/// before acting should re-check [`CancelToken::is_cancelled`] under that
/// lock: a cancel can land between the sleep ending and the lock being
/// acquired.
#[derive(Debug)]
pub struct OneShotTimer {
    token: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl OneShotTimer {
    pub fn start(
        name: &str,
        delay: Duration,
        callback: impl FnOnce(&CancelToken) + Send + 'static,
    ) -> std::io::Result<Self> {
        let token = CancelToken::new();
        let sleeper = token.clone();
        let handle = spawn_task(name, move || {
            if sleeper.sleep(delay) {
                callback(&sleeper);
            }
        })?;
        Ok(Self {
            token,
            handle: Some(handle),
        })
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Wait for the timer thread to exit. Cancels first when `cancel` is set.
    pub fn join(mut self, cancel: bool) {
        if cancel {
            self.token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
