//! Effect ownership for one output device.
//!
//! Every action on an output claims a new *generation*. A timed effect runs
//! on its own thread holding an [`EffectLease`] for the generation that
//! started it:
//!
//! ```text
//!   action A ─ supersede() ─▶ gen 1 ─ spawn ─▶ task A (lease gen 1)
//!   action B ─ supersede() ─▶ gen 2           task A: cancelled, not owner
//!                                               └─▶ exits, writes nothing
//!   stop()   ─ cancel only ──────────────────▶ task B: cancelled, owner
//!                                               └─▶ writes terminal state
//! ```
//!
//! - A **superseded** effect stops without touching the output again, so
//!   it can never overwrite what the new action did.
//! - A **stopped** effect (cancelled, no successor) still owns the output
//!   and drives it to its safe terminal state.
//!
//! Task handles stay in the slot until they are joined or have finished;
//! nothing is detached and forgotten.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use log::debug;

use crate::timer::{CancelToken, lock, spawn_task};

struct ActiveEffect {
    generation: u64,
    token: CancelToken,
    handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct SlotInner {
    active: Option<ActiveEffect>,
    retired: Vec<JoinHandle<()>>,
}

impl SlotInner {
    fn reap(&mut self) {
        self.retired.retain(|h| !h.is_finished());
    }
}

/// The single effect slot of an output device.
#[derive(Default)]
pub struct EffectSlot {
    generation: Arc<AtomicU64>,
    inner: Mutex<SlotInner>,
}

impl EffectSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cancel whatever is running and claim the output for a new action.
    /// Returns the new generation.
    pub fn supersede(&self) -> u64 {
        let mut inner = lock(&self.inner);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(active) = inner.active.take() {
            debug!("superseding effect generation {}", active.generation);
            active.token.cancel();
            if let Some(handle) = active.handle {
                inner.retired.push(handle);
            }
        }
        inner.reap();
        generation
    }

    /// Cancel the running effect without a successor. Returns `true` if an
    /// effect was running.
    pub fn stop(&self) -> bool {
        let inner = lock(&self.inner);
        match &inner.active {
            Some(active) if active.handle.as_ref().is_some_and(|h| !h.is_finished()) => {
                active.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Start `task` for `generation`. Does nothing if another action has
    /// claimed the output since `generation` was issued.
    pub fn spawn(
        &self,
        name: &str,
        generation: u64,
        task: impl FnOnce(EffectLease) + Send + 'static,
    ) -> std::io::Result<bool> {
        let mut inner = lock(&self.inner);
        if self.generation() != generation {
            return Ok(false);
        }
        let token = CancelToken::new();
        let lease = EffectLease {
            generation,
            token: token.clone(),
            owner: Arc::clone(&self.generation),
        };
        let handle = spawn_task(name, move || task(lease))?;
        inner.active = Some(ActiveEffect {
            generation,
            token,
            handle: Some(handle),
        });
        Ok(true)
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner)
            .active
            .as_ref()
            .and_then(|a| a.handle.as_ref())
            .is_some_and(|h| !h.is_finished())
    }

    /// Join every effect task, letting the current one run to completion.
    pub fn wait(&self) {
        for handle in self.take_handles(false) {
            let _ = handle.join();
        }
    }

    /// Cancel and join every effect task.
    pub fn shutdown(&self) {
        for handle in self.take_handles(true) {
            let _ = handle.join();
        }
    }

    fn take_handles(&self, cancel: bool) -> Vec<JoinHandle<()>> {
        let mut inner = lock(&self.inner);
        let mut handles = std::mem::take(&mut inner.retired);
        if let Some(active) = inner.active.as_mut() {
            if cancel {
                active.token.cancel();
            }
            handles.extend(active.handle.take());
        }
        handles
    }
}

/// A running effect's claim on its output.
pub struct EffectLease {
    generation: u64,
    token: CancelToken,
    owner: Arc<AtomicU64>,
}

impl EffectLease {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// No newer action has claimed the output.
    pub fn owns_output(&self) -> bool {
        self.owner.load(Ordering::SeqCst) == self.generation
    }

    /// Step writes need both ownership and no cancellation.
    pub fn may_write(&self) -> bool {
        !self.is_cancelled() && self.owns_output()
    }

    /// Interruptible sleep; `false` when cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        self.token.sleep(duration)
    }
}
