//! Interpreter lock seam and an in-process emulation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};
use polycall_bridge::{BridgeError, BridgeResult, Layer, ThreadKey};

/// What `ensure` found, mirroring `PyGILState_STATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GilState {
    /// The calling thread already held the lock.
    Locked,
    /// The lock was taken by this call.
    Unlocked,
}

/// Host interpreter's global lock.
///
/// Every `ensure` that returns `Ok` must be paired with exactly one
/// `release` from the same thread.
pub trait InterpreterLock: Send + Sync {
    fn is_initialized(&self) -> bool {
        true
    }

    /// Acquire the lock for `thread`; may block while another thread holds it.
    fn ensure(&self, thread: ThreadKey) -> BridgeResult<GilState>;

    fn release(&self, thread: ThreadKey, state: GilState);
}

#[derive(Debug, Default)]
struct Holder {
    owner: Option<ThreadKey>,
    depth: u32,
}

/// Reentrant, thread-keyed lock with acquisition counters.
#[derive(Debug, Default)]
pub struct EmulatedInterpreter {
    holder: Mutex<Holder>,
    released: Condvar,
    finalized: AtomicBool,
    ensures: AtomicU64,
    releases: AtomicU64,
}

impl EmulatedInterpreter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shut the interpreter down; subsequent `ensure` calls fail.
    pub fn finalize(&self) {
        self.finalized.store(true, Ordering::Release);
    }

    /// Thread currently holding the lock.
    #[must_use]
    pub fn owner(&self) -> Option<ThreadKey> {
        self.holder.lock().owner
    }

    /// Reentrancy depth of the current holder.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.holder.lock().depth
    }

    #[must_use]
    pub fn ensure_count(&self) -> u64 {
        self.ensures.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn release_count(&self) -> u64 {
        self.releases.load(Ordering::Acquire)
    }

    /// `ensure` calls not yet matched by a `release`.
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.ensure_count().saturating_sub(self.release_count())
    }
}

impl InterpreterLock for EmulatedInterpreter {
    fn is_initialized(&self) -> bool {
        !self.finalized.load(Ordering::Acquire)
    }

    fn ensure(&self, thread: ThreadKey) -> BridgeResult<GilState> {
        if !self.is_initialized() {
            return Err(BridgeError::runtime(Layer::Python, "interpreter finalized"));
        }
        let mut holder = self.holder.lock();
        let state = if holder.owner == Some(thread) {
            holder.depth += 1;
            GilState::Locked
        } else {
            while holder.owner.is_some() {
                self.released.wait(&mut holder);
            }
            holder.owner = Some(thread);
            holder.depth = 1;
            GilState::Unlocked
        };
        self.ensures.fetch_add(1, Ordering::AcqRel);
        Ok(state)
    }

    fn release(&self, thread: ThreadKey, _state: GilState) {
        let mut holder = self.holder.lock();
        if holder.owner != Some(thread) {
            return;
        }
        holder.depth -= 1;
        if holder.depth == 0 {
            holder.owner = None;
            self.released.notify_one();
        }
        self.releases.fetch_add(1, Ordering::AcqRel);
    }
}
