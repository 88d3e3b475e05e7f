//! Node environment seams: handle scopes and the event-loop wakeup.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use polycall_bridge::{BridgeError, BridgeResult, Layer};

/// Opaque token for an open handle scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u64);

/// Native handle-scope operations of the host environment.
pub trait NodeEnv: Send + Sync {
    fn open_handle_scope(&self) -> BridgeResult<ScopeId>;
    fn close_handle_scope(&self, scope: ScopeId);
}

/// Non-blocking wakeup of the host event loop (`uv_async_send`).
pub trait AsyncSignal: Send + Sync {
    fn send(&self) -> BridgeResult<()>;
}

/// Scope that is closed when dropped.
pub(crate) struct HandleScope<'env> {
    env: &'env dyn NodeEnv,
    id: ScopeId,
}

impl<'env> HandleScope<'env> {
    pub(crate) fn open(env: &'env dyn NodeEnv) -> BridgeResult<Self> {
        let id = env.open_handle_scope()?;
        Ok(Self { env, id })
    }
}

impl Drop for HandleScope<'_> {
    fn drop(&mut self) {
        self.env.close_handle_scope(self.id);
    }
}

/// Scope bookkeeping without a JS engine behind it.
#[derive(Debug, Default)]
pub struct EmulatedNodeEnv {
    next_id: AtomicU64,
    open: AtomicUsize,
    opened_total: AtomicU64,
}

impl EmulatedNodeEnv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scopes currently open.
    #[must_use]
    pub fn open_scopes(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn opened_total(&self) -> u64 {
        self.opened_total.load(Ordering::Acquire)
    }
}

impl NodeEnv for EmulatedNodeEnv {
    fn open_handle_scope(&self) -> BridgeResult<ScopeId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.open.fetch_add(1, Ordering::AcqRel);
        self.opened_total.fetch_add(1, Ordering::AcqRel);
        Ok(ScopeId(id))
    }

    fn close_handle_scope(&self, _scope: ScopeId) {
        self.open.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Async handle that counts wakeups; fails once closed.
#[derive(Debug, Default)]
pub struct EmulatedAsyncHandle {
    sends: AtomicU64,
    closed: AtomicBool,
}

impl EmulatedAsyncHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn sends(&self) -> u64 {
        self.sends.load(Ordering::Acquire)
    }
}

impl AsyncSignal for EmulatedAsyncHandle {
    fn send(&self) -> BridgeResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BridgeError::runtime(Layer::NodeJs, "async handle closed"));
        }
        self.sends.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
