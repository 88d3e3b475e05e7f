//! Node.js adapter.
//!
//! Entry runs inside a native handle scope that is closed before returning on
//! every path. After a successful entry the registered async handle is
//! signalled so Node-side callbacks run on the event loop rather than on the
//! foreign calling thread. The signal is fire-and-forget: the entry has already
//! happened, so a failed send does not fail it.

mod env;

use std::sync::Arc;

use parking_lot::RwLock;
use polycall_bridge::{
    Adapter, AdapterBase, AdapterHandle, BridgeResult, Layer, TopologyManager, Transition,
};

pub use env::{AsyncSignal, EmulatedAsyncHandle, EmulatedNodeEnv, NodeEnv, ScopeId};

use crate::hook::{TransitionHook, run_hook};
use env::HandleScope;

pub struct NodeAdapter {
    env: Arc<dyn NodeEnv>,
    async_handle: RwLock<Option<Arc<dyn AsyncSignal>>>,
    hook: Option<Arc<dyn TransitionHook>>,
}

impl NodeAdapter {
    #[must_use]
    pub fn new(env: Arc<dyn NodeEnv>) -> Self {
        Self {
            env,
            async_handle: RwLock::new(None),
            hook: None,
        }
    }

    #[must_use]
    pub fn with_async_handle(self, handle: Arc<dyn AsyncSignal>) -> Self {
        self.register_async_handle(handle);
        self
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn TransitionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Install the handle signalled after each successful entry.
    pub fn register_async_handle(&self, handle: Arc<dyn AsyncSignal>) {
        *self.async_handle.write() = Some(handle);
    }

    pub fn clear_async_handle(&self) -> Option<Arc<dyn AsyncSignal>> {
        self.async_handle.write().take()
    }
}

impl Adapter for NodeAdapter {
    fn language(&self) -> &'static str {
        "nodejs"
    }

    fn enter_layer(&self, base: &AdapterBase, transition: &Transition) -> BridgeResult<()> {
        let _scope = HandleScope::open(self.env.as_ref())?;
        base.execute_transition(transition)?;
        let signal = self.async_handle.read().clone();
        if let Some(signal) = signal {
            // Wakeups coalesce on the loop; a dropped one is not an entry failure.
            let _ = signal.send();
        }
        Ok(())
    }

    fn on_enter(&self, transition: &Transition) -> BridgeResult<()> {
        run_hook(self.hook.as_ref(), transition)
    }

    fn cleanup(&self) {
        self.clear_async_handle();
    }
}

/// Build a Node.js adapter over `env`, optionally wired to an async handle.
pub fn create_nodejs_adapter(
    manager: Arc<dyn TopologyManager>,
    env: Arc<dyn NodeEnv>,
    async_handle: Option<Arc<dyn AsyncSignal>>,
) -> BridgeResult<AdapterHandle> {
    let adapter = NodeAdapter::new(env);
    if let Some(handle) = async_handle {
        adapter.register_async_handle(handle);
    }
    AdapterHandle::new(Layer::NodeJs, manager, Box::new(adapter))
}
