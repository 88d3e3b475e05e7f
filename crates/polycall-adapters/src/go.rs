//! Go adapter.
//!
//! Cross-runtime Go handles are only valid on the OS thread that created
//! them, so entry is refused from any other thread before any transition work
//! happens. Exit releases nothing.

use std::sync::Arc;

use polycall_bridge::{
    Adapter, AdapterBase, AdapterHandle, BridgeError, BridgeResult, Layer, ThreadKey,
    TopologyManager, Transition,
};

use crate::hook::{TransitionHook, run_hook};

pub struct GoAdapter {
    owner_thread: ThreadKey,
    hook: Option<Arc<dyn TransitionHook>>,
}

impl GoAdapter {
    /// Adapter owned by the calling thread.
    #[must_use]
    pub fn new() -> Self {
        Self::with_owner(ThreadKey::current())
    }

    #[must_use]
    pub fn with_owner(owner_thread: ThreadKey) -> Self {
        Self {
            owner_thread,
            hook: None,
        }
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn TransitionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    #[must_use]
    pub const fn owner_thread(&self) -> ThreadKey {
        self.owner_thread
    }
}

impl Default for GoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for GoAdapter {
    fn language(&self) -> &'static str {
        "go"
    }

    fn enter_layer(&self, base: &AdapterBase, transition: &Transition) -> BridgeResult<()> {
        if transition.thread != self.owner_thread {
            return Err(BridgeError::ThreadAffinity {
                layer: base.layer(),
                owner: self.owner_thread,
                caller: transition.thread,
            });
        }
        base.execute_transition(transition)
    }

    fn on_enter(&self, transition: &Transition) -> BridgeResult<()> {
        run_hook(self.hook.as_ref(), transition)
    }
}

/// Build a Go adapter owned by the calling thread.
pub fn create_go_adapter(manager: Arc<dyn TopologyManager>) -> BridgeResult<AdapterHandle> {
    create_go_adapter_for(manager, ThreadKey::current())
}

/// Build a Go adapter owned by `owner`.
pub fn create_go_adapter_for(
    manager: Arc<dyn TopologyManager>,
    owner: ThreadKey,
) -> BridgeResult<AdapterHandle> {
    AdapterHandle::new(Layer::Go, manager, Box::new(GoAdapter::with_owner(owner)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use polycall_bridge::TopologyMatrix;

    use super::*;

    fn counted(owner: ThreadKey) -> (AdapterHandle, Arc<AtomicUsize>) {
        let entries = Arc::new(AtomicUsize::new(0));
        let hook = {
            let entries = Arc::clone(&entries);
            Arc::new(move |_: &Transition| -> BridgeResult<()> {
                entries.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };
        let adapter = GoAdapter::with_owner(owner).with_hook(hook);
        let handle = AdapterHandle::new(
            Layer::Go,
            Arc::new(TopologyMatrix::fully_connected()),
            Box::new(adapter),
        )
        .unwrap();
        (handle, entries)
    }

    #[test]
    fn owner_thread_defaults_to_creator() {
        let adapter = GoAdapter::new();
        assert_eq!(adapter.owner_thread(), ThreadKey::current());
    }

    #[test]
    fn foreign_thread_is_refused_without_work() {
        let owner = ThreadKey::from_raw(100);
        let (go, entries) = counted(owner);
        let stranger = ThreadKey::from_raw(200);

        let err = go
            .enter(&Transition::new(stranger, Layer::Python, Layer::Go))
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::ThreadAffinity {
                layer: Layer::Go,
                owner,
                caller: stranger,
            }
        );
        assert_eq!(err.code(), -1);
        assert_eq!(entries.load(Ordering::SeqCst), 0);

        go.enter(&Transition::new(owner, Layer::Python, Layer::Go))
            .unwrap();
        assert_eq!(entries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exit_is_a_no_op_from_any_thread() {
        let (go, _) = counted(ThreadKey::from_raw(1));
        go.exit(&Transition::new(ThreadKey::from_raw(2), Layer::Go, Layer::Native))
            .unwrap();
    }
}
