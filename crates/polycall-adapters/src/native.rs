//! Native/core layer adapter. No runtime discipline beyond the gated entry.

use std::sync::Arc;

use polycall_bridge::{Adapter, AdapterHandle, BridgeResult, Layer, TopologyManager, Transition};

use crate::hook::{TransitionHook, run_hook};

#[derive(Default)]
pub struct NativeAdapter {
    hook: Option<Arc<dyn TransitionHook>>,
}

impl NativeAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn TransitionHook>) -> Self {
        self.hook = Some(hook);
        self
    }
}

impl Adapter for NativeAdapter {
    fn language(&self) -> &'static str {
        "native"
    }

    fn on_enter(&self, transition: &Transition) -> BridgeResult<()> {
        run_hook(self.hook.as_ref(), transition)
    }
}

pub fn create_native_adapter(manager: Arc<dyn TopologyManager>) -> BridgeResult<AdapterHandle> {
    AdapterHandle::new(Layer::Native, manager, Box::new(NativeAdapter::new()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use polycall_bridge::{BridgeError, ThreadKey, TopologyMatrix};

    use super::*;

    #[test]
    fn hook_runs_only_for_permitted_entries() {
        let matrix = Arc::new(TopologyMatrix::new());
        matrix.allow(Layer::Go, Layer::Native);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let hook = move |_: &Transition| -> BridgeResult<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let adapter = NativeAdapter::new().with_hook(Arc::new(hook));
        let native = AdapterHandle::new(Layer::Native, matrix, Box::new(adapter)).unwrap();
        let me = ThreadKey::from_raw(3);

        native
            .enter(&Transition::new(me, Layer::Go, Layer::Native))
            .unwrap();
        let err = native
            .enter(&Transition::new(me, Layer::Python, Layer::Native))
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::TopologyViolation {
                from: Layer::Python,
                to: Layer::Native
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hook_failure_surfaces_adapter_code() {
        let hook = |t: &Transition| -> BridgeResult<()> {
            Err(BridgeError::AdapterFailure {
                layer: t.to,
                code: 12,
            })
        };
        let adapter = NativeAdapter::new().with_hook(Arc::new(hook));
        let native = AdapterHandle::new(
            Layer::Native,
            Arc::new(TopologyMatrix::fully_connected()),
            Box::new(adapter),
        )
        .unwrap();
        let err = native
            .enter(&Transition::new(ThreadKey::from_raw(1), Layer::Go, Layer::Native))
            .unwrap_err();
        assert_eq!(err.code(), 12);
    }
}
