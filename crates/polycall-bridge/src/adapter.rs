//! Adapter lifecycle primitive.
//!
//! Every concrete adapter is bound into an [`AdapterBase`], which carries the
//! layer id, the shared topology authority and the transition mutex. Lifetime
//! is governed by [`AdapterHandle`]: the adapter is cleaned up and freed
//! exactly when the last handle is released.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::BridgeResult;
use crate::layer::{Layer, ThreadKey};
use crate::topology::TopologyManager;
use crate::trace::TraceEvent;

/// One exit-then-enter request, identified by the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    pub thread: ThreadKey,
    pub from: Layer,
    pub to: Layer,
}

impl Transition {
    #[must_use]
    pub const fn new(thread: ThreadKey, from: Layer, to: Layer) -> Self {
        Self { thread, from, to }
    }
}

/// Language-specific entry/exit discipline.
///
/// Only `language` is required. Optional hooks default to no-op success.
pub trait Adapter: Send + Sync {
    /// Short runtime name for diagnostics.
    fn language(&self) -> &'static str;

    /// Runs once after the adapter is bound to `layer`. An error aborts
    /// construction.
    fn init(&self, _layer: Layer) -> BridgeResult<()> {
        Ok(())
    }

    /// Enter this adapter's layer. Implementations wrap
    /// [`AdapterBase::execute_transition`] in their runtime's discipline.
    fn enter_layer(&self, base: &AdapterBase, transition: &Transition) -> BridgeResult<()> {
        base.execute_transition(transition)
    }

    /// Leave this adapter's layer.
    fn exit_layer(&self, _transition: &Transition) -> BridgeResult<()> {
        Ok(())
    }

    /// Adapter-level veto, consulted before the topology check.
    fn validate_transition(&self, _transition: &Transition) -> BridgeResult<()> {
        Ok(())
    }

    /// Entry body, run under the transition mutex once topology allows it.
    fn on_enter(&self, _transition: &Transition) -> BridgeResult<()> {
        Ok(())
    }

    fn emit_trace(&self, _event: &TraceEvent) {}

    /// Releases language-specific resources. Runs exactly once, when the last
    /// handle is released.
    fn cleanup(&self) {}
}

/// An installed bridge endpoint for exactly one layer.
pub struct AdapterBase {
    layer: Layer,
    manager: Arc<dyn TopologyManager>,
    transition_lock: Mutex<()>,
    adapter: Box<dyn Adapter>,
}

impl AdapterBase {
    #[must_use]
    pub const fn layer(&self) -> Layer {
        self.layer
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<dyn TopologyManager> {
        &self.manager
    }

    #[must_use]
    pub fn language(&self) -> &'static str {
        self.adapter.language()
    }

    /// Gated entry used by `enter_layer` implementations.
    ///
    /// Adapter veto first, then the topology verdict for
    /// `transition.from -> transition.to` under this adapter's mutex, then the
    /// entry body. Transitions into the same adapter serialize here.
    pub fn execute_transition(&self, transition: &Transition) -> BridgeResult<()> {
        self.adapter.validate_transition(transition)?;
        let _serial = self.transition_lock.lock();
        self.manager
            .validate_transition(transition.from, transition.to)?;
        self.adapter.on_enter(transition)
    }

    /// Topology verdict for leaving this adapter's layer towards `target`.
    pub fn validate_outbound(&self, target: Layer) -> BridgeResult<()> {
        let _serial = self.transition_lock.lock();
        self.manager.validate_transition(self.layer, target)
    }

    /// Enter this layer through the adapter's discipline.
    pub fn enter(&self, transition: &Transition) -> BridgeResult<()> {
        self.adapter.enter_layer(self, transition)
    }

    /// Leave this layer through the adapter's discipline.
    pub fn exit(&self, transition: &Transition) -> BridgeResult<()> {
        self.adapter.exit_layer(transition)
    }

    pub fn emit_trace(&self, event: &TraceEvent) {
        self.adapter.emit_trace(event);
    }
}

impl Drop for AdapterBase {
    fn drop(&mut self) {
        self.adapter.cleanup();
    }
}

impl fmt::Debug for AdapterBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterBase")
            .field("layer", &self.layer)
            .field("language", &self.adapter.language())
            .finish_non_exhaustive()
    }
}

/// Counted reference to an [`AdapterBase`].
///
/// `acquire` is a relaxed increment; `release` (or drop) is an
/// acquire-release decrement, and the holder that takes the count to zero
/// runs `cleanup` and frees the adapter.
#[derive(Debug)]
pub struct AdapterHandle(Arc<AdapterBase>);

impl AdapterHandle {
    /// Bind `adapter` to `layer`, then run its `init` hook.
    ///
    /// The returned handle is the first reference (count 1). If `init` fails
    /// the adapter is dropped, which runs `cleanup`.
    pub fn new(
        layer: Layer,
        manager: Arc<dyn TopologyManager>,
        adapter: Box<dyn Adapter>,
    ) -> BridgeResult<Self> {
        let base = AdapterBase {
            layer,
            manager,
            transition_lock: Mutex::new(()),
            adapter,
        };
        base.adapter.init(layer)?;
        Ok(Self(Arc::new(base)))
    }

    /// Take an additional reference.
    #[must_use]
    pub fn acquire(&self) -> Self {
        Self(Arc::clone(&self.0))
    }

    /// Drop this reference.
    pub fn release(self) {
        drop(self);
    }

    /// Live reference count.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// True if both handles refer to the same adapter.
    #[must_use]
    pub fn same_adapter(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Unwrap into the shared pointer (used by the C surface).
    #[must_use]
    pub fn into_arc(self) -> Arc<AdapterBase> {
        self.0
    }
}

impl From<Arc<AdapterBase>> for AdapterHandle {
    fn from(inner: Arc<AdapterBase>) -> Self {
        Self(inner)
    }
}

impl Deref for AdapterHandle {
    type Target = AdapterBase;

    fn deref(&self) -> &AdapterBase {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::BridgeError;
    use crate::topology::TopologyMatrix;

    #[derive(Default)]
    struct Counters {
        cleanups: AtomicUsize,
        entries: AtomicUsize,
    }

    struct CountingAdapter {
        counters: Arc<Counters>,
        veto: bool,
        fail_init: bool,
    }

    impl CountingAdapter {
        fn boxed(counters: &Arc<Counters>) -> Box<dyn Adapter> {
            Box::new(Self {
                counters: Arc::clone(counters),
                veto: false,
                fail_init: false,
            })
        }
    }

    impl Adapter for CountingAdapter {
        fn language(&self) -> &'static str {
            "counting"
        }

        fn init(&self, layer: Layer) -> BridgeResult<()> {
            if self.fail_init {
                return Err(BridgeError::runtime(layer, "init refused"));
            }
            Ok(())
        }

        fn validate_transition(&self, transition: &Transition) -> BridgeResult<()> {
            if self.veto {
                return Err(BridgeError::AdapterFailure {
                    layer: transition.to,
                    code: 7,
                });
            }
            Ok(())
        }

        fn on_enter(&self, _transition: &Transition) -> BridgeResult<()> {
            self.counters.entries.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn cleanup(&self) {
            self.counters.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn manager(matrix: TopologyMatrix) -> Arc<dyn TopologyManager> {
        Arc::new(matrix)
    }

    #[test]
    fn handle_starts_at_one_and_cleans_up_once() {
        let counters = Arc::new(Counters::default());
        let handle = AdapterHandle::new(
            Layer::Go,
            manager(TopologyMatrix::new()),
            CountingAdapter::boxed(&counters),
        )
        .unwrap();
        assert_eq!(handle.ref_count(), 1);

        let second = handle.acquire();
        assert_eq!(handle.ref_count(), 2);
        assert!(second.same_adapter(&handle));

        second.release();
        assert_eq!(handle.ref_count(), 1);
        assert_eq!(counters.cleanups.load(Ordering::SeqCst), 0);

        handle.release();
        assert_eq!(counters.cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_init_aborts_construction() {
        let counters = Arc::new(Counters::default());
        let adapter = Box::new(CountingAdapter {
            counters: Arc::clone(&counters),
            veto: false,
            fail_init: true,
        });
        let result = AdapterHandle::new(Layer::Python, manager(TopologyMatrix::new()), adapter);
        assert!(matches!(
            result,
            Err(BridgeError::RuntimeUnavailable { layer: Layer::Python, .. })
        ));
        assert_eq!(counters.cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn execute_transition_consults_topology_before_entry_body() {
        let counters = Arc::new(Counters::default());
        let matrix = Arc::new(TopologyMatrix::new());
        let handle = AdapterHandle::new(
            Layer::Go,
            matrix.clone(),
            CountingAdapter::boxed(&counters),
        )
        .unwrap();
        let transition = Transition::new(ThreadKey::from_raw(1), Layer::Python, Layer::Go);

        assert_eq!(
            handle.execute_transition(&transition),
            Err(BridgeError::TopologyViolation {
                from: Layer::Python,
                to: Layer::Go,
            })
        );
        assert_eq!(counters.entries.load(Ordering::SeqCst), 0);

        matrix.allow(Layer::Python, Layer::Go);
        handle.execute_transition(&transition).unwrap();
        assert_eq!(counters.entries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn adapter_veto_stops_before_topology() {
        let counters = Arc::new(Counters::default());
        let adapter = Box::new(CountingAdapter {
            counters: Arc::clone(&counters),
            veto: true,
            fail_init: false,
        });
        let handle = AdapterHandle::new(
            Layer::NodeJs,
            manager(TopologyMatrix::fully_connected()),
            adapter,
        )
        .unwrap();
        let transition = Transition::new(ThreadKey::from_raw(1), Layer::Go, Layer::NodeJs);

        let err = handle.enter(&transition).unwrap_err();
        assert_eq!(err.code(), 7);
        assert_eq!(counters.entries.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn outbound_check_uses_own_layer_as_source() {
        let counters = Arc::new(Counters::default());
        let matrix = TopologyMatrix::new();
        matrix.allow(Layer::Native, Layer::Python);
        let handle = AdapterHandle::new(
            Layer::Native,
            manager(matrix),
            CountingAdapter::boxed(&counters),
        )
        .unwrap();

        assert!(handle.validate_outbound(Layer::Python).is_ok());
        assert!(handle.validate_outbound(Layer::Go).is_err());
    }
}
