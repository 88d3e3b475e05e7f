//! ABI layer for the adapter registry and transition orchestration.
//!
//! A registry handed to C wraps an [`AdapterOrchestrator`], so transitions
//! driven through the ABI are counted and traced according to
//! `POLYCALL_TRACE`; traced events go to stderr as JSON lines.

use std::ffi::c_int;
use std::io;
use std::ptr;
use std::sync::Arc;

use polycall_bridge::{
    AdapterBase, AdapterOrchestrator, AdapterRegistry, JsonlTraceSink, ThreadKey,
    TopologyManager, TopologyMatrix, TraceMode, status_code, trace_mode,
};

use crate::util::{adapter_into_raw, adapter_ref, layer_from_c, topology_ref};

/// Opaque registry object owned by the C caller.
pub struct PolycallRegistry {
    orchestrator: AdapterOrchestrator,
}

impl PolycallRegistry {
    fn new(manager: Arc<dyn TopologyManager>) -> Self {
        let registry = Arc::new(AdapterRegistry::new(manager));
        let mut orchestrator = AdapterOrchestrator::new(registry);
        if trace_mode() != TraceMode::Off {
            orchestrator = orchestrator.with_sink(Arc::new(JsonlTraceSink::new(io::stderr())));
        }
        Self { orchestrator }
    }

    #[must_use]
    pub fn orchestrator(&self) -> &AdapterOrchestrator {
        &self.orchestrator
    }

    fn registry(&self) -> &AdapterRegistry {
        self.orchestrator.registry()
    }
}

/// Create an empty registry governed by `topology` and store it in `*out`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_registry_init(
    out: *mut *mut PolycallRegistry,
    topology: *const TopologyMatrix,
) -> c_int {
    if out.is_null() {
        return -1;
    }
    // SAFETY: C callers pass topologies under the `polycall_topology_create` contract.
    let Some(matrix) = (unsafe { topology_ref(topology) }) else {
        return -1;
    };
    let registry = Box::new(PolycallRegistry::new(matrix));
    // SAFETY: `out` is non-null and points to writable storage per the caller.
    unsafe { out.write(Box::into_raw(registry)) };
    0
}

/// Free a registry, dropping its references to every installed adapter.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_registry_destroy(registry: *mut PolycallRegistry) -> c_int {
    if registry.is_null() {
        return -1;
    }
    // SAFETY: `registry` came from `polycall_registry_init` and is destroyed once.
    drop(unsafe { Box::from_raw(registry) });
    0
}

/// Install `adapter` at `layer`. The registry takes its own reference; the
/// caller keeps theirs. Whatever the slot held before is released.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_registry_register(
    registry: *const PolycallRegistry,
    layer: c_int,
    adapter: *const AdapterBase,
) -> c_int {
    // SAFETY: null-checked by `as_ref`; otherwise a live registry.
    let Some(registry) = (unsafe { registry.as_ref() }) else {
        return -1;
    };
    let Some(layer) = layer_from_c(layer) else {
        return -1;
    };
    // SAFETY: caller holds a live reference to `adapter`.
    let Some(handle) = (unsafe { adapter_ref(adapter) }) else {
        return -1;
    };
    match registry.registry().register(layer, handle) {
        Ok(_displaced) => 0,
        Err(_) => -1,
    }
}

/// Acquired adapter at `layer`, or null. Release it with
/// `polycall_adapter_release`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_registry_get(
    registry: *const PolycallRegistry,
    layer: c_int,
) -> *const AdapterBase {
    // SAFETY: null-checked by `as_ref`; otherwise a live registry.
    let Some(registry) = (unsafe { registry.as_ref() }) else {
        return ptr::null();
    };
    layer_from_c(layer)
        .and_then(|layer| registry.registry().get(layer))
        .map_or(ptr::null(), adapter_into_raw)
}

/// Move `thread_id` from layer `from` to layer `to`.
///
/// `0` on success; otherwise the failure code (`-1`, or the code an adapter
/// hook reported).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_orchestrate_transition(
    registry: *const PolycallRegistry,
    thread_id: u64,
    from: c_int,
    to: c_int,
) -> c_int {
    // SAFETY: null-checked by `as_ref`; otherwise a live registry.
    let Some(registry) = (unsafe { registry.as_ref() }) else {
        return -1;
    };
    let (Some(from), Some(to)) = (layer_from_c(from), layer_from_c(to)) else {
        return -1;
    };
    let result = registry
        .orchestrator
        .transition(ThreadKey::from_raw(thread_id), from, to);
    status_code(&result)
}

/// Dry-run legality check of `from -> to` through the installed source adapter.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_check_transition(
    registry: *const PolycallRegistry,
    from: c_int,
    to: c_int,
) -> c_int {
    // SAFETY: null-checked by `as_ref`; otherwise a live registry.
    let Some(registry) = (unsafe { registry.as_ref() }) else {
        return -1;
    };
    let (Some(from), Some(to)) = (layer_from_c(from), layer_from_c(to)) else {
        return -1;
    };
    status_code(&registry.orchestrator.check(from, to))
}

/// Identifier of the calling OS thread, for `polycall_orchestrate_transition`.
#[unsafe(no_mangle)]
pub extern "C" fn polycall_current_thread_id() -> u64 {
    ThreadKey::current().as_u64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter_abi::{
        polycall_adapter_release, polycall_create_go_adapter, polycall_create_native_adapter,
    };
    use crate::topology_abi::{polycall_topology_create, polycall_topology_release};

    #[test]
    fn init_requires_out_and_topology() {
        let topology = polycall_topology_create(1);
        let mut registry: *mut PolycallRegistry = ptr::null_mut();
        // SAFETY: nulls are explicitly handled; `registry` is destroyed once.
        unsafe {
            assert_eq!(polycall_registry_init(ptr::null_mut(), topology), -1);
            assert_eq!(polycall_registry_init(&mut registry, ptr::null()), -1);
            assert!(registry.is_null());
            assert_eq!(polycall_registry_init(&mut registry, topology), 0);
            assert!(!registry.is_null());
            assert_eq!(polycall_registry_destroy(registry), 0);
            assert_eq!(polycall_registry_destroy(ptr::null_mut()), -1);
            polycall_topology_release(topology);
        }
    }

    #[test]
    fn register_rejects_mismatched_slot() {
        let topology = polycall_topology_create(1);
        let mut registry: *mut PolycallRegistry = ptr::null_mut();
        // SAFETY: all pointers stay live until released below.
        unsafe {
            polycall_registry_init(&mut registry, topology);
            let go = polycall_create_go_adapter(topology);
            assert_eq!(polycall_registry_register(registry, 0, go), -1);
            assert_eq!(polycall_registry_register(registry, 7, go), -1);
            assert!(polycall_registry_get(registry, 1).is_null());
            assert_eq!(polycall_registry_register(registry, 1, go), 0);

            let fetched = polycall_registry_get(registry, 1);
            assert_eq!(fetched, go);
            polycall_adapter_release(fetched);

            polycall_adapter_release(go);
            polycall_registry_destroy(registry);
            polycall_topology_release(topology);
        }
    }

    #[test]
    fn orchestration_and_check_report_status() {
        let topology = polycall_topology_create(0);
        let mut registry: *mut PolycallRegistry = ptr::null_mut();
        let me = polycall_current_thread_id();
        // SAFETY: all pointers stay live until released below.
        unsafe {
            polycall_registry_init(&mut registry, topology);
            let go = polycall_create_go_adapter(topology);
            let native = polycall_create_native_adapter(topology);
            polycall_registry_register(registry, 1, go);
            polycall_registry_register(registry, 3, native);
            polycall_adapter_release(go);
            polycall_adapter_release(native);

            assert_eq!(polycall_check_transition(registry, 3, 1), -1);
            assert_eq!(polycall_orchestrate_transition(registry, me, 3, 1), -1);
            crate::topology_abi::polycall_topology_allow(topology, 3, 1);
            assert_eq!(polycall_check_transition(registry, 3, 1), 0);
            assert_eq!(polycall_orchestrate_transition(registry, me, 3, 1), 0);
            assert_eq!(polycall_orchestrate_transition(registry, me, 3, 9), -1);
            assert_eq!(polycall_orchestrate_transition(ptr::null(), me, 3, 1), -1);

            let stats = (*registry).orchestrator().stats();
            assert_eq!(stats.completed, 1);
            assert_eq!(stats.topology_rejections, 1);

            polycall_registry_destroy(registry);
            polycall_topology_release(topology);
        }
    }
}
