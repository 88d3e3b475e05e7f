//! ABI layer for adapter construction and reference counting.
//!
//! Adapters cross the boundary as `*const AdapterBase` pointers, each carrying
//! one reference. `polycall_adapter_release` on the last reference runs the
//! adapter's cleanup.

use std::ffi::c_int;
use std::ptr;
use std::sync::Arc;

use polycall_adapters::{
    create_go_adapter, create_native_adapter, create_nodejs_adapter, create_python_adapter,
};
use polycall_bridge::{AdapterBase, AdapterHandle, BridgeResult, TopologyManager, TopologyMatrix};

use crate::runtimes;
use crate::util::{adapter_into_raw, topology_ref};

/// # Safety
///
/// `topology` must be null or a live pointer from `polycall_topology_create`.
unsafe fn create_with(
    topology: *const TopologyMatrix,
    factory: impl FnOnce(Arc<dyn TopologyManager>) -> BridgeResult<AdapterHandle>,
) -> *const AdapterBase {
    // SAFETY: forwarded from the caller.
    let Some(matrix) = (unsafe { topology_ref(topology) }) else {
        return ptr::null();
    };
    let manager: Arc<dyn TopologyManager> = matrix;
    match factory(manager) {
        Ok(handle) => adapter_into_raw(handle),
        Err(_) => ptr::null(),
    }
}

/// Python adapter over the process-wide interpreter.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_create_python_adapter(
    topology: *const TopologyMatrix,
) -> *const AdapterBase {
    // SAFETY: C callers pass topologies under the `polycall_topology_create` contract.
    unsafe {
        create_with(topology, |manager| {
            create_python_adapter(manager, runtimes::interpreter())
        })
    }
}

/// Go adapter owned by the calling thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_create_go_adapter(
    topology: *const TopologyMatrix,
) -> *const AdapterBase {
    // SAFETY: as above.
    unsafe { create_with(topology, create_go_adapter) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_create_nodejs_adapter(
    topology: *const TopologyMatrix,
) -> *const AdapterBase {
    // SAFETY: as above.
    unsafe {
        create_with(topology, |manager| {
            create_nodejs_adapter(
                manager,
                runtimes::node_env(),
                Some(runtimes::node_async_handle()),
            )
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_create_native_adapter(
    topology: *const TopologyMatrix,
) -> *const AdapterBase {
    // SAFETY: as above.
    unsafe { create_with(topology, create_native_adapter) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_adapter_acquire(adapter: *const AdapterBase) -> c_int {
    if adapter.is_null() {
        return -1;
    }
    // SAFETY: caller holds a live reference to `adapter`.
    unsafe { Arc::increment_strong_count(adapter) };
    0
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_adapter_release(adapter: *const AdapterBase) -> c_int {
    if adapter.is_null() {
        return -1;
    }
    // SAFETY: caller gives up one live reference; the last one frees the adapter.
    unsafe { Arc::decrement_strong_count(adapter) };
    0
}

/// Layer id the adapter is bound to, or `-1` for null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_adapter_layer(adapter: *const AdapterBase) -> c_int {
    // SAFETY: null-checked by `as_ref`; otherwise the caller holds a reference.
    match unsafe { adapter.as_ref() } {
        Some(base) => base.layer().index() as c_int,
        None => -1,
    }
}
