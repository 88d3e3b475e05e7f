//! Shared pointer and argument helpers for the ABI entry points.

use std::ffi::c_int;
use std::sync::Arc;

use polycall_bridge::{AdapterBase, AdapterHandle, Layer, TopologyMatrix};

/// Map a C layer id onto a [`Layer`]; negative or out-of-range ids are `None`.
pub(crate) fn layer_from_c(layer: c_int) -> Option<Layer> {
    let index = usize::try_from(layer).ok()?;
    Layer::from_index(index).ok()
}

/// Take a new reference to a topology handed out by `polycall_topology_create`.
///
/// # Safety
///
/// `ptr` must be null or a live pointer from `polycall_topology_create`.
pub(crate) unsafe fn topology_ref(ptr: *const TopologyMatrix) -> Option<Arc<TopologyMatrix>> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: caller guarantees `ptr` came from `Arc::into_raw` and is live;
    // the increment balances the `from_raw` below.
    unsafe {
        Arc::increment_strong_count(ptr);
        Some(Arc::from_raw(ptr))
    }
}

/// Take a new reference to an adapter handed out by this crate.
///
/// # Safety
///
/// `ptr` must be null or a live adapter pointer from this crate.
pub(crate) unsafe fn adapter_ref(ptr: *const AdapterBase) -> Option<AdapterHandle> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: as for `topology_ref`.
    unsafe {
        Arc::increment_strong_count(ptr);
        Some(AdapterHandle::from(Arc::from_raw(ptr)))
    }
}

/// Give a handle's reference to the C caller.
pub(crate) fn adapter_into_raw(handle: AdapterHandle) -> *const AdapterBase {
    Arc::into_raw(handle.into_arc())
}
