//! ABI layer for topology construction and queries.

use std::ffi::c_int;
use std::sync::Arc;

use polycall_bridge::{TopologyManager, TopologyMatrix};

use crate::util::layer_from_c;

/// Create a topology. Nonzero `fully_connected` permits every pair; zero
/// denies everything. The caller owns one reference.
#[unsafe(no_mangle)]
pub extern "C" fn polycall_topology_create(fully_connected: c_int) -> *const TopologyMatrix {
    let matrix = if fully_connected != 0 {
        TopologyMatrix::fully_connected()
    } else {
        TopologyMatrix::new()
    };
    Arc::into_raw(Arc::new(matrix))
}

/// Drop the caller's reference. Registries and adapters built over the
/// topology keep their own.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_topology_release(topology: *const TopologyMatrix) -> c_int {
    if topology.is_null() {
        return -1;
    }
    // SAFETY: caller hands back a reference obtained from `polycall_topology_create`.
    unsafe { Arc::decrement_strong_count(topology) };
    0
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_topology_allow(
    topology: *const TopologyMatrix,
    from: c_int,
    to: c_int,
) -> c_int {
    // SAFETY: null-checked by `as_ref`; otherwise a live topology pointer.
    let Some(matrix) = (unsafe { topology.as_ref() }) else {
        return -1;
    };
    match (layer_from_c(from), layer_from_c(to)) {
        (Some(from), Some(to)) => {
            matrix.allow(from, to);
            0
        }
        _ => -1,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_topology_deny(
    topology: *const TopologyMatrix,
    from: c_int,
    to: c_int,
) -> c_int {
    // SAFETY: null-checked by `as_ref`; otherwise a live topology pointer.
    let Some(matrix) = (unsafe { topology.as_ref() }) else {
        return -1;
    };
    match (layer_from_c(from), layer_from_c(to)) {
        (Some(from), Some(to)) => {
            matrix.deny(from, to);
            0
        }
        _ => -1,
    }
}

/// `0` if `from -> to` is permitted, `-1` otherwise.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn polycall_topology_validate(
    topology: *const TopologyMatrix,
    from: c_int,
    to: c_int,
) -> c_int {
    // SAFETY: null-checked by `as_ref`; otherwise a live topology pointer.
    let Some(matrix) = (unsafe { topology.as_ref() }) else {
        return -1;
    };
    match (layer_from_c(from), layer_from_c(to)) {
        (Some(from), Some(to)) if matrix.permits(from, to) => 0,
        _ => -1,
    }
}
