//! Layer-indexed adapter directory.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::adapter::AdapterHandle;
use crate::error::{BridgeError, BridgeResult};
use crate::layer::{LAYER_MAX, Layer};
use crate::topology::TopologyManager;

/// Fixed-size directory of installed adapters, one slot per layer.
///
/// Lookups return acquired handles, so an adapter fetched here stays alive
/// even if its slot is overwritten before the caller is done with it.
pub struct AdapterRegistry {
    manager: Arc<dyn TopologyManager>,
    slots: RwLock<[Option<AdapterHandle>; LAYER_MAX]>,
}

impl AdapterRegistry {
    /// Empty registry bound to `manager`.
    #[must_use]
    pub fn new(manager: Arc<dyn TopologyManager>) -> Self {
        Self {
            manager,
            slots: RwLock::new(std::array::from_fn(|_| None)),
        }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<dyn TopologyManager> {
        &self.manager
    }

    /// Install `adapter` in its layer's slot.
    ///
    /// Overwrites any occupant and hands the displaced handle back to the
    /// caller.
    ///
    /// # Errors
    ///
    /// `LayerMismatch` if the adapter was built for a different layer than
    /// `layer`; the slot keeps its current occupant. This precondition is
    /// stricter than a bare slot overwrite (see DESIGN.md, "Register overwrite").
    pub fn register(
        &self,
        layer: Layer,
        adapter: AdapterHandle,
    ) -> BridgeResult<Option<AdapterHandle>> {
        if adapter.layer() != layer {
            return Err(BridgeError::LayerMismatch {
                slot: layer,
                adapter: adapter.layer(),
            });
        }
        Ok(self.slots.write()[layer.index()].replace(adapter))
    }

    /// [`register`](Self::register) by raw slot index.
    pub fn register_index(
        &self,
        index: usize,
        adapter: AdapterHandle,
    ) -> BridgeResult<Option<AdapterHandle>> {
        self.register(Layer::from_index(index)?, adapter)
    }

    /// Empty `layer`'s slot, returning the previous occupant.
    pub fn unregister(&self, layer: Layer) -> Option<AdapterHandle> {
        self.slots.write()[layer.index()].take()
    }

    /// Acquired handle for `layer`, if installed.
    #[must_use]
    pub fn get(&self, layer: Layer) -> Option<AdapterHandle> {
        self.slots.read()[layer.index()]
            .as_ref()
            .map(AdapterHandle::acquire)
    }

    /// [`get`](Self::get) by raw slot index.
    pub fn get_index(&self, index: usize) -> BridgeResult<Option<AdapterHandle>> {
        Ok(self.get(Layer::from_index(index)?))
    }

    /// Both endpoints of a transition under a single read lock.
    #[must_use]
    pub fn get_pair(
        &self,
        from: Layer,
        to: Layer,
    ) -> (Option<AdapterHandle>, Option<AdapterHandle>) {
        let slots = self.slots.read();
        (
            slots[from.index()].as_ref().map(AdapterHandle::acquire),
            slots[to.index()].as_ref().map(AdapterHandle::acquire),
        )
    }

    /// Layers that currently have an adapter.
    #[must_use]
    pub fn installed_layers(&self) -> Vec<Layer> {
        let slots = self.slots.read();
        Layer::ALL
            .into_iter()
            .filter(|layer| slots[layer.index()].is_some())
            .collect()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("installed", &self.installed_layers())
            .finish_non_exhaustive()
    }
}
