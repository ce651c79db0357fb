//! In-memory [`MapSurface`] that tracks which primitives are live.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use amanai_incident_models::LayerKind;

use crate::{MapPrimitive, MapSurface, PrimitiveId};

/// A map that only remembers what is currently drawn on it.
#[derive(Debug, Default)]
pub struct MemoryMap {
    next_id: Cell<u64>,
    live: RefCell<BTreeMap<PrimitiveId, (LayerKind, MapPrimitive)>>,
}

impl MemoryMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live primitives drawn for `kind`.
    #[must_use]
    pub fn count(&self, kind: LayerKind) -> usize {
        self.live.borrow().values().filter(|(k, _)| *k == kind).count()
    }

    /// Number of live primitives across every kind.
    #[must_use]
    pub fn total(&self) -> usize {
        self.live.borrow().len()
    }

    /// Clones the live primitives drawn for `kind`, in draw order.
    #[must_use]
    pub fn primitives(&self, kind: LayerKind) -> Vec<MapPrimitive> {
        self.live
            .borrow()
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl MapSurface for MemoryMap {
    fn draw(&self, kind: LayerKind, primitive: &MapPrimitive) -> PrimitiveId {
        let id = PrimitiveId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.live.borrow_mut().insert(id, (kind, primitive.clone()));
        id
    }

    fn remove(&self, id: PrimitiveId) {
        self.live.borrow_mut().remove(&id);
    }
}
