//! Single-handle-per-kind overlay registry.
//!
//! Each [`LayerKind`] owns one slot. A slot holds at most one layer
//! handle (the ids of every primitive drawn for that kind), the
//! kind's desired visibility, and a generation counter. Every operation
//! that changes what the user asked for bumps the generation, so a fetch
//! that resolves after a newer request (or after a toggle-off) sees a
//! stale generation and drops what it built instead of attaching it.
//!
//! Slot borrows are never held across an `.await` or while the surface
//! is being drawn to.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::future::Future;
use std::rc::Rc;

use amanai_incident_models::LayerKind;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::{MapPrimitive, MapSurface, PrimitiveId};

/// Visible lifecycle state of one layer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayerStatus {
    /// Nothing requested, nothing drawn.
    Hidden,
    /// A fetch for this kind is in flight.
    Loading,
    /// The kind is on. Its handle may be empty if the last fetch returned
    /// nothing.
    Shown,
    /// The last fetch failed and nothing is drawn. Behaves as `Hidden`.
    Failed,
}

/// Result of a registry operation that may have had to wait on a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerOutcome {
    /// A new handle with this many primitives is attached (zero means the
    /// slot was left empty).
    Shown(usize),
    /// The kind was hidden.
    Hidden,
    /// The fetch resolved after a newer request for the same kind; its
    /// result was dropped.
    Superseded,
}

/// The live primitives of one kind.
#[derive(Debug)]
struct LayerHandle {
    ids: Vec<PrimitiveId>,
}

#[derive(Debug, Default)]
struct Slot {
    handle: Option<LayerHandle>,
    desired: bool,
    generation: u64,
    pending: Option<u64>,
    failed: bool,
}

impl Slot {
    /// Records a new request and returns its generation.
    const fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    const fn is_current(&self, generation: u64) -> bool {
        self.desired && self.generation == generation
    }
}

/// Owner of every overlay drawn on a [`MapSurface`].
pub struct LayerRegistry<S: MapSurface> {
    surface: Rc<S>,
    slots: RefCell<BTreeMap<LayerKind, Slot>>,
}

#[allow(clippy::future_not_send)]
impl<S: MapSurface> LayerRegistry<S> {
    /// Creates a registry drawing onto `surface`, with every kind hidden.
    pub fn new(surface: Rc<S>) -> Self {
        Self {
            surface,
            slots: RefCell::new(BTreeMap::new()),
        }
    }

    /// Current lifecycle state of `kind`.
    #[must_use]
    pub fn status(&self, kind: LayerKind) -> LayerStatus {
        let slots = self.slots.borrow();
        let Some(slot) = slots.get(&kind) else {
            return LayerStatus::Hidden;
        };
        if slot.pending.is_some() {
            LayerStatus::Loading
        } else if slot.desired || slot.handle.is_some() {
            LayerStatus::Shown
        } else if slot.failed {
            LayerStatus::Failed
        } else {
            LayerStatus::Hidden
        }
    }

    /// Whether the user currently wants `kind` on the map (shown, or
    /// loading towards shown).
    #[must_use]
    pub fn is_desired(&self, kind: LayerKind) -> bool {
        self.slots.borrow().get(&kind).is_some_and(|s| s.desired)
    }

    /// Number of primitives owned by the current handle of `kind`.
    #[must_use]
    pub fn primitive_count(&self, kind: LayerKind) -> usize {
        self.slots
            .borrow()
            .get(&kind)
            .and_then(|s| s.handle.as_ref())
            .map_or(0, |h| h.ids.len())
    }

    /// Kinds the user has switched on, whether or not they currently
    /// have anything drawn.
    #[must_use]
    pub fn desired_kinds(&self) -> Vec<LayerKind> {
        self.slots
            .borrow()
            .iter()
            .filter(|(_, s)| s.desired)
            .map(|(k, _)| *k)
            .collect()
    }

    /// Replaces the handle of `kind` with `primitives`.
    ///
    /// The previous handle is fully disposed before anything new is
    /// attached. An empty `primitives` leaves the slot without a handle
    /// but the kind stays on. Supersedes any fetch still pending for
    /// `kind`.
    pub fn show(&self, kind: LayerKind, primitives: Vec<MapPrimitive>) -> usize {
        let old = {
            let mut slots = self.slots.borrow_mut();
            let slot = slots.entry(kind).or_default();
            slot.bump();
            slot.pending = None;
            slot.failed = false;
            slot.desired = true;
            slot.handle.take()
        };
        self.attach(kind, old, primitives)
    }

    /// Disposes the handle of `kind`, if any, and cancels any pending
    /// fetch. Safe to call on a hidden kind.
    pub fn hide(&self, kind: LayerKind) -> usize {
        let old = {
            let mut slots = self.slots.borrow_mut();
            let Some(slot) = slots.get_mut(&kind) else {
                return 0;
            };
            slot.bump();
            slot.pending = None;
            slot.failed = false;
            slot.desired = false;
            slot.handle.take()
        };
        let removed = old.map_or(0, |h| self.dispose(kind, h));
        if removed > 0 {
            log::debug!("Hid {kind} layer ({removed} primitives removed)");
        }
        removed
    }

    /// Hides `kind` if it is on or loading; otherwise runs
    /// `fetch_and_build` and shows its result.
    ///
    /// If the kind is toggled off (or refreshed again) while the fetch is
    /// pending, the late result is dropped and [`LayerOutcome::Superseded`]
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns the producer's error if the fetch fails. The slot is left
    /// without a handle.
    pub async fn toggle<F, Fut, E>(
        &self,
        kind: LayerKind,
        fetch_and_build: F,
    ) -> Result<LayerOutcome, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<MapPrimitive>, E>>,
    {
        if self.is_desired(kind) {
            self.hide(kind);
            return Ok(LayerOutcome::Hidden);
        }
        self.refresh(kind, fetch_and_build).await
    }

    /// Re-fetches `kind` and replaces its handle with the result, marking
    /// the kind as desired-visible.
    ///
    /// On failure the slot keeps whatever handle it had before the fetch
    /// was issued, and a kind that was already on stays on.
    ///
    /// # Errors
    ///
    /// Returns the producer's error if the fetch fails and no newer request
    /// has superseded it.
    pub async fn refresh<F, Fut, E>(
        &self,
        kind: LayerKind,
        fetch_and_build: F,
    ) -> Result<LayerOutcome, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<MapPrimitive>, E>>,
    {
        let (generation, was_on) = {
            let mut slots = self.slots.borrow_mut();
            let slot = slots.entry(kind).or_default();
            let generation = slot.bump();
            let was_on = slot.desired;
            slot.desired = true;
            slot.failed = false;
            slot.pending = Some(generation);
            (generation, was_on)
        };
        log::debug!("Loading {kind} layer (generation {generation})");

        let result = fetch_and_build().await;

        let mut slots = self.slots.borrow_mut();
        let slot = slots.entry(kind).or_default();
        if !slot.is_current(generation) {
            drop(slots);
            match result {
                Ok(primitives) => log::info!(
                    "Dropping {} stale {kind} primitives (generation {generation})",
                    primitives.len()
                ),
                Err(_) => log::info!("Ignoring failed stale {kind} fetch (generation {generation})"),
            }
            return Ok(LayerOutcome::Superseded);
        }
        slot.pending = None;

        match result {
            Ok(primitives) => {
                let old = slot.handle.take();
                drop(slots);
                Ok(LayerOutcome::Shown(self.attach(kind, old, primitives)))
            }
            Err(e) => {
                slot.desired = was_on || slot.handle.is_some();
                slot.failed = !slot.desired;
                Err(e)
            }
        }
    }

    /// Disposes every handle and cancels every pending fetch.
    pub fn clear_all(&self) {
        let kinds: Vec<LayerKind> = self.slots.borrow().keys().copied().collect();
        for kind in kinds {
            self.hide(kind);
        }
    }

    /// Disposes `old` and attaches `primitives` as the new handle.
    fn attach(
        &self,
        kind: LayerKind,
        old: Option<LayerHandle>,
        primitives: Vec<MapPrimitive>,
    ) -> usize {
        let removed = old.map_or(0, |h| self.dispose(kind, h));
        if primitives.is_empty() {
            log::debug!("{kind} layer empty ({removed} primitives removed)");
            return 0;
        }

        let ids: Vec<PrimitiveId> = primitives
            .iter()
            .map(|p| self.surface.draw(kind, p))
            .collect();
        let count = ids.len();
        log::debug!("Showing {kind} layer ({count} primitives, {removed} replaced)");

        if let Some(slot) = self.slots.borrow_mut().get_mut(&kind) {
            slot.handle = Some(LayerHandle { ids });
        }
        count
    }

    fn dispose(&self, kind: LayerKind, handle: LayerHandle) -> usize {
        let count = handle.ids.len();
        for id in handle.ids {
            self.surface.remove(id);
        }
        log::trace!("Disposed {count} {kind} primitives");
        count
    }
}
