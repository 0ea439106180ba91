//! Snapshot listeners with disposable keys.
//!
//! Callbacks are never invoked at notification time. They are queued
//! together with the snapshot they should see, and the owner drains the
//! queue once it no longer holds any borrows (see
//! [`drain_due_notifications`](Listeners::drain_due_notifications)). A
//! listener that was unregistered between queueing and draining receives
//! nothing.

use std::rc::Rc;

use slotmap::SlotMap;

slotmap::new_key_type! {
    pub(crate) struct ListenerSlot;
}

/// Opaque handle returned by [`Listeners::register`]; handing it back to
/// [`Listeners::unregister`] halts delivery.
#[cfg_attr(target_arch = "wasm32", wasm_bindgen::prelude::wasm_bindgen)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListenerKey {
    pub(crate) slot: ListenerSlot,
}

pub struct Listeners<T> {
    callbacks: SlotMap<ListenerSlot, Rc<dyn Fn(&T)>>,
    pending: Vec<(ListenerSlot, T)>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            callbacks: SlotMap::with_key(),
            pending: Vec::new(),
        }
    }
}

impl<T: Clone + 'static> Listeners<T> {
    pub fn register(&mut self, callback: impl Fn(&T) + 'static) -> ListenerKey {
        ListenerKey {
            slot: self.callbacks.insert(Rc::new(callback)),
        }
    }

    pub fn unregister(&mut self, key: ListenerKey) {
        self.callbacks.remove(key.slot);
    }

    /// Queue a delivery of `snapshot` to every registered listener.
    pub fn queue_all(&mut self, snapshot: &T) {
        for slot in self.callbacks.keys() {
            self.pending.push((slot, snapshot.clone()));
        }
    }

    /// Queue a delivery to one listener: the immediate delivery a
    /// subscriber gets on registration.
    pub fn queue_for(&mut self, key: ListenerKey, snapshot: &T) {
        if self.callbacks.contains_key(key.slot) {
            self.pending.push((key.slot, snapshot.clone()));
        }
    }

    /// Take the queued deliveries as ready-to-run closures. The caller
    /// invokes them after dropping every borrow it holds, because many
    /// callbacks immediately call back into the owning type.
    pub fn drain_due_notifications(&mut self) -> Vec<Box<dyn FnOnce()>> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .filter_map(|(slot, snapshot)| {
                let callback = Rc::clone(self.callbacks.get(slot)?);
                Some(Box::new(move || callback(&snapshot)) as Box<dyn FnOnce()>)
            })
            .collect()
    }
}
