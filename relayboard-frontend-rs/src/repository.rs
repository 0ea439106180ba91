//! The synchronization layer between the UI and the remote store.
//!
//! The repository owns a mirror of the user's relay collection and a set of
//! snapshot listeners. Mutations go to the store first; the mirror moves
//! only once the store confirms, and every mirror change queues a snapshot
//! for the listeners. Borrow discipline matters here: we never hold a
//! borrow across an `.await` (everything a request needs is cloned out
//! first), and queued listener callbacks only run once the caller's
//! borrows are gone.

use std::cell::RefCell;

use patchbay::StoreError;
use patchbay::listeners::{ListenerKey, Listeners};
use patchbay::session::Session;
use patchbay::store::RemoteStore;

use crate::relays::{Relay, RelayCollection, RelayId, collection_from_value};

pub struct RelayRepository<S> {
    store: S,
    session: RefCell<Session>,
    shared: RefCell<Shared>,
}

#[derive(Default)]
struct Shared {
    mirror: RelayCollection,
    loaded_at_least_once: bool,
    listeners: Listeners<RelayCollection>,
}

impl<S: RemoteStore> RelayRepository<S> {
    pub fn new(store: S, session: Session) -> Self {
        Self {
            store,
            session: RefCell::new(session),
            shared: RefCell::new(Shared::default()),
        }
    }

    fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn user_id(&self) -> String {
        self.session.borrow().user_id.clone()
    }

    pub fn update_access_token(&self, access_token: String) {
        self.session.borrow_mut().update_access_token(access_token);
    }

    // every path is derived from the held session; nothing here can name
    // another user's data
    fn collection_path(&self) -> String {
        format!("users/{}/relays", self.session.borrow().user_id)
    }

    fn relay_path(&self, id: RelayId) -> String {
        format!("{}/{id}", self.collection_path())
    }

    /// Register a snapshot listener. It is queued one immediate delivery of
    /// the current mirror (empty until something loads) and hears about
    /// every change after that, until [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(&self, callback: impl Fn(&RelayCollection) + 'static) -> ListenerKey {
        let mut shared = self.shared.borrow_mut();
        let key = shared.listeners.register(callback);
        let snapshot = shared.mirror.clone();
        shared.listeners.queue_for(key, &snapshot);
        key
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.shared.borrow_mut().listeners.unregister(key);
    }

    /// The latest mirrored snapshot.
    pub fn relays(&self) -> RelayCollection {
        self.shared.borrow().mirror.clone()
    }

    pub fn loaded_at_least_once(&self) -> bool {
        self.shared.borrow().loaded_at_least_once
    }

    pub fn drain_due_notifications(&self) -> Vec<Box<dyn FnOnce()>> {
        self.shared.borrow_mut().listeners.drain_due_notifications()
    }

    fn apply_snapshot(&self, relays: RelayCollection) {
        let mut shared = self.shared.borrow_mut();
        shared.loaded_at_least_once = true;
        if shared.mirror != relays {
            shared.mirror = relays;
            let snapshot = shared.mirror.clone();
            shared.listeners.queue_all(&snapshot);
        }
    }

    fn commit(&self, change: impl FnOnce(&mut RelayCollection) -> bool) {
        let mut shared = self.shared.borrow_mut();
        if change(&mut shared.mirror) {
            let snapshot = shared.mirror.clone();
            shared.listeners.queue_all(&snapshot);
        }
    }

    /// Ingest a collection value pushed by the store's live channel.
    pub fn apply_remote_value(&self, value: &serde_json::Value) {
        self.apply_snapshot(collection_from_value(Some(value)));
    }

    /// One-shot read of the whole collection. Absent path is an empty
    /// collection. Refreshes the mirror but registers nothing.
    pub async fn fetch_all(&self) -> Result<RelayCollection, StoreError> {
        let session = self.session();
        let path = self.collection_path();
        let value = self.store.get(&session, &path).await?;
        let relays = collection_from_value(value.as_ref());
        self.apply_snapshot(relays.clone());
        Ok(relays)
    }

    /// Authoritative point read of one relay.
    pub async fn fetch_relay(&self, id: RelayId) -> Result<Option<Relay>, StoreError> {
        let session = self.session();
        let path = self.relay_path(id);
        match self.store.get(&session, &path).await? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Store(format!("malformed relay record {id}: {e}"))),
        }
    }

    /// Write a fresh record: given name, state off. An existing record at
    /// `id` is silently overwritten; avoiding collisions is the
    /// registration workflow's job.
    pub async fn create(&self, id: RelayId, device: &str) -> Result<(), StoreError> {
        let session = self.session();
        let path = self.relay_path(id);
        let fields = serde_json::json!({ "device": device, "state": false });
        self.store.update(&session, &path, fields).await?;

        self.commit(|mirror| {
            mirror.insert(
                id,
                Relay {
                    device: device.to_string(),
                    state: false,
                },
            );
            true
        });
        Ok(())
    }

    /// Merge-patch only the `state` field. Aborts with `NotFound` when the
    /// record is absent, so a patch can never conjure a partial record.
    pub async fn set_state(&self, id: RelayId, state: bool) -> Result<(), StoreError> {
        let session = self.session();
        let path = self.relay_path(id);
        if self.store.get(&session, &path).await?.is_none() {
            return Err(StoreError::NotFound);
        }
        let fields = serde_json::json!({ "state": state });
        self.store.update(&session, &path, fields).await?;

        self.commit(|mirror| match mirror.get_mut(&id) {
            Some(relay) if relay.state != state => {
                relay.state = state;
                true
            }
            _ => false,
        });
        Ok(())
    }

    /// Delete the record. Already-absent targets are fine.
    pub async fn remove(&self, id: RelayId) -> Result<(), StoreError> {
        let session = self.session();
        let path = self.relay_path(id);
        self.store.remove(&session, &path).await?;

        self.commit(|mirror| mirror.remove(&id).is_some());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use patchbay::memory::MemoryStore;
    use serde_json::json;
    use std::rc::Rc;

    fn repository() -> (MemoryStore, RelayRepository<MemoryStore>) {
        let store = MemoryStore::new();
        let session = Session::new("ada", "token-1");
        (store.clone(), RelayRepository::new(store, session))
    }

    fn flush(repository: &RelayRepository<MemoryStore>) {
        for notification in repository.drain_due_notifications() {
            notification();
        }
    }

    fn watch(
        repository: &RelayRepository<MemoryStore>,
    ) -> (ListenerKey, Rc<RefCell<Vec<RelayCollection>>>) {
        let snapshots = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&snapshots);
        let key = repository.subscribe(move |relays| sink.borrow_mut().push(relays.clone()));
        (key, snapshots)
    }

    fn stored(store: &MemoryStore, path: &str) -> Option<serde_json::Value> {
        block_on(store.get(&Session::new("ada", "token-1"), path)).unwrap()
    }

    #[test]
    fn test_paths_are_scoped_to_the_session_user() {
        let (_, repository) = repository();
        assert_eq!(repository.collection_path(), "users/ada/relays");
        assert_eq!(repository.relay_path(4), "users/ada/relays/4");
    }

    #[test]
    fn test_subscribe_delivers_the_current_collection_immediately() {
        let (_, repository) = repository();
        let (_, snapshots) = watch(&repository);
        flush(&repository);

        assert_eq!(snapshots.borrow().len(), 1);
        assert!(snapshots.borrow()[0].is_empty());
    }

    #[test]
    fn test_create_writes_initial_state_and_notifies() {
        let (store, repository) = repository();
        let (_, snapshots) = watch(&repository);

        block_on(repository.create(1, "KITCHEN APPLIANCE")).unwrap();
        flush(&repository);

        assert_eq!(
            stored(&store, "users/ada/relays/1"),
            Some(json!({ "device": "KITCHEN APPLIANCE", "state": false }))
        );
        let last = snapshots.borrow().last().cloned().unwrap();
        assert_eq!(last.get(&1).map(|relay| relay.device.as_str()), Some("KITCHEN APPLIANCE"));
    }

    #[test]
    fn test_set_state_flips_only_state() {
        let (store, repository) = repository();
        block_on(repository.create(2, "BEDROOM FAN")).unwrap();

        block_on(repository.set_state(2, true)).unwrap();

        assert_eq!(
            stored(&store, "users/ada/relays/2"),
            Some(json!({ "device": "BEDROOM FAN", "state": true }))
        );
    }

    #[test]
    fn test_set_state_on_a_missing_relay_is_not_found() {
        let (store, repository) = repository();

        let result = block_on(repository.set_state(7, true));

        assert_eq!(result, Err(StoreError::NotFound));
        assert_eq!(stored(&store, "users/ada/relays/7"), None, "no partial record");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (store, repository) = repository();
        block_on(repository.create(1, "LIVING ROOM LIGHT")).unwrap();

        block_on(repository.remove(1)).unwrap();
        assert_eq!(stored(&store, "users/ada/relays/1"), None);

        block_on(repository.remove(1)).unwrap();
    }

    #[test]
    fn test_closed_subscription_receives_nothing_further() {
        let (_, repository) = repository();
        let (key, snapshots) = watch(&repository);
        flush(&repository);
        assert_eq!(snapshots.borrow().len(), 1);

        repository.unsubscribe(key);
        block_on(repository.create(1, "BATHROOM HEATER")).unwrap();
        flush(&repository);

        assert_eq!(snapshots.borrow().len(), 1);
    }

    #[test]
    fn test_independent_subscriptions_survive_each_other() {
        let (_, repository) = repository();
        let (first, first_snapshots) = watch(&repository);
        let (_, second_snapshots) = watch(&repository);
        flush(&repository);

        repository.unsubscribe(first);
        block_on(repository.create(1, "BEDROOM LIGHT")).unwrap();
        flush(&repository);

        assert_eq!(first_snapshots.borrow().len(), 1);
        assert_eq!(second_snapshots.borrow().len(), 2);
    }

    #[test]
    fn test_fetch_all_of_an_absent_path_is_empty() {
        let (_, repository) = repository();
        assert!(!repository.loaded_at_least_once());

        let relays = block_on(repository.fetch_all()).unwrap();

        assert!(relays.is_empty());
        assert!(repository.loaded_at_least_once());
    }

    #[test]
    fn test_remote_snapshot_updates_mirror_and_notifies_once() {
        let (_, repository) = repository();
        let (_, snapshots) = watch(&repository);
        flush(&repository);

        let pushed = json!({
            "1": { "device": "LIVING ROOM LIGHT", "state": true },
            "2": { "device": "BEDROOM FAN" },
        });
        repository.apply_remote_value(&pushed);
        flush(&repository);
        assert_eq!(snapshots.borrow().len(), 2);
        assert_eq!(repository.relays().len(), 2);

        // identical push changes nothing and stays quiet
        repository.apply_remote_value(&pushed);
        flush(&repository);
        assert_eq!(snapshots.borrow().len(), 2);
    }

    #[test]
    fn test_store_failure_leaves_the_mirror_unchanged() {
        let (store, repository) = repository();
        store.inject_failure(StoreError::Store("network down".to_string()));

        let result = block_on(repository.create(1, "LIVING ROOM FAN"));

        assert!(result.is_err());
        assert!(repository.relays().is_empty());
    }
}
