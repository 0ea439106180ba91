//! Device registration: identifier assignment plus create and delete.
//!
//! The next id is not a durable counter. It is recomputed from a snapshot
//! every time the screen is entered and bumped in memory after each
//! confirmed create, so two sessions registering concurrently can compute
//! the same id; the later write wins at the store. Known limitation,
//! carried over deliberately.

use std::cell::RefCell;

use patchbay::StoreError;
use patchbay::store::RemoteStore;

use crate::notices::Notice;
use crate::relays::{RelayCollection, RelayId, next_relay_id, normalize_device_name};
use crate::repository::RelayRepository;

/// Autocomplete suggestions offered on the registration screen. Free text;
/// nothing is validated against this list.
pub const SUGGESTED_DEVICES: [&str; 6] = [
    "LIVING ROOM LIGHT",
    "LIVING ROOM FAN",
    "BEDROOM LIGHT",
    "BEDROOM FAN",
    "KITCHEN APPLIANCE",
    "BATHROOM HEATER",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Device name must not be empty.")]
    EmptyName,
    #[error("Still loading your devices. Please try again.")]
    IdNotReady,
}

/// Per-screen workflow state.
#[derive(Default)]
pub struct Registration {
    next_id: Option<RelayId>,
}

impl Registration {
    /// `None` while the priming fetch is outstanding (or failed).
    pub fn next_id(&self) -> Option<RelayId> {
        self.next_id
    }

    pub fn begin(&mut self, relays: &RelayCollection) -> RelayId {
        let next = next_relay_id(relays);
        self.next_id = Some(next);
        next
    }

    fn validate(&self, name: &str) -> Result<(RelayId, String), ValidationError> {
        let id = self.next_id.ok_or(ValidationError::IdNotReady)?;
        let device = normalize_device_name(name).ok_or(ValidationError::EmptyName)?;
        Ok((id, device))
    }

    fn advance(&mut self) {
        self.next_id = self.next_id.map(|id| id + 1);
    }
}

/// Prime the screen: fetch the collection and compute the id the next
/// device will get.
pub async fn begin_registration<S: RemoteStore>(
    repository: &RelayRepository<S>,
    registration: &RefCell<Registration>,
) -> Result<RelayId, StoreError> {
    let relays = repository.fetch_all().await?;
    Ok(registration.borrow_mut().begin(&relays))
}

/// Validate, upper-case and create. The local view (and the in-memory next
/// id) move only after the store confirms the write.
pub async fn add_device<S: RemoteStore>(
    repository: &RelayRepository<S>,
    registration: &RefCell<Registration>,
    name: &str,
) -> Notice {
    let validated = registration.borrow().validate(name);
    let (id, device) = match validated {
        Ok(validated) => validated,
        Err(reason) => return Notice::rejected(&reason),
    };
    match repository.create(id, &device).await {
        Ok(()) => {
            registration.borrow_mut().advance();
            Notice::device_added(&device)
        }
        Err(e) => {
            log::error!("Error adding device: {e:?}");
            Notice::add_failed()
        }
    }
}

/// Delete a registered device. The shell asks its yes/no confirmation
/// question before calling this.
pub async fn remove_device<S: RemoteStore>(
    repository: &RelayRepository<S>,
    id: RelayId,
) -> Notice {
    let device = repository
        .relays()
        .get(&id)
        .map(|relay| relay.device.clone());
    match repository.remove(id).await {
        Ok(()) => Notice::device_deleted(device.as_deref()),
        Err(e) => {
            log::error!("Error deleting device: {e:?}");
            Notice::delete_failed(device.as_deref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notices::NoticeLevel;
    use futures::executor::block_on;
    use patchbay::memory::MemoryStore;
    use patchbay::session::Session;
    use serde_json::json;

    fn workbench() -> (
        MemoryStore,
        RelayRepository<MemoryStore>,
        RefCell<Registration>,
    ) {
        let store = MemoryStore::new();
        let session = Session::new("ada", "token-1");
        (
            store.clone(),
            RelayRepository::new(store, session),
            RefCell::new(Registration::default()),
        )
    }

    fn stored(store: &MemoryStore, path: &str) -> Option<serde_json::Value> {
        block_on(store.get(&Session::new("ada", "token-1"), path)).unwrap()
    }

    #[test]
    fn test_first_device_gets_id_one_and_an_upper_case_name() {
        let (store, repository, registration) = workbench();

        let next = block_on(begin_registration(&repository, &registration)).unwrap();
        assert_eq!(next, 1);

        let notice = block_on(add_device(&repository, &registration, "Kitchen Appliance"));
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(
            stored(&store, "users/ada/relays/1"),
            Some(json!({ "device": "KITCHEN APPLIANCE", "state": false }))
        );
        assert_eq!(registration.borrow().next_id(), Some(2));
    }

    #[test]
    fn test_next_id_resumes_past_existing_devices() {
        let (store, repository, registration) = workbench();
        block_on(store.update(
            &Session::new("ada", "token-1"),
            "users/ada/relays/5",
            json!({ "device": "BATHROOM HEATER", "state": true }),
        ))
        .unwrap();

        let next = block_on(begin_registration(&repository, &registration)).unwrap();
        assert_eq!(next, 6);
    }

    #[test]
    fn test_submission_before_loading_is_rejected() {
        let (store, repository, registration) = workbench();

        let notice = block_on(add_device(&repository, &registration, "Bedroom Fan"));

        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(stored(&store, "users/ada/relays"), None, "nothing written");
    }

    #[test]
    fn test_blank_names_are_rejected_without_a_write() {
        let (store, repository, registration) = workbench();
        block_on(begin_registration(&repository, &registration)).unwrap();

        let notice = block_on(add_device(&repository, &registration, "   "));

        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(stored(&store, "users/ada/relays"), None);
        assert_eq!(registration.borrow().next_id(), Some(1), "id not consumed");
    }

    #[test]
    fn test_the_id_advances_only_after_a_confirmed_create() {
        let (store, repository, registration) = workbench();
        block_on(begin_registration(&repository, &registration)).unwrap();
        store.inject_failure(StoreError::Store("network down".to_string()));

        let notice = block_on(add_device(&repository, &registration, "Bedroom Light"));

        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(registration.borrow().next_id(), Some(1));
        assert!(repository.relays().is_empty(), "no optimistic entry");
    }

    #[test]
    fn test_remove_device_names_the_device_it_deleted() {
        let (store, repository, registration) = workbench();
        block_on(begin_registration(&repository, &registration)).unwrap();
        block_on(add_device(&repository, &registration, "Living Room Fan"));

        let notice = block_on(remove_device(&repository, 1));

        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.message, "LIVING ROOM FAN deleted successfully!");
        assert_eq!(stored(&store, "users/ada/relays/1"), None);
    }

    #[test]
    fn test_failed_delete_leaves_the_view_alone() {
        let (store, repository, registration) = workbench();
        block_on(begin_registration(&repository, &registration)).unwrap();
        block_on(add_device(&repository, &registration, "Living Room Light"));
        store.inject_failure(StoreError::Store("network down".to_string()));

        let notice = block_on(remove_device(&repository, 1));

        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Error deleting LIVING ROOM LIGHT. Please try again.");
        assert!(repository.relays().contains_key(&1));
    }
}
