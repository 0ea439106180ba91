#![deny(clippy::string_slice)]

mod control;
mod firebase;
mod gate;
mod notices;
mod registration;
mod relays;
mod repository;
mod utils;

pub use gate::SessionGate;
pub use notices::{Notice, NoticeLevel};
pub use registration::{Registration, SUGGESTED_DEVICES, ValidationError};
pub use relays::{Relay, RelayCollection, RelayId, RelayRow, next_relay_id};
pub use repository::RelayRepository;

use std::cell::RefCell;
use std::sync::LazyLock;

use patchbay::firebase::FirebaseStore;
use patchbay::listeners::ListenerKey;
use patchbay::session::Session;
use wasm_bindgen::prelude::*;

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
#[allow(clippy::declare_interior_mutable_const)]
const LOGGER: LazyLock<()> = LazyLock::new(|| {
    utils::set_panic_hook();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Logging initialized");
});

/// Autocomplete suggestions for the registration screen.
#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
pub fn suggested_devices() -> Vec<String> {
    SUGGESTED_DEVICES.iter().map(|name| name.to_string()).collect()
}

/// The stateful core behind the two authenticated screens. One instance per
/// signed-in user; the shell tears it down on sign-out and builds a fresh
/// one on the next sign-in.
#[wasm_bindgen]
pub struct Relayboard {
    repository: RelayRepository<FirebaseStore>,
    registration: RefCell<Registration>,
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
impl Relayboard {
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen(constructor))]
    pub fn new(user_id: String, access_token: String) -> Relayboard {
        // used to only initialize the logger once
        #[allow(clippy::borrow_interior_mutable_const)]
        *LOGGER;

        let store = FirebaseStore::new(firebase::firebase_config());
        let session = Session::new(user_id, access_token);
        Relayboard {
            repository: RelayRepository::new(store, session),
            registration: RefCell::new(Registration::default()),
        }
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen(getter))]
    pub fn user_id(&self) -> String {
        self.repository.user_id()
    }

    /// The provider refreshes id tokens roughly hourly; the shell pushes
    /// each fresh one here.
    pub fn update_access_token(&self, access_token: String) {
        self.repository.update_access_token(access_token);
    }

    /// Live subscription to the relay collection. The callback receives the
    /// current rows immediately and again on every change, until
    /// [`unsubscribe`](Relayboard::unsubscribe).
    pub fn subscribe_relays(&self, callback: js_sys::Function) -> ListenerKey {
        let _notifier = NotifyLater::new(self);

        self.repository.subscribe(move |relays| {
            #[cfg(target_arch = "wasm32")]
            {
                let rows = relays::relay_rows(relays);
                match serde_wasm_bindgen::to_value(&rows) {
                    Ok(rows) => {
                        let _ = callback.call1(&JsValue::null(), &rows);
                    }
                    Err(e) => log::error!("Error serializing relay snapshot: {e:?}"),
                }
            }
            #[cfg(not(target_arch = "wasm32"))]
            let _ = (&callback, relays);
        })
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.repository.unsubscribe(key);
    }

    /// Rows of the latest mirrored snapshot, for render paths that pull
    /// instead of subscribing.
    pub fn relays(&self) -> Vec<RelayRow> {
        relays::relay_rows(&self.repository.relays())
    }

    /// False until the first load resolves; the shell shows its loading
    /// state while false.
    pub fn loaded(&self) -> bool {
        self.repository.loaded_at_least_once()
    }

    /// One-shot reconciliation with the store, and the priming read on
    /// screen activation. A failure leaves the current (possibly empty) mirror in
    /// place; the rejection carries a [`Notice`] for the shell to toast.
    pub async fn refresh(&self) -> Result<(), JsValue> {
        let _notifier = NotifyLater::new(self);

        #[cfg(target_arch = "wasm32")]
        let start_time = if !self.repository.loaded_at_least_once() {
            web_sys::window()
                .and_then(|window| window.performance())
                .map(|performance| performance.now())
        } else {
            None
        };

        let result = self.repository.fetch_all().await;

        #[cfg(target_arch = "wasm32")]
        if let (Some(start), Some(performance)) = (
            start_time,
            web_sys::window().and_then(|window| window.performance()),
        ) {
            log::info!("Initial relay load took {}ms", performance.now() - start);
        }

        result.map(|_| ()).map_err(|e| {
            log::error!("Error fetching relays: {e:?}");
            notice_to_js(&Notice::load_failed())
        })
    }

    /// Ingest a collection snapshot pushed by the shell's live store channel
    /// (the SDK's `onValue`, or an `EventSource` on the streaming endpoint).
    /// `null` clears the mirror.
    pub fn apply_remote_snapshot(&self, snapshot: JsValue) -> Result<(), JsValue> {
        let _notifier = NotifyLater::new(self);

        let value: serde_json::Value = serde_wasm_bindgen::from_value(snapshot)
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))?;
        self.repository.apply_remote_value(&value);
        Ok(())
    }

    /// Prime the registration screen: fetch the collection and compute the
    /// id the next device will get.
    pub async fn begin_registration(&self) -> Result<RelayId, JsValue> {
        let _notifier = NotifyLater::new(self);

        registration::begin_registration(&self.repository, &self.registration)
            .await
            .map_err(|e| {
                log::error!("Error fetching devices: {e:?}");
                notice_to_js(&Notice::load_failed())
            })
    }

    /// The id the next registered device gets, once computed.
    pub fn next_relay_id(&self) -> Option<RelayId> {
        self.registration.borrow().next_id()
    }

    pub async fn add_device(&self, name: String) -> Notice {
        let _notifier = NotifyLater::new(self);
        registration::add_device(&self.repository, &self.registration, &name).await
    }

    /// The shell asks its are-you-sure question first; this goes straight
    /// to the store.
    pub async fn remove_device(&self, id: RelayId) -> Notice {
        let _notifier = NotifyLater::new(self);
        registration::remove_device(&self.repository, id).await
    }

    pub async fn toggle_relay(&self, id: RelayId) -> Notice {
        let _notifier = NotifyLater::new(self);
        control::toggle_relay(&self.repository, id).await
    }

    /// Ask the identity provider to end the session. On success the shell
    /// navigates to the entry screen; a rejection carries a [`Notice`] to
    /// toast, and the session's actual fate stays whatever the provider
    /// decided.
    pub async fn sign_out(&self, sign_out: js_sys::Function) -> Result<(), JsValue> {
        #[cfg(target_arch = "wasm32")]
        {
            let promise = match sign_out.call0(&JsValue::null()) {
                Ok(value) => js_sys::Promise::resolve(&value),
                Err(e) => {
                    log::error!("Error signing out: {e:?}");
                    return Err(notice_to_js(&Notice::sign_out_failed()));
                }
            };
            if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                log::error!("Error signing out: {e:?}");
                return Err(notice_to_js(&Notice::sign_out_failed()));
            }
            Ok(())
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = sign_out;
            Ok(())
        }
    }
}

fn notice_to_js(notice: &Notice) -> JsValue {
    serde_wasm_bindgen::to_value(notice).unwrap_or_else(|_| JsValue::from_str(&notice.message))
}

/// Flushes queued subscription callbacks when dropped, whatever path the
/// surrounding function took. Callbacks only ever run here, never while the
/// repository is borrowed, because many of them immediately call back into
/// methods that themselves borrow.
struct NotifyLater<'a> {
    board: &'a Relayboard,
}

impl<'a> NotifyLater<'a> {
    fn new(board: &'a Relayboard) -> Self {
        Self { board }
    }
}

impl Drop for NotifyLater<'_> {
    fn drop(&mut self) {
        for notification in self.board.repository.drain_due_notifications() {
            notification();
        }
    }
}
