//! Push-style session guard for the authenticated screens.
//!
//! The shell forwards every auth-state callback from the identity provider
//! here; whenever the provider reports no session, every registered
//! listener fires (the shell's listener navigates to the entry screen). A
//! session that expires while a screen is open takes the same path,
//! asynchronously.

use std::cell::RefCell;

use patchbay::listeners::ListenerKey;
use patchbay::session::{AuthWatch, Session};

#[cfg_attr(target_arch = "wasm32", wasm_bindgen::prelude::wasm_bindgen)]
#[derive(Default)]
pub struct SessionGate {
    watch: RefCell<AuthWatch>,
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen::prelude::wasm_bindgen)]
impl SessionGate {
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen::prelude::wasm_bindgen(constructor))]
    pub fn new() -> SessionGate {
        SessionGate::default()
    }

    /// Register the redirect-to-entry callback. Deregister with
    /// [`unsubscribe`](SessionGate::unsubscribe) on unmount.
    pub fn on_signed_out(&self, callback: js_sys::Function) -> ListenerKey {
        self.watch.borrow_mut().on_signed_out(move || {
            #[cfg(target_arch = "wasm32")]
            {
                let _ = callback.call0(&wasm_bindgen::JsValue::null());
            }
            #[cfg(not(target_arch = "wasm32"))]
            let _ = &callback;
        })
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.watch.borrow_mut().remove(key);
    }

    pub fn has_session(&self) -> bool {
        self.watch.borrow().session().is_some()
    }

    /// Forward the provider's latest report. A missing field means signed
    /// out.
    pub fn auth_state_changed(&self, user_id: Option<String>, access_token: Option<String>) {
        let session = match (user_id, access_token) {
            (Some(user_id), Some(access_token)) => Some(Session::new(user_id, access_token)),
            _ => None,
        };
        // collect first so no borrow is held while the callbacks run
        let callbacks = self.watch.borrow_mut().auth_state_changed(session);
        for callback in callbacks {
            callback();
        }
    }
}
