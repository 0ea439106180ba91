//! Sessions and the auth-state watch.

use std::rc::Rc;

use slotmap::SlotMap;

use crate::listeners::{ListenerKey, ListenerSlot};

/// The live proof of identity for one user, handed in by the identity
/// provider. Every store operation is scoped by one of these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }

    /// The provider refreshes tokens out from under a long-lived session.
    pub fn update_access_token(&mut self, access_token: impl Into<String>) {
        self.access_token = access_token.into();
    }
}

/// Push-style record of what the identity provider last reported.
///
/// [`auth_state_changed`](AuthWatch::auth_state_changed) hands back the
/// signed-out callbacks to run instead of running them, so the caller can
/// drop its borrows first.
#[derive(Default)]
pub struct AuthWatch {
    session: Option<Session>,
    signed_out: SlotMap<ListenerSlot, Rc<dyn Fn()>>,
}

impl AuthWatch {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session,
            signed_out: SlotMap::with_key(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn on_signed_out(&mut self, callback: impl Fn() + 'static) -> ListenerKey {
        ListenerKey {
            slot: self.signed_out.insert(Rc::new(callback)),
        }
    }

    pub fn remove(&mut self, key: ListenerKey) {
        self.signed_out.remove(key.slot);
    }

    /// Record the provider's latest report. Every "no session" report
    /// returns the listeners to invoke; redirecting twice is harmless and
    /// cheaper than tracking edges.
    #[must_use = "the returned callbacks still need to be invoked"]
    pub fn auth_state_changed(&mut self, session: Option<Session>) -> Vec<Rc<dyn Fn()>> {
        self.session = session;
        if self.session.is_none() {
            self.signed_out.values().cloned().collect()
        } else {
            Vec::new()
        }
    }
}
