//! This is a library for keeping a local mirror of state that lives in a
//! remote, path-addressed document store, and telling interested parties
//! when the mirror moves. It was created for Relayboard, so it doesn't
//! include much that was not needed for that project.
//!
//! The moving parts:
//! 1. A [`RemoteStore`] backend does point reads, merge-patch updates and
//!    subtree deletes against slash-separated paths.
//! 2. Callers mirror the subtree they care about and register listeners
//!    ([`listeners::Listeners`]) that receive a fresh snapshot whenever the
//!    mirror changes. Listener callbacks are queued rather than invoked
//!    inline, so a callback can safely call back into the code that owns
//!    the mirror.
//! 3. Every store operation is scoped by an explicit [`Session`]; there is
//!    no ambient "current user" anywhere in this library.

#[cfg(feature = "firebase")]
pub mod firebase;

pub mod listeners;
pub mod memory;
pub mod session;
pub mod store;

pub use listeners::{ListenerKey, Listeners};
pub use session::Session;
pub use store::RemoteStore;

/// What can go wrong talking to the remote store.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store rejected our credentials, or the session is gone.
    #[error("no authenticated session")]
    Unauthenticated,
    /// A point read or patch target does not exist.
    #[error("record not found")]
    NotFound,
    /// Network, permission or decode failure from the store.
    #[error("store failure: {0}")]
    Store(String),
}
