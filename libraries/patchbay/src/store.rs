//! The boundary to the remote document store.

use crate::StoreError;
use crate::session::Session;

/// A hierarchical key-value store addressable by slash-separated path.
///
/// Implementations must provide merge-patch semantics for
/// [`update`](RemoteStore::update): only the named fields of the record at
/// `path` change, other fields survive, and a `null` field value deletes
/// that field. [`remove`](RemoteStore::remove) deletes the whole subtree
/// and succeeds when the path is already absent.
// callers are single-threaded wasm; no Send bound wanted on the futures
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Point read. `Ok(None)` when nothing is stored at `path`.
    async fn get(
        &self,
        session: &Session,
        path: &str,
    ) -> Result<Option<serde_json::Value>, StoreError>;

    /// Merge-patch the record at `path` with `fields`.
    async fn update(
        &self,
        session: &Session,
        path: &str,
        fields: serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Delete `path` and everything under it.
    async fn remove(&self, session: &Session, path: &str) -> Result<(), StoreError>;
}
