//! Remote store backend speaking the REST surface of a Firebase Realtime
//! Database: `GET`/`PATCH`/`DELETE` against `{base}/{path}.json?auth={token}`.
//! The database answers `null` for absent paths rather than 404, and `PATCH`
//! merges only the named fields.

use serde_json::Value;

use crate::StoreError;
use crate::session::Session;
use crate::store::RemoteStore;

#[derive(serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct FirebaseConfig {
    pub database_url: String,
}

pub struct FirebaseStore {
    config: FirebaseConfig,
}

impl FirebaseStore {
    pub fn new(config: FirebaseConfig) -> Self {
        Self { config }
    }

    fn endpoint(&self, session: &Session, path: &str) -> String {
        let base = self.config.database_url.trim_end_matches('/');
        format!("{base}/{path}.json?auth={}", session.access_token)
    }
}

fn check(response: &fetch_happen::Response) -> Result<(), StoreError> {
    match response.status() {
        401 | 403 => Err(StoreError::Unauthenticated),
        404 => Err(StoreError::NotFound),
        _ if !response.ok() => Err(StoreError::Store(format!(
            "store answered with status {}",
            response.status()
        ))),
        _ => Ok(()),
    }
}

impl RemoteStore for FirebaseStore {
    async fn get(&self, session: &Session, path: &str) -> Result<Option<Value>, StoreError> {
        let client = fetch_happen::Client;
        let response = client
            .get(&self.endpoint(session, path))
            .send()
            .await
            .map_err(|e| StoreError::Store(format!("{e:?}")))?;
        check(&response).inspect_err(|e| log::error!("GET {path} failed: {e:?}"))?;

        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Store(format!("{e:?}")))?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| StoreError::Store(format!("unreadable store response: {e}")))?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn update(
        &self,
        session: &Session,
        path: &str,
        fields: Value,
    ) -> Result<(), StoreError> {
        let client = fetch_happen::Client;
        let response = client
            .patch(&self.endpoint(session, path))
            .json(&fields)
            .map_err(|e| StoreError::Store(format!("{e:?}")))?
            .send()
            .await
            .map_err(|e| StoreError::Store(format!("{e:?}")))?;
        check(&response).inspect_err(|e| log::error!("PATCH {path} failed: {e:?}"))
    }

    async fn remove(&self, session: &Session, path: &str) -> Result<(), StoreError> {
        let client = fetch_happen::Client;
        let response = client
            .delete(&self.endpoint(session, path))
            .send()
            .await
            .map_err(|e| StoreError::Store(format!("{e:?}")))?;
        check(&response).inspect_err(|e| log::error!("DELETE {path} failed: {e:?}"))
    }
}
