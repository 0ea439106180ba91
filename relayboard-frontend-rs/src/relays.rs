//! Domain model for the relay collection.
//!
//! A relay is one controllable on/off device. The collection is stored as a
//! JSON object keyed by the decimal relay id under `users/{user_id}/relays/`
//! and mirrored here as an ordered map, so the UI renders rows in a stable
//! order.

use serde::{Deserialize, Serialize};

pub type RelayId = u32;

/// One controllable device. `state` may be absent in data written by other
/// clients; absent always reads as "off".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Relay {
    pub device: String,
    #[serde(default)]
    pub state: bool,
}

pub type RelayCollection = im::OrdMap<RelayId, Relay>;

/// Row handed to the shell: one per relay, sorted by id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct RelayRow {
    pub id: RelayId,
    pub device: String,
    pub state: bool,
}

pub(crate) fn relay_rows(relays: &RelayCollection) -> Vec<RelayRow> {
    relays
        .iter()
        .map(|(id, relay)| RelayRow {
            id: *id,
            device: relay.device.clone(),
            state: relay.state,
        })
        .collect()
}

/// Decode a stored collection value. `None`/`null` means the path does not
/// exist yet, which is an empty collection. Entries that don't look like
/// relays (non-numeric keys, missing fields) are skipped with a warning
/// rather than poisoning the whole snapshot.
pub(crate) fn collection_from_value(value: Option<&serde_json::Value>) -> RelayCollection {
    let mut relays = RelayCollection::new();
    let Some(serde_json::Value::Object(entries)) = value else {
        return relays;
    };
    for (key, record) in entries {
        let Ok(id) = key.parse::<RelayId>() else {
            log::warn!("Ignoring relay with non-numeric id {key:?}");
            continue;
        };
        match serde_json::from_value::<Relay>(record.clone()) {
            Ok(relay) => {
                relays.insert(id, relay);
            }
            Err(e) => log::warn!("Ignoring malformed relay record {key}: {e}"),
        }
    }
    relays
}

/// The identifier a freshly-registered device gets: one past the highest id
/// in use, starting at 1. Recomputed from a snapshot every time the
/// registration screen is entered; two sessions registering at the same
/// moment can compute the same id, and the later write wins.
pub fn next_relay_id(relays: &RelayCollection) -> RelayId {
    relays.keys().max().map_or(1, |highest| highest + 1)
}

/// Display names are stored upper-case. Whitespace-only input is no name at
/// all.
pub(crate) fn normalize_device_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_uppercase())
    }
}
