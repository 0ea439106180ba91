//! Live control of the relay collection: the toggle path for the control
//! screen.

use patchbay::store::RemoteStore;

use crate::notices::Notice;
use crate::relays::RelayId;
use crate::repository::RelayRepository;

/// Flip one relay.
///
/// The decision is made against an authoritative point read taken
/// immediately before the write, never against the cached snapshot:
/// another client may have moved the switch since the last push. A record
/// whose `state` field was never written counts as "off", so its first
/// toggle switches it on. The live subscription, not this call's result,
/// is what moves the rendered toggle.
pub async fn toggle_relay<S: RemoteStore>(
    repository: &RelayRepository<S>,
    id: RelayId,
) -> Notice {
    let relay = match repository.fetch_relay(id).await {
        Ok(Some(relay)) => relay,
        Ok(None) => {
            log::error!("Relay {id} no longer exists; nothing to toggle");
            return Notice::toggle_missing(id);
        }
        Err(e) => {
            log::error!("Error reading relay {id}: {e:?}");
            return Notice::toggle_failed(None);
        }
    };

    let state = !relay.state;
    match repository.set_state(id, state).await {
        Ok(()) => Notice::relay_switched(&relay.device, state),
        Err(e) => {
            log::error!("Error switching {}: {e:?}", relay.device);
            Notice::toggle_failed(Some(&relay.device))
        }
    }
}
