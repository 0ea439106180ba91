//! Compile-time store configuration.

use patchbay::firebase::FirebaseConfig;

pub(crate) fn firebase_config() -> FirebaseConfig {
    let database_url = if cfg!(feature = "local-emulator") {
        "http://localhost:9000/relayboard-default-rtdb"
    } else {
        "https://relayboard-default-rtdb.firebaseio.com"
    };
    FirebaseConfig {
        database_url: database_url.to_string(),
    }
}
