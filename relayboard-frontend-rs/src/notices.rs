//! Transient, user-visible outcome notices. The shell renders them as
//! toasts; nothing here persists.

use serde::{Deserialize, Serialize};

use crate::registration::ValidationError;
use crate::relays::RelayId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: String) -> Self {
        Self {
            level: NoticeLevel::Success,
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: NoticeLevel::Error,
            message,
        }
    }

    pub(crate) fn device_added(device: &str) -> Self {
        Self::success(format!("{device} added successfully!"))
    }

    pub(crate) fn add_failed() -> Self {
        Self::error("Error adding device. Please try again.".to_string())
    }

    pub(crate) fn rejected(reason: &ValidationError) -> Self {
        Self::error(reason.to_string())
    }

    pub(crate) fn device_deleted(device: Option<&str>) -> Self {
        match device {
            Some(device) => Self::success(format!("{device} deleted successfully!")),
            None => Self::success("Device deleted successfully!".to_string()),
        }
    }

    pub(crate) fn delete_failed(device: Option<&str>) -> Self {
        match device {
            Some(device) => Self::error(format!("Error deleting {device}. Please try again.")),
            None => Self::error("Error deleting device. Please try again.".to_string()),
        }
    }

    pub(crate) fn relay_switched(device: &str, state: bool) -> Self {
        let position = if state { "ON" } else { "OFF" };
        Self::success(format!("{device} switched {position}"))
    }

    pub(crate) fn toggle_missing(id: RelayId) -> Self {
        Self::error(format!("Device {id} no longer exists."))
    }

    pub(crate) fn toggle_failed(device: Option<&str>) -> Self {
        match device {
            Some(device) => Self::error(format!("Error switching {device}. Please try again.")),
            None => Self::error("Error switching device. Please try again.".to_string()),
        }
    }

    pub(crate) fn load_failed() -> Self {
        Self::error("Error fetching devices. Please try again.".to_string())
    }

    pub(crate) fn sign_out_failed() -> Self {
        Self::error("Error signing out. Please try again.".to_string())
    }
}
