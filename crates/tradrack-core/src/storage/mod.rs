//! Persisted engine variables.
//!
//! Calibration, the active lane and the last heater target survive restarts
//! as independent named entries in a [`VariableStore`].

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreResult;

/// Variable names used by the engine.
pub mod keys {
    pub const CALIB_BOWDEN_LOAD_LENGTH: &str = "calib_bowden_load_length";
    pub const CALIB_BOWDEN_UNLOAD_LENGTH: &str = "calib_bowden_unload_length";
    pub const CONFIG_BOWDEN_LENGTH: &str = "config_bowden_length";
    pub const ACTIVE_LANE: &str = "tr_active_lane";
    pub const LAST_HEATER_TARGET: &str = "tr_last_heater_target";
    pub const CALIB_SELECTOR: &str = "calib_selector";
}

/// Key/value persistence backend.
pub trait VariableStore {
    fn get_variable(&self, name: &str) -> Option<Value>;

    fn save_variable(&mut self, name: &str, value: Value) -> StoreResult<()>;
}

/// Read a variable as `T`.
///
/// A value that no longer deserializes as `T` is treated as absent.
pub fn load_as<T: DeserializeOwned>(store: &impl VariableStore, name: &str) -> Option<T> {
    let value = store.get_variable(name)?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(variable = name, error = %e, "Ignoring unreadable saved variable");
            None
        },
    }
}

/// Serialize `value` and save it under `name`.
pub fn save_as<T: Serialize>(store: &mut impl VariableStore, name: &str, value: &T) -> StoreResult<()> {
    store.save_variable(name, serde_json::to_value(value)?)
}
