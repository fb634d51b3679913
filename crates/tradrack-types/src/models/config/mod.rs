//! Rack configuration models.

mod rack;
mod sync_sensor;

pub use rack::RackConfig;
pub use sync_sensor::SyncSensorConfig;
