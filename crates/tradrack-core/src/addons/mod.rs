//! Optional add-ons driven by rack events.

mod spool_ids;
mod sync_sensor;

pub use spool_ids::{SpoolIdMap, SpoolUpdate};
pub use sync_sensor::{ExtruderSyncSensor, DIRECTION_UPDATE_INTERVAL, POSITION_TIME_DIFF};
