//! Lane geometry and tool assignment.

mod failover;
mod positions;
mod tool_map;

pub use failover::{FailoverPass, FailoverScan};
pub use positions::LanePositionTable;
pub use tool_map::ToolLaneMap;
