//! Spool inventory ids per lane.

use tracing::debug;
use tradrack_types::RackEvent;

/// Change to the spool inventory's active spool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpoolUpdate {
    SetActive(u64),
    ClearActive,
}

/// Optional spool id for every lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolIdMap {
    ids: Vec<Option<u64>>,
}

impl SpoolIdMap {
    pub fn new(lane_count: usize) -> Self {
        Self { ids: vec![None; lane_count] }
    }

    pub fn assign(&mut self, lane: usize, id: u64) {
        if let Some(slot) = self.ids.get_mut(lane) {
            *slot = Some(id);
            debug!(lane, spool_id = id, "Assigned spool id");
        }
    }

    pub fn remove(&mut self, lane: usize) {
        if let Some(slot) = self.ids.get_mut(lane) {
            *slot = None;
        }
    }

    pub fn reset(&mut self) {
        self.ids.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn get(&self, lane: usize) -> Option<u64> {
        self.ids.get(lane).copied().flatten()
    }

    pub fn handle_event(&self, event: &RackEvent) -> Option<SpoolUpdate> {
        match event {
            RackEvent::LoadComplete { lane } | RackEvent::ActiveLaneForced { lane } => {
                self.get(*lane).map(SpoolUpdate::SetActive)
            },
            RackEvent::UnloadComplete { .. } | RackEvent::ActiveLaneReset => {
                Some(SpoolUpdate::ClearActive)
            },
            _ => None,
        }
    }

    /// One line per lane with its id and tool.
    pub fn describe(&self, tool_map: &[usize]) -> Vec<String> {
        self.ids
            .iter()
            .enumerate()
            .map(|(lane, id)| {
                let id = id.map_or_else(|| "No ID assigned".to_string(), |id| format!("ID={id}"));
                match tool_map.get(lane) {
                    Some(tool) => format!("Lane {lane}: {id}, Tool={tool}"),
                    None => format!("Lane {lane}: {id}"),
                }
            })
            .collect()
    }
}
