//! Tool to lane assignment.

use tracing::debug;
use tradrack_types::ValidationError;

/// Many-to-one assignment of lanes to tools.
///
/// Every lane belongs to exactly one tool. A tool may own any number of lanes
/// and has at most one default lane, which is always one of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLaneMap {
    tool_of_lane: Vec<usize>,
    default_lanes: Vec<Option<usize>>,
}

impl ToolLaneMap {
    /// Lane `i` assigned to tool `i`.
    pub fn identity(lane_count: usize) -> Self {
        Self { tool_of_lane: (0..lane_count).collect(), default_lanes: (0..lane_count).map(Some).collect() }
    }

    pub fn lane_count(&self) -> usize {
        self.tool_of_lane.len()
    }

    pub fn tool_count(&self) -> usize {
        self.default_lanes.len()
    }

    pub fn check_lane(&self, lane: usize) -> Result<(), ValidationError> {
        if lane < self.lane_count() {
            Ok(())
        } else {
            Err(ValidationError::InvalidLane { lane, lane_count: self.lane_count() })
        }
    }

    pub fn check_tool(&self, tool: usize) -> Result<(), ValidationError> {
        if tool < self.tool_count() {
            Ok(())
        } else {
            Err(ValidationError::InvalidTool { tool, tool_count: self.tool_count() })
        }
    }

    /// Move `lane` to `tool`, repairing the previous owner's default.
    pub fn assign(&mut self, lane: usize, tool: usize) -> Result<(), ValidationError> {
        self.check_lane(lane)?;
        self.check_tool(tool)?;

        let old_tool = self.tool_of_lane[lane];
        if old_tool == tool {
            return Ok(());
        }
        self.tool_of_lane[lane] = tool;

        if self.default_lanes[old_tool] == Some(lane) {
            self.default_lanes[old_tool] = self.assigned_lanes(old_tool).first().copied();
        }
        if self.default_lanes[tool].is_none() {
            self.default_lanes[tool] = Some(lane);
        }

        debug!(lane, tool, old_tool, "Assigned lane to tool");
        Ok(())
    }

    pub fn default_lane(&self, tool: usize) -> Option<usize> {
        self.default_lanes.get(tool).copied().flatten()
    }

    pub fn set_default(&mut self, tool: usize, lane: Option<usize>) -> Result<(), ValidationError> {
        self.check_tool(tool)?;
        if let Some(lane) = lane {
            self.check_lane(lane)?;
            if self.tool_of_lane[lane] != tool {
                return Err(ValidationError::LaneNotAssigned { lane, tool });
            }
        }
        self.default_lanes[tool] = lane;
        Ok(())
    }

    /// Lanes of `tool` in ascending order.
    pub fn assigned_lanes(&self, tool: usize) -> Vec<usize> {
        self.tool_of_lane
            .iter()
            .enumerate()
            .filter_map(|(lane, t)| (*t == tool).then_some(lane))
            .collect()
    }

    pub fn tool_of(&self, lane: usize) -> Option<usize> {
        self.tool_of_lane.get(lane).copied()
    }

    /// Lane to load for `tool`: its default, else its first assigned lane.
    pub fn lane_for_tool(&self, tool: usize) -> Result<usize, ValidationError> {
        self.check_tool(tool)?;
        self.default_lane(tool)
            .or_else(|| self.assigned_lanes(tool).first().copied())
            .ok_or(ValidationError::NoLaneForTool { tool })
    }

    pub fn reset(&mut self) {
        *self = Self::identity(self.lane_count());
    }

    /// Tools that own at least one lane, with their lanes.
    pub fn tool_groups(&self) -> Vec<(usize, Vec<usize>)> {
        (0..self.tool_count())
            .map(|tool| (tool, self.assigned_lanes(tool)))
            .filter(|(_, lanes)| !lanes.is_empty())
            .collect()
    }

    /// Other lanes of `failed`'s tool, scanning forward from `failed + 1`.
    pub fn replacement_candidates(&self, failed: usize) -> Vec<usize> {
        let Some(tool) = self.tool_of(failed) else {
            return Vec::new();
        };
        let n = self.lane_count();
        (1..n)
            .map(|step| (failed + step) % n)
            .filter(|lane| self.tool_of_lane[*lane] == tool)
            .collect()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.tool_of_lane
    }

    pub fn default_lanes(&self) -> &[Option<usize>] {
        &self.default_lanes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_from(tools: &[usize]) -> ToolLaneMap {
        let mut map = ToolLaneMap::identity(tools.len());
        for (lane, tool) in tools.iter().enumerate() {
            map.assign(lane, *tool).unwrap();
        }
        map
    }

    #[test]
    fn test_assign_repairs_old_default() {
        let mut map = map_from(&[0, 0, 1, 1]);
        assert_eq!(map.default_lane(0), Some(0));

        map.assign(0, 1).unwrap();
        assert_eq!(map.default_lane(0), Some(1));

        map.assign(1, 2).unwrap();
        assert_eq!(map.default_lane(0), None);
        assert_eq!(map.default_lane(2), Some(1));
    }

    #[test]
    fn test_assign_gives_empty_tool_a_default() {
        let mut map = map_from(&[0, 0, 0]);
        assert_eq!(map.default_lane(1), None);

        map.assign(2, 1).unwrap();
        assert_eq!(map.default_lane(1), Some(2));
        assert_eq!(map.default_lane(0), Some(0));
    }

    #[test]
    fn test_default_always_assigned() {
        let mut map = ToolLaneMap::identity(5);
        let moves = [(0, 1), (1, 2), (4, 1), (2, 1), (0, 0), (3, 1), (1, 1)];
        for (lane, tool) in moves {
            map.assign(lane, tool).unwrap();
            for t in 0..map.tool_count() {
                let lanes = map.assigned_lanes(t);
                match map.default_lane(t) {
                    Some(d) => assert!(lanes.contains(&d)),
                    None => assert!(lanes.is_empty()),
                }
            }
        }
    }

    #[test]
    fn test_set_default_requires_membership() {
        let mut map = map_from(&[0, 0, 1]);
        assert!(map.set_default(0, Some(1)).is_ok());
        assert_eq!(
            map.set_default(0, Some(2)),
            Err(ValidationError::LaneNotAssigned { lane: 2, tool: 0 })
        );
        assert_eq!(map.default_lane(0), Some(1));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut map = ToolLaneMap::identity(3);
        assert_eq!(map.assign(3, 0), Err(ValidationError::InvalidLane { lane: 3, lane_count: 3 }));
        assert_eq!(map.assign(0, 5), Err(ValidationError::InvalidTool { tool: 5, tool_count: 3 }));
    }

    #[test]
    fn test_lane_for_tool() {
        let mut map = map_from(&[0, 0, 0]);
        assert_eq!(map.lane_for_tool(0), Ok(0));
        assert_eq!(map.lane_for_tool(2), Err(ValidationError::NoLaneForTool { tool: 2 }));

        map.set_default(0, None).unwrap();
        assert_eq!(map.lane_for_tool(0), Ok(0));
    }

    #[test]
    fn test_replacement_candidates_wrap() {
        let map = map_from(&[0, 1, 0, 1, 0]);
        assert_eq!(map.replacement_candidates(2), vec![4, 0]);
        assert_eq!(map.replacement_candidates(3), vec![1]);
    }

    #[test]
    fn test_identity_has_no_candidates() {
        let map = ToolLaneMap::identity(4);
        assert!(map.replacement_candidates(0).is_empty());
    }

    #[test]
    fn test_tool_groups_and_reset() {
        let mut map = map_from(&[0, 0, 2]);
        assert_eq!(map.tool_groups(), vec![(0, vec![0, 1]), (2, vec![2])]);

        map.reset();
        assert_eq!(map.as_slice(), &[0, 1, 2]);
        assert_eq!(map.default_lanes(), &[Some(0), Some(1), Some(2)]);
    }
}
