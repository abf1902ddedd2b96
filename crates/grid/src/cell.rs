use habitat_common::Edge;
use serde::{Deserialize, Serialize};

/// Per-cell building state: one floor flag and one flag per wall edge.
///
/// `sealed` is derived by [`crate::StructureSystem::seal`] and does not count
/// towards occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    floor: bool,
    walls: [bool; 4],
    #[serde(skip)]
    sealed: bool,
}

impl Cell {
    pub fn floor(&self) -> bool {
        self.floor
    }

    pub fn set_floor(&mut self, present: bool) {
        self.floor = present;
    }

    pub fn wall(&self, edge: Edge) -> bool {
        self.walls[edge.index()]
    }

    pub fn set_wall(&mut self, edge: Edge, present: bool) {
        self.walls[edge.index()] = present;
    }

    /// True when neither the floor nor any wall is set.
    pub fn is_empty(&self) -> bool {
        !self.floor && !self.walls.iter().any(|&w| w)
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub(crate) fn set_sealed(&mut self, sealed: bool) {
        self.sealed = sealed;
    }

    pub fn wall_count(&self) -> usize {
        self.walls.iter().filter(|&&w| w).count()
    }

    /// Union another cell's structure into this one. Seal state is left alone.
    pub fn absorb(&mut self, other: &Cell) {
        self.floor |= other.floor;
        for (mine, theirs) in self.walls.iter_mut().zip(other.walls) {
            *mine |= theirs;
        }
    }
}
