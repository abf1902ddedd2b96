use habitat_common::WorldPos;
use habitat_grid::BuildingGrid;
use serde::{Deserialize, Serialize};

/// Oxygen reserve configuration: capacity plus per-tick refill and drain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OxygenConfig {
    /// Full reserve.
    pub capacity: f32,
    /// Gained per tick while standing in a sealed cell.
    pub refill_per_tick: f32,
    /// Lost per tick anywhere else.
    pub drain_per_tick: f32,
}

impl Default for OxygenConfig {
    fn default() -> Self {
        Self {
            capacity: 100.0,
            refill_per_tick: 5.0,
            drain_per_tick: 1.0,
        }
    }
}

/// Where a consumer stood during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    /// Inside an enclosed cell.
    Sealed,
    /// Inside a structure's cell that leaks to the outside.
    Breached,
    /// Not on any structure.
    Outside,
}

/// Danger bands of the remaining reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Hazard {
    Safe,
    /// Below half.
    Warning,
    /// Below a fifth.
    Danger,
    Depleted,
}

/// Running tick counters for instrumentation.
#[derive(Debug, Clone, Default)]
pub struct OxygenStats {
    pub ticks_sealed: u64,
    pub ticks_breached: u64,
    pub ticks_outside: u64,
}

/// Anything that breathes: tracks a position and an oxygen reserve.
#[derive(Debug, Clone)]
pub struct OxygenConsumer {
    pub config: OxygenConfig,
    position: WorldPos,
    level: f32,
    stats: OxygenStats,
}

impl OxygenConsumer {
    /// Start with a full reserve.
    pub fn new(config: OxygenConfig, position: WorldPos) -> Self {
        Self {
            config,
            position,
            level: config.capacity,
            stats: OxygenStats::default(),
        }
    }

    pub fn position(&self) -> WorldPos {
        self.position
    }

    pub fn set_position(&mut self, position: WorldPos) {
        self.position = position;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_depleted(&self) -> bool {
        self.level <= 0.0
    }

    pub fn stats(&self) -> &OxygenStats {
        &self.stats
    }

    pub fn hazard(&self) -> Hazard {
        let fraction = self.level / self.config.capacity;
        if self.is_depleted() {
            Hazard::Depleted
        } else if fraction < 0.2 {
            Hazard::Danger
        } else if fraction < 0.5 {
            Hazard::Warning
        } else {
            Hazard::Safe
        }
    }

    /// Classify the current position against the grid.
    ///
    /// The position is snapped to its cell corner first, so any point inside
    /// a cell answers the same.
    pub fn exposure(&self, grid: &BuildingGrid) -> Exposure {
        let cell = grid.align(self.position);
        if grid.is_sealed(cell) {
            Exposure::Sealed
        } else if grid.system_at(cell).is_some() {
            Exposure::Breached
        } else {
            Exposure::Outside
        }
    }

    /// Advance one simulation tick: refill when sealed, drain otherwise.
    pub fn tick(&mut self, grid: &BuildingGrid) -> Exposure {
        let exposure = self.exposure(grid);
        let before = self.level;
        match exposure {
            Exposure::Sealed => {
                self.stats.ticks_sealed += 1;
                self.level = (self.level + self.config.refill_per_tick).min(self.config.capacity);
            }
            Exposure::Breached => {
                self.stats.ticks_breached += 1;
                self.level = (self.level - self.config.drain_per_tick).max(0.0);
            }
            Exposure::Outside => {
                self.stats.ticks_outside += 1;
                self.level = (self.level - self.config.drain_per_tick).max(0.0);
            }
        }

        if before > 0.0 && self.is_depleted() {
            tracing::warn!(pos = ?self.position, "oxygen depleted");
        }
        tracing::trace!(?exposure, level = self.level, "oxygen tick");
        exposure
    }
}
