use glam::IVec3;
use habitat_common::WorldPos;
use habitat_grid::{BuildingGrid, StructureSystem};
use habitat_kernel::Site;

/// Summary of a site for the inspector.
#[derive(Debug, Clone)]
pub struct SiteSummary {
    pub grid_unit: i32,
    pub placements: usize,
    pub systems: usize,
    pub occupied_cells: usize,
    pub sealed_cells: usize,
    pub disjoint: bool,
}

impl SiteSummary {
    pub fn of(site: &Site) -> Self {
        let grid = site.grid();
        Self {
            grid_unit: grid.grid_unit(),
            placements: site.placement_count(),
            systems: grid.system_count(),
            occupied_cells: grid.occupied_count(),
            sealed_cells: grid.systems().iter().map(StructureSystem::sealed_count).sum(),
            disjoint: grid.systems_are_disjoint(),
        }
    }
}

impl std::fmt::Display for SiteSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Site: unit={} placements={} systems={} occupied={} sealed={} disjoint={}",
            self.grid_unit,
            self.placements,
            self.systems,
            self.occupied_cells,
            self.sealed_cells,
            self.disjoint
        )
    }
}

/// One line per structure system.
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub origin: WorldPos,
    pub size: IVec3,
    pub occupied: usize,
    pub sealed: usize,
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "System origin=({}, {}, {}) size={}x{}x{} occupied={} sealed={}",
            self.origin.x,
            self.origin.y,
            self.origin.z,
            self.size.x,
            self.size.y,
            self.size.z,
            self.occupied,
            self.sealed,
        )
    }
}

pub fn list_systems(grid: &BuildingGrid) -> Vec<SystemInfo> {
    grid.systems()
        .iter()
        .map(|s| SystemInfo {
            origin: s.origin(),
            size: s.size(),
            occupied: s.occupied_count(),
            sealed: s.sealed_count(),
        })
        .collect()
}

/// Parse `x,y,z` into a world position.
pub fn parse_pos(text: &str) -> anyhow::Result<WorldPos> {
    let parts: Vec<i32> = text
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<Result<_, _>>()?;
    let [x, y, z] = parts[..] else {
        anyhow::bail!("expected x,y,z but got {text:?}");
    };
    Ok(WorldPos::new(x, y, z))
}
