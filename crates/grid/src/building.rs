use glam::IVec3;
use habitat_common::{Buildable, BuildableKind, Edge, WorldPos};

use crate::collider::ColliderQuery;
use crate::config::GridConfig;
use crate::structure::{FACE_NEIGHBORS, StructureSystem, floor_div};

/// Errors from building grid operations.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("grid unit must be positive, got {0}")]
    InvalidGridUnit(i32),
    #[error("no structure to remove at {pos}")]
    NotFound { pos: WorldPos },
}

/// What a successful removal did to the owning system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The last occupied cell went away and the system was dropped.
    Deleted,
    /// The system stayed in one piece and was re-sealed.
    Resealed,
    /// The system fell apart into this many systems.
    Split(usize),
    /// The buildable never lived on the grid.
    OffGrid,
}

/// All structure systems in the world.
///
/// Every mutating call leaves each touched system freshly sealed, so
/// [`is_sealed`](Self::is_sealed) is always current.
#[derive(Debug, Clone)]
pub struct BuildingGrid {
    systems: Vec<StructureSystem>,
    grid_unit: i32,
}

impl BuildingGrid {
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        config.validate()?;
        Ok(Self {
            systems: Vec::new(),
            grid_unit: config.grid_unit,
        })
    }

    pub fn grid_unit(&self) -> i32 {
        self.grid_unit
    }

    pub fn systems(&self) -> &[StructureSystem] {
        &self.systems
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Snap a world position down to the minimum corner of its cell.
    pub fn align(&self, pos: WorldPos) -> WorldPos {
        floor_div(pos, self.grid_unit).saturating_mul(IVec3::splat(self.grid_unit))
    }

    fn system_index_at(&self, pos: WorldPos) -> Option<usize> {
        self.systems.iter().position(|s| s.occupied_at(pos))
    }

    /// First system with an occupied cell at `pos`.
    pub fn system_at(&self, pos: WorldPos) -> Option<&StructureSystem> {
        self.system_index_at(pos).map(|i| &self.systems[i])
    }

    fn connected_indices(&self, pos: WorldPos) -> Vec<usize> {
        self.systems
            .iter()
            .enumerate()
            .filter(|(_, s)| s.connected_to(pos))
            .map(|(i, _)| i)
            .collect()
    }

    /// Every system with an occupied cell face-adjacent to `pos`.
    pub fn connected_systems(&self, pos: WorldPos) -> Vec<&StructureSystem> {
        self.connected_indices(pos)
            .into_iter()
            .map(|i| &self.systems[i])
            .collect()
    }

    /// The system a new module at `pos` belongs to, creating or merging as needed.
    pub fn join(&mut self, pos: WorldPos) -> &mut StructureSystem {
        let index = self.join_index(pos);
        &mut self.systems[index]
    }

    fn join_index(&mut self, pos: WorldPos) -> usize {
        if let Some(index) = self.system_index_at(pos) {
            return index;
        }

        let mut touching = self.connected_indices(pos);
        match touching.len() {
            0 => {
                let origin = self.align(pos);
                tracing::debug!(?origin, "new structure system");
                self.systems
                    .push(StructureSystem::new(origin, IVec3::ONE, self.grid_unit));
                self.systems.len() - 1
            }
            1 => touching[0],
            count => {
                let _span = tracing::debug_span!("merge", ?pos, count).entered();
                // Highest index first so earlier indices stay valid while removing.
                touching.sort_unstable_by(|a, b| b.cmp(a));
                let mut merged = self.systems.remove(touching[0]);
                for &index in &touching[1..] {
                    let other = self.systems.remove(index);
                    merged = Self::merge(&merged, &other);
                }
                tracing::debug!(origin = ?merged.origin(), size = ?merged.size(), "structure systems merged");
                self.systems.push(merged);
                self.systems.len() - 1
            }
        }
    }

    /// Combine two systems on the same lattice into one covering both boxes.
    ///
    /// Meant for systems that touch; the combined box is allocated densely.
    pub fn merge(a: &StructureSystem, b: &StructureSystem) -> StructureSystem {
        let unit = a.grid_unit();
        let origin = a.origin().min(b.origin());
        let far = a.world_max().max(b.world_max());
        let size = floor_div(far.saturating_sub(origin), unit)
            .max(a.size())
            .max(b.size());

        let mut merged = StructureSystem::new(origin, size, unit);
        for part in [a, b] {
            let offset = floor_div(part.origin().saturating_sub(origin), unit);
            merged.combine(part.cells(), part.size(), offset);
        }
        merged
    }

    /// Whether any system already has a floor at `pos`.
    pub fn has_floor(&self, pos: WorldPos) -> bool {
        self.systems.iter().any(|s| s.has_floor(pos))
    }

    /// Whether any system already has a wall on `edge` at `pos`.
    pub fn has_wall(&self, pos: WorldPos, edge: Edge) -> bool {
        self.systems.iter().any(|s| s.has_wall(pos, edge))
    }

    /// Place a floor. Returns `false` without touching anything if one is already there.
    pub fn add_floor(&mut self, pos: WorldPos) -> bool {
        if self.has_floor(pos) {
            tracing::debug!(?pos, "floor rejected: overlap");
            return false;
        }
        // `join` only hands back a system touching `pos`, so the index fits.
        let system = self.join(pos);
        let placed = system.add_floor(pos);
        system.seal();
        tracing::debug!(?pos, placed, "floor placed");
        placed
    }

    /// Place a wall. Returns `false` without touching anything if one is already there.
    pub fn add_wall(&mut self, pos: WorldPos, edge: Edge) -> bool {
        if self.has_wall(pos, edge) {
            tracing::debug!(?pos, ?edge, "wall rejected: overlap");
            return false;
        }
        let system = self.join(pos);
        let placed = system.add_wall(pos, edge);
        system.seal();
        tracing::debug!(?pos, ?edge, placed, "wall placed");
        placed
    }

    pub fn remove_floor(&mut self, pos: WorldPos) -> Result<Removal, GridError> {
        let index = self
            .systems
            .iter()
            .position(|s| s.has_floor(pos))
            .ok_or(GridError::NotFound { pos })?;
        let connections = self.systems[index].remove_floor(pos);
        tracing::debug!(?pos, connections, "floor removed");
        Ok(self.settle(index, pos, connections))
    }

    pub fn remove_wall(&mut self, pos: WorldPos, edge: Edge) -> Result<Removal, GridError> {
        let index = self
            .systems
            .iter()
            .position(|s| s.has_wall(pos, edge))
            .ok_or(GridError::NotFound { pos })?;
        let connections = self.systems[index].remove_wall(pos, edge);
        tracing::debug!(?pos, ?edge, connections, "wall removed");
        Ok(self.settle(index, pos, connections))
    }

    /// Restore the one-component-per-system invariant after a removal at `pos`.
    fn settle(&mut self, index: usize, pos: WorldPos, connections: usize) -> Removal {
        let system = &mut self.systems[index];

        // The cell still holds something, so nothing was disconnected.
        if system.occupied_at(pos) || connections == 1 {
            system.seal();
            return Removal::Resealed;
        }
        if connections == 0 && system.occupied_count() == 0 {
            self.systems.remove(index);
            tracing::debug!(?pos, "structure system deleted");
            return Removal::Deleted;
        }

        let parts = self.systems.remove(index).split();
        let count = parts.len();
        for mut part in parts {
            part.seal();
            self.systems.push(part);
        }
        Removal::Split(count)
    }

    /// Place any buildable. Misc modules only check `colliders` and leave the grid alone.
    pub fn add_structure<B, C>(&mut self, buildable: &B, colliders: &C) -> bool
    where
        B: Buildable + ?Sized,
        C: ColliderQuery + ?Sized,
    {
        let pos = buildable.target_position();
        match buildable.buildable_type() {
            BuildableKind::Floor => self.add_floor(pos),
            BuildableKind::Wall => self.add_wall(pos, Edge::from_yaw(buildable.orientation())),
            BuildableKind::Misc => {
                let center = pos.as_vec3() + buildable.center_offset();
                let free = !colliders.overlaps(center, buildable.size() * 0.5);
                tracing::debug!(?pos, free, "misc placement checked");
                free
            }
        }
    }

    pub fn remove_structure<B>(&mut self, buildable: &B) -> Result<Removal, GridError>
    where
        B: Buildable + ?Sized,
    {
        let pos = buildable.target_position();
        match buildable.buildable_type() {
            BuildableKind::Floor => self.remove_floor(pos),
            BuildableKind::Wall => self.remove_wall(pos, Edge::from_yaw(buildable.orientation())),
            BuildableKind::Misc => Ok(Removal::OffGrid),
        }
    }

    /// Whether `pos` is enclosed by any system.
    ///
    /// Also answers for empty cells inside a system's box, such as the upper
    /// half of a two-storey room.
    pub fn is_sealed(&self, pos: WorldPos) -> bool {
        self.systems.iter().any(|s| s.is_sealed(pos))
    }

    pub fn occupied_count(&self) -> usize {
        self.systems.iter().map(StructureSystem::occupied_count).sum()
    }

    /// Whether any two systems own an occupied cell at the same position or
    /// face-adjacent positions. Used by tests and the CLI inspector.
    pub fn systems_are_disjoint(&self) -> bool {
        self.systems.iter().enumerate().all(|(i, a)| {
            a.occupied_positions().all(|pos| {
                self.systems.iter().enumerate().all(|(j, b)| {
                    i == j
                        || (!b.occupied_at(pos)
                            && !FACE_NEIGHBORS
                                .iter()
                                .any(|&step| b.occupied_at(pos.saturating_add(step * self.grid_unit))))
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::{Aabb, ColliderSet};
    use glam::Vec3;
    use habitat_common::{BuildableRecord, PlacementId};

    fn p(x: i32, y: i32, z: i32) -> WorldPos {
        IVec3::new(x, y, z)
    }

    fn grid() -> BuildingGrid {
        BuildingGrid::new(GridConfig { grid_unit: 4 }).unwrap()
    }

    /// Three floors with a gap at x=8: one system of two cells, one of one.
    fn gapped_row() -> BuildingGrid {
        let mut g = grid();
        assert!(g.add_floor(p(0, 0, 0)));
        assert!(g.add_floor(p(4, 0, 0)));
        assert!(g.add_floor(p(12, 0, 0)));
        g
    }

    fn enclose(g: &mut BuildingGrid, pos: WorldPos) {
        g.add_floor(pos);
        for edge in Edge::ALL {
            g.add_wall(pos, edge);
        }
        g.add_floor(pos + IVec3::Y * g.grid_unit());
    }

    #[test]
    fn invalid_unit_is_rejected() {
        assert!(matches!(
            BuildingGrid::new(GridConfig { grid_unit: 0 }),
            Err(GridError::InvalidGridUnit(0))
        ));
    }

    #[test]
    fn isolated_floors_make_separate_systems() {
        let mut g = grid();
        g.add_floor(p(0, 0, 0));
        g.add_floor(p(40, 0, 0));
        assert_eq!(g.system_count(), 2);
        for s in g.systems() {
            assert_eq!(s.size(), IVec3::ONE);
        }
        assert!(g.systems_are_disjoint());
    }

    #[test]
    fn adjacent_floor_joins_existing_system() {
        let mut g = grid();
        g.add_floor(p(0, 0, 0));
        g.add_floor(p(4, 0, 0));
        assert_eq!(g.system_count(), 1);
        assert_eq!(g.systems()[0].size(), p(2, 1, 1));
        assert_eq!(g.systems()[0].origin(), p(0, 0, 0));
    }

    #[test]
    fn bridging_floor_merges_systems() {
        let mut g = gapped_row();
        assert_eq!(g.system_count(), 2);
        assert_eq!(g.connected_systems(p(8, 0, 0)).len(), 2);

        assert!(g.add_floor(p(8, 0, 0)));
        assert_eq!(g.system_count(), 1);
        let s = &g.systems()[0];
        assert_eq!(s.origin(), p(0, 0, 0));
        assert_eq!(s.size().x, 4);
        assert_eq!(s.occupied_count(), 4);
    }

    #[test]
    fn disconnecting_removal_splits() {
        let mut g = gapped_row();
        g.add_floor(p(8, 0, 0));

        assert_eq!(g.systems()[0].clone().remove_floor(p(8, 0, 0)), 2);
        assert_eq!(g.remove_floor(p(8, 0, 0)).unwrap(), Removal::Split(2));
        assert_eq!(g.system_count(), 2);

        let left = g.system_at(p(0, 0, 0)).unwrap();
        assert_eq!(left.size(), p(2, 1, 1));
        assert!(left.occupied_at(p(4, 0, 0)));

        let right = g.system_at(p(12, 0, 0)).unwrap();
        assert_eq!(right.size(), IVec3::ONE);
        assert_eq!(right.origin(), p(12, 0, 0));
        assert!(g.systems_are_disjoint());
    }

    #[test]
    fn removing_last_cell_deletes_system() {
        let mut g = grid();
        g.add_floor(p(0, 0, 0));
        assert_eq!(g.remove_floor(p(0, 0, 0)).unwrap(), Removal::Deleted);
        assert_eq!(g.system_count(), 0);
        assert!(g.system_at(p(0, 0, 0)).is_none());
    }

    #[test]
    fn duplicate_floor_is_rejected_without_mutation() {
        let mut g = grid();
        assert!(g.add_floor(p(0, 0, 0)));
        let before = g.systems().to_vec();
        assert!(!g.add_floor(p(0, 0, 0)));
        assert_eq!(g.systems(), before.as_slice());
    }

    #[test]
    fn duplicate_wall_is_rejected_but_other_edges_fit() {
        let mut g = grid();
        assert!(g.add_wall(p(0, 0, 0), Edge::Front));
        assert!(!g.add_wall(p(0, 0, 0), Edge::Front));
        assert!(g.add_wall(p(0, 0, 0), Edge::Back));
        assert!(g.add_floor(p(0, 0, 0)));
        assert_eq!(g.system_count(), 1);
    }

    #[test]
    fn removal_keeps_grown_box() {
        let mut g = grid();
        g.add_floor(p(0, 0, 0));
        g.add_floor(p(4, 0, 0));
        assert_eq!(g.remove_floor(p(4, 0, 0)).unwrap(), Removal::Resealed);
        let s = g.system_at(p(0, 0, 0)).unwrap();
        assert!(!s.occupied_at(p(4, 0, 0)));
        assert_eq!(s.size(), p(2, 1, 1));
    }

    #[test]
    fn removing_missing_structure_is_not_found() {
        let mut g = grid();
        assert!(matches!(
            g.remove_floor(p(0, 0, 0)),
            Err(GridError::NotFound { .. })
        ));
        g.add_floor(p(0, 0, 0));
        assert!(g.remove_wall(p(0, 0, 0), Edge::Left).is_err());
        assert_eq!(g.system_count(), 1);
    }

    #[test]
    fn removing_one_flag_of_a_busy_cell_only_reseals() {
        let mut g = grid();
        g.add_floor(p(0, 0, 0));
        g.add_wall(p(0, 0, 0), Edge::Right);
        assert_eq!(g.remove_floor(p(0, 0, 0)).unwrap(), Removal::Resealed);
        assert!(g.system_at(p(0, 0, 0)).is_some());
    }

    #[test]
    fn sealed_room_flips_when_any_face_is_removed() {
        for edge in Edge::ALL {
            let mut g = grid();
            enclose(&mut g, p(0, 0, 0));
            assert!(g.is_sealed(p(0, 0, 0)));
            g.remove_wall(p(0, 0, 0), edge).unwrap();
            assert!(!g.is_sealed(p(0, 0, 0)));
        }

        let mut g = grid();
        enclose(&mut g, p(0, 0, 0));
        g.remove_floor(p(0, 0, 0)).unwrap();
        assert!(!g.is_sealed(p(0, 0, 0)));

        let mut g = grid();
        enclose(&mut g, p(0, 0, 0));
        g.remove_floor(p(0, 4, 0)).unwrap();
        assert!(!g.is_sealed(p(0, 0, 0)));
    }

    #[test]
    fn room_without_ceiling_is_open() {
        let mut g = grid();
        g.add_floor(p(0, 0, 0));
        for edge in Edge::ALL {
            g.add_wall(p(0, 0, 0), edge);
        }
        assert!(!g.is_sealed(p(0, 0, 0)));
    }

    #[test]
    fn negative_coordinates_share_the_lattice() {
        let mut g = grid();
        g.add_floor(p(-1, 0, 0));
        assert_eq!(g.systems()[0].origin(), p(-4, 0, 0));
        g.add_floor(p(0, 0, 0));
        assert_eq!(g.system_count(), 1);
        assert_eq!(g.systems()[0].size(), p(2, 1, 1));
    }

    #[test]
    fn far_apart_systems_stay_queryable() {
        let west = p(-2_000_000_000, 0, 0);
        let east = p(2_000_000_000, 0, 0);

        let mut g = grid();
        assert!(g.add_floor(west));
        assert!(g.add_floor(east));
        assert_eq!(g.system_count(), 2);
        assert!(g.has_floor(east));
        assert!(!g.add_floor(east));
        assert_eq!(g.system_at(west).unwrap().origin(), west);
        assert_eq!(g.connected_systems(p(2_000_000_004, 0, 0)).len(), 1);
        assert!(!g.is_sealed(p(0, 0, 0)));
        assert!(g.systems_are_disjoint());

        assert_eq!(g.remove_floor(east).unwrap(), Removal::Deleted);
        assert_eq!(g.system_count(), 1);
    }

    #[test]
    fn opposite_ends_of_the_world_with_unit_one() {
        let mut g = BuildingGrid::new(GridConfig { grid_unit: 1 }).unwrap();
        assert!(g.add_floor(p(i32::MIN, 0, 0)));
        assert!(g.add_floor(p(i32::MAX, 0, 0)));
        assert_eq!(g.system_count(), 2);
        assert!(g.has_floor(p(i32::MAX, 0, 0)));
        assert!(g.connected_systems(p(0, 0, 0)).is_empty());
        assert!(g.systems_are_disjoint());
    }

    #[test]
    fn three_way_merge_collapses_to_one() {
        let mut g = grid();
        g.add_floor(p(-4, 0, 0));
        g.add_floor(p(4, 0, 0));
        g.add_floor(p(0, 0, 4));
        assert_eq!(g.system_count(), 3);

        g.add_floor(p(0, 0, 0));
        assert_eq!(g.system_count(), 1);
        let s = &g.systems()[0];
        assert_eq!(s.origin(), p(-4, 0, 0));
        assert_eq!(s.size(), p(3, 1, 2));
        assert_eq!(s.occupied_count(), 4);
    }

    #[test]
    fn merge_keeps_cells_of_overlapping_boxes() {
        let mut a = StructureSystem::new(p(0, 0, 0), p(3, 1, 1), 4);
        a.add_floor(p(0, 0, 0));
        let mut b = StructureSystem::new(p(8, 0, 0), IVec3::ONE, 4);
        b.add_floor(p(8, 0, 0));

        let merged = BuildingGrid::merge(&a, &b);
        assert_eq!(merged.size(), p(3, 1, 1));
        assert!(merged.has_floor(p(0, 0, 0)));
        assert!(merged.has_floor(p(8, 0, 0)));
    }

    #[test]
    fn add_structure_dispatches_by_kind() {
        let mut g = grid();
        let colliders = ColliderSet::new();

        assert!(g.add_structure(&BuildableRecord::floor(p(0, 0, 0)), &colliders));
        let wall = BuildableRecord::new("wall", BuildableKind::Wall, p(0, 0, 0), 90.0);
        assert!(g.add_structure(&wall, &colliders));
        assert!(g.systems()[0].has_wall(p(0, 0, 0), Edge::Right));
        assert!(!g.add_structure(&wall, &colliders));

        assert_eq!(g.remove_structure(&wall).unwrap(), Removal::Resealed);
        assert!(!g.has_wall(p(0, 0, 0), Edge::Right));
    }

    #[test]
    fn misc_uses_colliders_and_skips_grid() {
        let mut g = grid();
        let mut colliders = ColliderSet::new();
        let crate_box = BuildableRecord::misc("crate", p(0, 0, 0), Vec3::splat(2.0));

        assert!(g.add_structure(&crate_box, &colliders));
        assert_eq!(g.system_count(), 0);

        colliders.insert(
            PlacementId::new(),
            Aabb::from_center(Vec3::ZERO, Vec3::ONE),
        );
        assert!(!g.add_structure(&crate_box, &colliders));
        assert_eq!(g.remove_structure(&crate_box).unwrap(), Removal::OffGrid);
    }
}
