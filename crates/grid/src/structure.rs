use std::collections::VecDeque;

use glam::IVec3;
use habitat_common::{Edge, WorldPos};

use crate::cell::Cell;

/// The six face-adjacent grid steps.
pub(crate) const FACE_NEIGHBORS: [IVec3; 6] = [
    IVec3::X,
    IVec3::NEG_X,
    IVec3::Y,
    IVec3::NEG_Y,
    IVec3::Z,
    IVec3::NEG_Z,
];

/// Componentwise floor division. `unit` must be positive.
pub(crate) fn floor_div(v: IVec3, unit: i32) -> IVec3 {
    IVec3::new(v.x.div_euclid(unit), v.y.div_euclid(unit), v.z.div_euclid(unit))
}

/// Cell index of `pos` relative to `origin`.
///
/// The difference is taken in `i64`, so positions on opposite ends of the
/// world never overflow. `None` when the index does not fit in an `i32`.
pub(crate) fn cell_offset(origin: WorldPos, pos: WorldPos, unit: i32) -> Option<IVec3> {
    let axis = |p: i32, o: i32| {
        i32::try_from((i64::from(p) - i64::from(o)).div_euclid(i64::from(unit))).ok()
    };
    Some(IVec3::new(
        axis(pos.x, origin.x)?,
        axis(pos.y, origin.y)?,
        axis(pos.z, origin.z)?,
    ))
}

fn volume(size: IVec3) -> usize {
    size.x as usize * size.y as usize * size.z as usize
}

/// Row-major offset of `index` in an array of extent `size`. No bounds check.
fn flat(size: IVec3, index: IVec3) -> usize {
    (index.x + size.x * (index.y + size.y * index.z)) as usize
}

fn within(size: IVec3, index: IVec3) -> bool {
    index.cmpge(IVec3::ZERO).all() && index.cmplt(size).all()
}

/// Whether gas moving by `step` from `from` into `to` crosses a wall or floor.
///
/// A cell's floor is its bottom face, so upward travel is stopped by the floor
/// of the cell being entered.
fn face_blocked(from: &Cell, to: &Cell, step: IVec3) -> bool {
    if step == IVec3::Y {
        return to.floor();
    }
    if step == IVec3::NEG_Y {
        return from.floor();
    }
    Edge::ALL
        .into_iter()
        .find(|edge| edge.offset() == step)
        .is_some_and(|edge| from.wall(edge) || to.wall(edge.opposite()))
}

/// One connected mass of placed floors and walls.
///
/// Owns a dense box of cells anchored at `origin`. The box grows in place when
/// adjacent cells are added and never shrinks; empty cells inside it are fine.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureSystem {
    origin: WorldPos,
    size: IVec3,
    grid_unit: i32,
    cells: Vec<Cell>,
}

impl StructureSystem {
    /// Allocate a system of `size` empty cells whose index zero sits at `origin`.
    pub fn new(origin: WorldPos, size: IVec3, grid_unit: i32) -> Self {
        assert!(grid_unit > 0, "grid_unit must be positive");
        assert!(size.min_element() > 0, "size must be positive on every axis");
        Self {
            origin,
            size,
            grid_unit,
            cells: vec![Cell::default(); volume(size)],
        }
    }

    /// World position of cell index zero.
    pub fn origin(&self) -> WorldPos {
        self.origin
    }

    /// Cell count along each axis.
    pub fn size(&self) -> IVec3 {
        self.size
    }

    pub fn grid_unit(&self) -> i32 {
        self.grid_unit
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// One past the last world coordinate covered on each axis, saturating
    /// at the edge of the `i32` range.
    pub fn world_max(&self) -> WorldPos {
        self.origin
            .saturating_add(self.size.saturating_mul(IVec3::splat(self.grid_unit)))
    }

    /// Map a world position to a (possibly out-of-range) cell index.
    ///
    /// `None` when `pos` is so far from the box that the index overflows.
    pub fn grid_index(&self, pos: WorldPos) -> Option<IVec3> {
        cell_offset(self.origin, pos, self.grid_unit)
    }

    /// World position of the minimum corner of a cell.
    pub fn world_position(&self, index: IVec3) -> WorldPos {
        self.origin + index * self.grid_unit
    }

    pub fn in_bounds(&self, index: IVec3) -> bool {
        within(self.size, index)
    }

    /// Whether `pos` falls inside the bounding box, occupied or not.
    pub fn contains(&self, pos: WorldPos) -> bool {
        self.grid_index(pos).is_some_and(|index| self.in_bounds(index))
    }

    fn linear(&self, index: IVec3) -> Option<usize> {
        self.in_bounds(index).then(|| flat(self.size, index))
    }

    fn index_of(&self, linear: usize) -> IVec3 {
        let i = linear as i32;
        let layer = self.size.x * self.size.y;
        IVec3::new(i % self.size.x, (i / self.size.x) % self.size.y, i / layer)
    }

    pub fn cell(&self, index: IVec3) -> Option<&Cell> {
        self.linear(index).map(|i| &self.cells[i])
    }

    pub fn cell_at(&self, pos: WorldPos) -> Option<&Cell> {
        self.cell(self.grid_index(pos)?)
    }

    fn occupied_index(&self, index: IVec3) -> bool {
        self.cell(index).is_some_and(|c| !c.is_empty())
    }

    /// Whether the cell at `pos` holds a floor or any wall. False outside the box.
    pub fn occupied_at(&self, pos: WorldPos) -> bool {
        self.grid_index(pos)
            .is_some_and(|index| self.occupied_index(index))
    }

    pub fn has_floor(&self, pos: WorldPos) -> bool {
        self.cell_at(pos).is_some_and(Cell::floor)
    }

    pub fn has_wall(&self, pos: WorldPos, edge: Edge) -> bool {
        self.cell_at(pos).is_some_and(|c| c.wall(edge))
    }

    /// Whether any face neighbor of `pos` (not `pos` itself) is occupied here.
    pub fn connected_to(&self, pos: WorldPos) -> bool {
        self.grid_index(pos)
            .is_some_and(|index| self.connection_count(index) > 0)
    }

    fn connection_count(&self, index: IVec3) -> usize {
        FACE_NEIGHBORS
            .iter()
            .filter(|&&step| self.occupied_index(index.saturating_add(step)))
            .count()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    pub fn sealed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_sealed()).count()
    }

    /// World positions of every occupied cell, in storage order.
    pub fn occupied_positions(&self) -> impl Iterator<Item = WorldPos> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(i, _)| self.world_position(self.index_of(i)))
    }

    /// Slot for `pos`, growing the box first if it lies outside.
    fn slot_for(&mut self, pos: WorldPos) -> Option<usize> {
        let index = self.grid_index(pos)?;
        if !self.in_bounds(index) {
            self.resize(index);
        }
        self.linear(self.grid_index(pos)?)
    }

    /// Set the floor at `pos`. Returns `false` if `pos` is too far away to index.
    pub fn add_floor(&mut self, pos: WorldPos) -> bool {
        let Some(slot) = self.slot_for(pos) else {
            return false;
        };
        self.cells[slot].set_floor(true);
        true
    }

    /// Set one wall at `pos`. Returns `false` if `pos` is too far away to index.
    pub fn add_wall(&mut self, pos: WorldPos, edge: Edge) -> bool {
        let Some(slot) = self.slot_for(pos) else {
            return false;
        };
        self.cells[slot].set_wall(edge, true);
        true
    }

    /// Clear the floor at `pos`.
    ///
    /// Returns how many face neighbors were occupied before the removal, which
    /// is the number of pieces this cell may have been holding together.
    pub fn remove_floor(&mut self, pos: WorldPos) -> usize {
        self.clear(pos, |cell| cell.set_floor(false))
    }

    /// Clear one wall at `pos`. Returns the pre-removal connection count.
    pub fn remove_wall(&mut self, pos: WorldPos, edge: Edge) -> usize {
        self.clear(pos, |cell| cell.set_wall(edge, false))
    }

    fn clear(&mut self, pos: WorldPos, apply: impl FnOnce(&mut Cell)) -> usize {
        let Some(index) = self.grid_index(pos) else {
            return 0;
        };
        let Some(slot) = self.linear(index) else {
            return 0;
        };
        let count = self.connection_count(index);
        apply(&mut self.cells[slot]);
        count
    }

    /// Grow the box so that `index` becomes valid.
    ///
    /// Each axis grows independently on whichever side `index` falls off; for
    /// a face-adjacent placement that is exactly one cell. Growing on the
    /// negative side moves `origin` back by the same number of units.
    pub fn resize(&mut self, index: IVec3) {
        let grow_neg = (-index).max(IVec3::ZERO);
        let grow_pos = (index - (self.size - IVec3::ONE)).max(IVec3::ZERO);
        if grow_neg == IVec3::ZERO && grow_pos == IVec3::ZERO {
            return;
        }

        let old_size = self.size;
        let old_cells = std::mem::take(&mut self.cells);
        self.size = old_size + grow_neg + grow_pos;
        self.origin -= grow_neg * self.grid_unit;
        self.cells = vec![Cell::default(); volume(self.size)];
        self.combine(&old_cells, old_size, grow_neg);

        tracing::trace!(?old_size, new_size = ?self.size, origin = ?self.origin, "structure resized");
    }

    /// Copy `other_cells` (of extent `bounds`) into this box starting at `offset`.
    ///
    /// Flags are unioned, so an empty source cell never clears an occupied
    /// destination. Source cells landing outside the box are skipped.
    pub fn combine(&mut self, other_cells: &[Cell], bounds: IVec3, offset: IVec3) {
        for z in 0..bounds.z {
            for y in 0..bounds.y {
                for x in 0..bounds.x {
                    let src = IVec3::new(x, y, z);
                    let Some(dst) = self.linear(src + offset) else {
                        continue;
                    };
                    let from = other_cells[flat(bounds, src)];
                    self.cells[dst].absorb(&from);
                }
            }
        }
    }

    /// Partition the occupied cells into 6-connected components.
    ///
    /// Every component becomes a new system with a tight bounding box. The
    /// caller replaces this system with the result. Seal state is not copied.
    pub fn split(&self) -> Vec<StructureSystem> {
        let _span = tracing::debug_span!("split", origin = ?self.origin, size = ?self.size).entered();

        let mut visited = vec![false; self.cells.len()];
        let mut parts = Vec::new();

        for start in 0..self.cells.len() {
            if visited[start] || self.cells[start].is_empty() {
                continue;
            }
            visited[start] = true;

            let mut queue = VecDeque::from([start]);
            let mut members = Vec::new();
            let mut min = self.index_of(start);
            let mut max = min;

            while let Some(current) = queue.pop_front() {
                let index = self.index_of(current);
                min = min.min(index);
                max = max.max(index);
                members.push(current);

                for step in FACE_NEIGHBORS {
                    let Some(next) = self.linear(index + step) else {
                        continue;
                    };
                    if visited[next] || self.cells[next].is_empty() {
                        continue;
                    }
                    visited[next] = true;
                    queue.push_back(next);
                }
            }

            let mut part = StructureSystem::new(
                self.world_position(min),
                max - min + IVec3::ONE,
                self.grid_unit,
            );
            for member in members {
                let local = self.index_of(member) - min;
                let slot = flat(part.size, local);
                part.cells[slot].absorb(&self.cells[member]);
            }
            parts.push(part);
        }

        tracing::debug!(components = parts.len(), "structure split");
        parts
    }

    fn padded_cell(&self, padded: IVec3) -> Cell {
        self.cell(padded - IVec3::ONE).copied().unwrap_or_default()
    }

    /// Recompute which cells are cut off from the outside.
    ///
    /// A one-cell shell around the box counts as exterior. Gas floods inward
    /// through every face not covered by a wall or floor; any cell it cannot
    /// reach is sealed.
    pub fn seal(&mut self) {
        let _span = tracing::debug_span!("seal", origin = ?self.origin, size = ?self.size).entered();

        let padded = self.size + IVec3::splat(2);
        let far = padded - IVec3::ONE;
        let mut reached = vec![false; volume(padded)];
        let mut queue = VecDeque::new();

        for z in 0..padded.z {
            for y in 0..padded.y {
                for x in 0..padded.x {
                    let p = IVec3::new(x, y, z);
                    if p.cmpeq(IVec3::ZERO).any() || p.cmpeq(far).any() {
                        reached[flat(padded, p)] = true;
                        queue.push_back(p);
                    }
                }
            }
        }

        while let Some(p) = queue.pop_front() {
            let from = self.padded_cell(p);
            for step in FACE_NEIGHBORS {
                let q = p + step;
                if !within(padded, q) {
                    continue;
                }
                let slot = flat(padded, q);
                if reached[slot] || face_blocked(&from, &self.padded_cell(q), step) {
                    continue;
                }
                reached[slot] = true;
                queue.push_back(q);
            }
        }

        for linear in 0..self.cells.len() {
            let p = self.index_of(linear) + IVec3::ONE;
            let open = reached[flat(padded, p)];
            self.cells[linear].set_sealed(!open);
        }

        tracing::trace!(sealed = self.sealed_count(), "seal recomputed");
    }

    /// Whether the cell at `pos` was enclosed at the last [`seal`](Self::seal).
    pub fn is_sealed(&self, pos: WorldPos) -> bool {
        self.cell_at(pos).is_some_and(Cell::is_sealed)
    }
}
