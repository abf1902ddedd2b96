use std::collections::BTreeMap;

use habitat_common::{BuildableKind, BuildableRecord, Edge, PlacementId, WorldPos};
use habitat_grid::{Aabb, BuildingGrid, ColliderSet, GridConfig, GridError, Removal};
use serde::{Deserialize, Serialize};

/// An event record produced by every placement attempt and removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SiteEvent {
    /// A module was accepted and now occupies the site.
    Placed { record: BuildableRecord },
    /// A module was taken down. Carries the record for undo support.
    Removed { record: BuildableRecord },
    /// A placement was refused because the spot was taken.
    Rejected { record: BuildableRecord },
}

/// Errors from site operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("placement {0:?} not found")]
    PlacementNotFound(PlacementId),
    #[error("placement {0:?} already exists")]
    DuplicatePlacement(PlacementId),
    #[error("replayed placement {id:?} was refused by the rebuilt site")]
    ReplayConflict { id: PlacementId },
}

/// The authoritative building site.
///
/// Owns the building grid, the colliders of off-grid modules and the table of
/// placed records. Records are kept in a BTreeMap so iteration and hashing are
/// deterministic.
#[derive(Debug, Clone)]
pub struct Site {
    config: GridConfig,
    grid: BuildingGrid,
    colliders: ColliderSet,
    records: BTreeMap<PlacementId, BuildableRecord>,
    /// Append-only event log of all placement activity.
    event_log: Vec<SiteEvent>,
}

fn footprint(record: &BuildableRecord) -> Aabb {
    Aabb::from_center(
        record.position.as_vec3() + record.center_offset,
        record.size * 0.5,
    )
}

impl Site {
    pub fn new(config: GridConfig) -> Result<Self, SiteError> {
        Ok(Self {
            config,
            grid: BuildingGrid::new(config)?,
            colliders: ColliderSet::new(),
            records: BTreeMap::new(),
            event_log: Vec::new(),
        })
    }

    pub fn config(&self) -> GridConfig {
        self.config
    }

    /// Read-only access to the building grid, for life support and inspection.
    pub fn grid(&self) -> &BuildingGrid {
        &self.grid
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn records(&self) -> &BTreeMap<PlacementId, BuildableRecord> {
        &self.records
    }

    pub fn record(&self, id: PlacementId) -> Option<&BuildableRecord> {
        self.records.get(&id)
    }

    pub fn placement_count(&self) -> usize {
        self.records.len()
    }

    pub fn events(&self) -> &[SiteEvent] {
        &self.event_log
    }

    /// Drain and return the event log. Useful for persistence and undo/redo.
    pub fn drain_events(&mut self) -> Vec<SiteEvent> {
        std::mem::take(&mut self.event_log)
    }

    pub fn is_sealed(&self, pos: WorldPos) -> bool {
        self.grid.is_sealed(pos)
    }

    /// Try to place a module. Returns `Ok(false)` if the spot is taken.
    pub fn place(&mut self, record: BuildableRecord) -> Result<bool, SiteError> {
        if self.records.contains_key(&record.id) {
            return Err(SiteError::DuplicatePlacement(record.id));
        }

        if !self.grid.add_structure(&record, &self.colliders) {
            tracing::debug!(tag = %record.tag, pos = ?record.position, "placement rejected");
            self.event_log.push(SiteEvent::Rejected { record });
            return Ok(false);
        }

        if record.kind == BuildableKind::Misc {
            self.colliders.insert(record.id, footprint(&record));
        }
        tracing::debug!(tag = %record.tag, pos = ?record.position, "placed");
        self.records.insert(record.id, record.clone());
        self.event_log.push(SiteEvent::Placed { record });
        Ok(true)
    }

    /// Take down a placed module.
    pub fn remove(&mut self, id: PlacementId) -> Result<(BuildableRecord, Removal), SiteError> {
        let record = self
            .records
            .get(&id)
            .ok_or(SiteError::PlacementNotFound(id))?;
        let outcome = self.grid.remove_structure(record)?;

        let Some(record) = self.records.remove(&id) else {
            return Err(SiteError::PlacementNotFound(id));
        };
        if record.kind == BuildableKind::Misc {
            self.colliders.remove(id);
        }
        tracing::debug!(tag = %record.tag, pos = ?record.position, ?outcome, "removed");
        self.event_log.push(SiteEvent::Removed {
            record: record.clone(),
        });
        Ok((record, outcome))
    }

    /// Reconstruct a site by replaying an event log.
    ///
    /// Rejections are skipped; they never changed state. A `Placed` event the
    /// rebuilt site refuses means the log contradicts itself, and fails the
    /// replay. The returned site has an empty event log.
    pub fn replay(config: GridConfig, events: &[SiteEvent]) -> Result<Self, SiteError> {
        let mut site = Self::new(config)?;
        for event in events {
            match event {
                SiteEvent::Placed { record } => {
                    if !site.place(record.clone())? {
                        return Err(SiteError::ReplayConflict { id: record.id });
                    }
                }
                SiteEvent::Removed { record } => {
                    site.remove(record.id)?;
                }
                SiteEvent::Rejected { .. } => {}
            }
        }
        site.drain_events();
        Ok(site)
    }

    /// Deterministic hash of placed records and grid occupancy.
    ///
    /// Independent of the order systems are stored in, so a replayed site
    /// hashes the same as the original.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };

        mix(&mut h, &self.config.grid_unit.to_le_bytes());
        for (id, record) in &self.records {
            mix(&mut h, id.0.as_bytes());
            mix(&mut h, record.tag.as_bytes());
            mix(&mut h, &record.position.x.to_le_bytes());
            mix(&mut h, &record.position.y.to_le_bytes());
            mix(&mut h, &record.position.z.to_le_bytes());
            mix(&mut h, &record.yaw.to_le_bytes());
        }

        let mut cells: Vec<(WorldPos, u8)> = Vec::new();
        for system in self.grid.systems() {
            for pos in system.occupied_positions() {
                let Some(cell) = system.cell_at(pos) else {
                    continue;
                };
                let mut bits = u8::from(cell.floor()) | (u8::from(cell.is_sealed()) << 5);
                for edge in Edge::ALL {
                    bits |= u8::from(cell.wall(edge)) << (edge.index() + 1);
                }
                cells.push((pos, bits));
            }
        }
        cells.sort_by_key(|(pos, _)| (pos.x, pos.y, pos.z));
        for (pos, bits) in cells {
            mix(&mut h, &pos.x.to_le_bytes());
            mix(&mut h, &pos.y.to_le_bytes());
            mix(&mut h, &pos.z.to_le_bytes());
            mix(&mut h, &[bits]);
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{IVec3, Vec3};

    fn p(x: i32, y: i32, z: i32) -> WorldPos {
        IVec3::new(x, y, z)
    }

    fn site() -> Site {
        Site::new(GridConfig::default()).unwrap()
    }

    fn build_closed_room(site: &mut Site) {
        site.place(BuildableRecord::floor(p(0, 0, 0))).unwrap();
        for edge in Edge::ALL {
            site.place(BuildableRecord::wall(p(0, 0, 0), edge)).unwrap();
        }
        site.place(BuildableRecord::floor(p(0, 4, 0))).unwrap();
    }

    #[test]
    fn site_starts_empty() {
        let s = site();
        assert_eq!(s.placement_count(), 0);
        assert_eq!(s.grid().system_count(), 0);
        assert!(s.events().is_empty());
    }

    #[test]
    fn place_and_remove() {
        let mut s = site();
        let floor = BuildableRecord::floor(p(0, 0, 0));
        let id = floor.id;
        assert!(s.place(floor).unwrap());
        assert_eq!(s.placement_count(), 1);
        assert!(s.record(id).is_some());

        let (record, outcome) = s.remove(id).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(outcome, Removal::Deleted);
        assert_eq!(s.placement_count(), 0);
        assert_eq!(s.grid().system_count(), 0);
    }

    #[test]
    fn rejected_placement_is_logged_but_not_stored() {
        let mut s = site();
        assert!(s.place(BuildableRecord::floor(p(0, 0, 0))).unwrap());
        assert!(!s.place(BuildableRecord::floor(p(0, 0, 0))).unwrap());
        assert_eq!(s.placement_count(), 1);
        assert!(matches!(s.events().last(), Some(SiteEvent::Rejected { .. })));
    }

    #[test]
    fn duplicate_id_is_an_error() {
        let mut s = site();
        let floor = BuildableRecord::floor(p(0, 0, 0));
        s.place(floor.clone()).unwrap();
        let mut moved = floor;
        moved.position = p(40, 0, 0);
        assert!(matches!(
            s.place(moved),
            Err(SiteError::DuplicatePlacement(_))
        ));
    }

    #[test]
    fn remove_unknown_id_is_an_error() {
        let mut s = site();
        assert!(matches!(
            s.remove(PlacementId::new()),
            Err(SiteError::PlacementNotFound(_))
        ));
    }

    #[test]
    fn misc_blocks_overlapping_misc() {
        let mut s = site();
        let table = BuildableRecord::misc("table", p(0, 0, 0), Vec3::splat(2.0));
        let table_id = table.id;
        assert!(s.place(table).unwrap());
        assert_eq!(s.colliders().len(), 1);
        assert_eq!(s.grid().system_count(), 0);

        let chair = BuildableRecord::misc("chair", p(1, 0, 0), Vec3::ONE);
        assert!(!s.place(chair.clone()).unwrap());

        let (_, outcome) = s.remove(table_id).unwrap();
        assert_eq!(outcome, Removal::OffGrid);
        assert!(s.colliders().is_empty());
        assert!(s.place(chair).unwrap());
    }

    #[test]
    fn sealed_room_through_site() {
        let mut s = site();
        build_closed_room(&mut s);
        assert!(s.is_sealed(p(0, 0, 0)));
    }

    #[test]
    fn events_are_recorded() {
        let mut s = site();
        let floor = BuildableRecord::floor(p(0, 0, 0));
        let id = floor.id;
        s.place(floor.clone()).unwrap();
        s.place(BuildableRecord::floor(p(0, 0, 0))).unwrap();
        s.remove(id).unwrap();
        assert_eq!(s.events().len(), 3); // place + reject + remove
    }

    #[test]
    fn drain_events_clears_log() {
        let mut s = site();
        s.place(BuildableRecord::floor(p(0, 0, 0))).unwrap();
        let events = s.drain_events();
        assert_eq!(events.len(), 1);
        assert!(s.events().is_empty());
    }

    #[test]
    fn replay_equivalence() {
        let mut s = site();
        build_closed_room(&mut s);
        let stray = BuildableRecord::floor(p(40, 0, 0));
        let stray_id = stray.id;
        s.place(stray).unwrap();
        s.place(BuildableRecord::floor(p(44, 0, 0))).unwrap();
        s.remove(stray_id).unwrap();

        let replayed = Site::replay(s.config(), s.events()).unwrap();
        assert_eq!(replayed.state_hash(), s.state_hash());
        assert_eq!(replayed.placement_count(), s.placement_count());
        assert!(replayed.is_sealed(p(0, 0, 0)));
        assert!(replayed.events().is_empty());
    }

    #[test]
    fn replay_fails_on_refused_placement() {
        let first = BuildableRecord::floor(p(0, 0, 0));
        let second = BuildableRecord::floor(p(0, 0, 0));
        let second_id = second.id;
        let events = vec![
            SiteEvent::Placed { record: first },
            SiteEvent::Placed { record: second },
        ];

        match Site::replay(GridConfig::default(), &events) {
            Err(SiteError::ReplayConflict { id }) => assert_eq!(id, second_id),
            other => panic!("expected ReplayConflict, got {other:?}"),
        }
    }

    #[test]
    fn replay_skips_rejections() {
        let mut s = site();
        s.place(BuildableRecord::floor(p(0, 0, 0))).unwrap();
        assert!(!s.place(BuildableRecord::floor(p(0, 0, 0))).unwrap());

        let replayed = Site::replay(s.config(), s.events()).unwrap();
        assert_eq!(replayed.placement_count(), 1);
        assert_eq!(replayed.state_hash(), s.state_hash());
    }

    #[test]
    fn state_hash_changes_after_removal() {
        let mut a = site();
        build_closed_room(&mut a);
        let before = a.state_hash();

        let front = a
            .records()
            .values()
            .find(|r| r.kind == BuildableKind::Wall && Edge::from_yaw(r.yaw) == Edge::Front)
            .map(|r| r.id)
            .unwrap();
        a.remove(front).unwrap();
        assert_ne!(a.state_hash(), before);
    }
}
