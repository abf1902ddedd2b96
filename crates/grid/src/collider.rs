use std::collections::BTreeMap;

use glam::Vec3;
use habitat_common::PlacementId;

/// Physical overlap test used for buildables that do not live on the grid.
pub trait ColliderQuery {
    /// Whether an axis-aligned box at `center` with `half_extents` touches any collider.
    fn overlaps(&self, center: Vec3, half_extents: Vec3) -> bool;
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Strict overlap: boxes that only share a face do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmplt(other.max).all() && other.min.cmplt(self.max).all()
    }
}

/// In-memory collider set for placed Misc buildables.
#[derive(Debug, Clone, Default)]
pub struct ColliderSet {
    boxes: BTreeMap<PlacementId, Aabb>,
}

impl ColliderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: PlacementId, bounds: Aabb) {
        self.boxes.insert(id, bounds);
    }

    pub fn remove(&mut self, id: PlacementId) -> Option<Aabb> {
        self.boxes.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl ColliderQuery for ColliderSet {
    fn overlaps(&self, center: Vec3, half_extents: Vec3) -> bool {
        let probe = Aabb::from_center(center, half_extents);
        self.boxes.values().any(|b| b.intersects(&probe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = Aabb::from_center(Vec3::ZERO, Vec3::splat(0.5));
        let b = Aabb::from_center(Vec3::new(1.0, 0.0, 0.0), Vec3::splat(0.5));
        assert!(!a.intersects(&b));

        let c = Aabb::from_center(Vec3::new(0.9, 0.0, 0.0), Vec3::splat(0.5));
        assert!(a.intersects(&c));
        assert!(c.intersects(&a));
    }

    #[test]
    fn collider_set_insert_and_remove() {
        let mut set = ColliderSet::new();
        let id = PlacementId::new();
        set.insert(id, Aabb::from_center(Vec3::ZERO, Vec3::ONE));
        assert_eq!(set.len(), 1);
        assert!(set.overlaps(Vec3::new(1.5, 0.0, 0.0), Vec3::ONE));
        assert!(!set.overlaps(Vec3::new(5.0, 0.0, 0.0), Vec3::ONE));

        assert!(set.remove(id).is_some());
        assert!(set.is_empty());
        assert!(!set.overlaps(Vec3::ZERO, Vec3::ONE));
    }
}
