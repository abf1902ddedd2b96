use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Integer world-space position. Building placements are snapped to whole units.
pub type WorldPos = IVec3;

/// One of the four horizontal wall directions of a cell.
///
/// Yaw 0 faces +Z (front), turning clockwise seen from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Edge {
    Front,
    Right,
    Back,
    Left,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Front, Edge::Right, Edge::Back, Edge::Left];

    /// Slot of this edge in a cell's wall array.
    pub fn index(self) -> usize {
        match self {
            Edge::Front => 0,
            Edge::Right => 1,
            Edge::Back => 2,
            Edge::Left => 3,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Edge::Front => Edge::Back,
            Edge::Right => Edge::Left,
            Edge::Back => Edge::Front,
            Edge::Left => Edge::Right,
        }
    }

    /// Grid step across this edge.
    pub fn offset(self) -> IVec3 {
        match self {
            Edge::Front => IVec3::Z,
            Edge::Right => IVec3::X,
            Edge::Back => IVec3::NEG_Z,
            Edge::Left => IVec3::NEG_X,
        }
    }

    /// Classify a yaw in degrees as an edge.
    ///
    /// Rounds to the nearest quarter turn, so 89.9 is `Right` and -90 is `Left`.
    pub fn from_yaw(degrees: f32) -> Self {
        let quarter = (degrees / 90.0).round() as i32;
        match quarter.rem_euclid(4) {
            0 => Edge::Front,
            1 => Edge::Right,
            2 => Edge::Back,
            _ => Edge::Left,
        }
    }

    /// Yaw in degrees that produces this edge.
    pub fn yaw(self) -> f32 {
        self.index() as f32 * 90.0
    }
}

/// What kind of module a buildable is, which decides how it is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildableKind {
    /// Occupies the bottom face of a grid cell.
    Floor,
    /// Occupies one horizontal edge of a grid cell.
    Wall,
    /// Free-standing prop, placed by collider overlap instead of the grid.
    Misc,
}

/// Anything the building tool can place.
pub trait Buildable {
    fn buildable_type(&self) -> BuildableKind;

    /// Settled placement position (not the live, smoothed transform).
    fn target_position(&self) -> WorldPos;

    /// Yaw in degrees.
    fn orientation(&self) -> f32;

    /// Full extents of the footprint. Only consulted for `Misc`.
    fn size(&self) -> Vec3 {
        Vec3::ONE
    }

    /// Offset from `target_position` to the footprint center. Only consulted for `Misc`.
    fn center_offset(&self) -> Vec3 {
        Vec3::ZERO
    }
}

/// Unique identifier for a placed buildable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlacementId(pub Uuid);

impl PlacementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlacementId {
    fn default() -> Self {
        Self::new()
    }
}

/// A buildable as it is stored, replayed and saved: tag, position and rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildableRecord {
    pub id: PlacementId,
    /// Catalogue tag of the module, e.g. `"floor_steel"`.
    pub tag: String,
    pub kind: BuildableKind,
    pub position: WorldPos,
    pub yaw: f32,
    #[serde(default = "unit_size")]
    pub size: Vec3,
    #[serde(default)]
    pub center_offset: Vec3,
}

fn unit_size() -> Vec3 {
    Vec3::ONE
}

impl BuildableRecord {
    pub fn new(tag: impl Into<String>, kind: BuildableKind, position: WorldPos, yaw: f32) -> Self {
        Self {
            id: PlacementId::new(),
            tag: tag.into(),
            kind,
            position,
            yaw,
            size: Vec3::ONE,
            center_offset: Vec3::ZERO,
        }
    }

    pub fn floor(position: WorldPos) -> Self {
        Self::new("floor", BuildableKind::Floor, position, 0.0)
    }

    pub fn wall(position: WorldPos, edge: Edge) -> Self {
        Self::new("wall", BuildableKind::Wall, position, edge.yaw())
    }

    pub fn misc(tag: impl Into<String>, position: WorldPos, size: Vec3) -> Self {
        Self {
            size,
            ..Self::new(tag, BuildableKind::Misc, position, 0.0)
        }
    }
}

impl Buildable for BuildableRecord {
    fn buildable_type(&self) -> BuildableKind {
        self.kind
    }

    fn target_position(&self) -> WorldPos {
        self.position
    }

    fn orientation(&self) -> f32 {
        self.yaw
    }

    fn size(&self) -> Vec3 {
        self.size
    }

    fn center_offset(&self) -> Vec3 {
        self.center_offset
    }
}
