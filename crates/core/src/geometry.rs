//! Block positions, faces, and axis-aligned boxes.
//!
//! Everything here is a small `Copy` value. Block positions order by
//! `(x, y, z)` so maps keyed by position iterate the same way every run.

use serde::{Deserialize, Serialize};

/// One of the six block faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// -Y
    Down,
    /// +Y
    Up,
    /// -Z
    North,
    /// +Z
    South,
    /// -X
    West,
    /// +X
    East,
}

impl Direction {
    /// All faces in stable order.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Horizontal faces in clockwise order starting at north.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// The face pointing the other way.
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    /// Unit offset `(dx, dy, dz)` for this face.
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }

    /// Whether this face lies in the horizontal plane.
    pub const fn is_horizontal(self) -> bool {
        !matches!(self, Direction::Down | Direction::Up)
    }

    /// Rotate a horizontal face clockwise (seen from above). Vertical faces are unchanged.
    pub const fn clockwise(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            other => other,
        }
    }

    /// Rotate a horizontal face counter-clockwise (seen from above).
    pub const fn counter_clockwise(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
            other => other,
        }
    }

    /// Canonical lowercase name used in configs and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Up => "up",
            Direction::North => "north",
            Direction::South => "south",
            Direction::West => "west",
            Direction::East => "east",
        }
    }
}

/// Integer block coordinates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct BlockPos {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Construct a position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Neighbouring position across `direction`.
    pub const fn relative(self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.offset();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Position directly above.
    pub const fn above(self) -> Self {
        self.relative(Direction::Up)
    }

    /// Position directly below.
    pub const fn below(self) -> Self {
        self.relative(Direction::Down)
    }

    /// Centre of the block in world space.
    pub fn center(self) -> Vec3 {
        Vec3::new(
            self.x as f64 + 0.5,
            self.y as f64 + 0.5,
            self.z as f64 + 0.5,
        )
    }

    /// Stable 64-bit hash of the coordinates, used to derive per-position seeds.
    pub fn seed_hash(self) -> u64 {
        let x = self.x as i64 as u64;
        let y = self.y as i64 as u64;
        let z = self.z as i64 as u64;
        x.wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ y.wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ z.wrapping_mul(0x1656_67B1_9E37_79F9)
    }
}

/// World-space point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Vec3 {
    /// Construct a point.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared distance to `other`.
    pub fn distance_sq(self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// Axis-aligned bounding box. Intersection is strict on every axis, so boxes
/// that merely touch do not intersect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Box from two corners.
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box of the given full extents centred on `center`.
    pub fn around(center: Vec3, width: f64, height: f64) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Self::new(
            Vec3::new(center.x - hw, center.y - hh, center.z - hw),
            Vec3::new(center.x + hw, center.y + hh, center.z + hw),
        )
    }

    /// Box standing on `feet` (entity convention: position is the bottom centre).
    pub fn standing(feet: Vec3, width: f64, height: f64) -> Self {
        let hw = width / 2.0;
        Self::new(
            Vec3::new(feet.x - hw, feet.y, feet.z - hw),
            Vec3::new(feet.x + hw, feet.y + height, feet.z + hw),
        )
    }

    /// The unit cube occupied by a block.
    pub fn block(pos: BlockPos) -> Self {
        Self::new(
            Vec3::new(pos.x as f64, pos.y as f64, pos.z as f64),
            Vec3::new(pos.x as f64 + 1.0, pos.y as f64 + 1.0, pos.z as f64 + 1.0),
        )
    }

    /// Shift by an offset.
    pub fn translate(self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(
            Vec3::new(self.min.x + dx, self.min.y + dy, self.min.z + dz),
            Vec3::new(self.max.x + dx, self.max.y + dy, self.max.z + dz),
        )
    }

    /// Strict overlap test.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Whether `point` lies inside (inclusive min, exclusive max).
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x < self.max.x
            && point.y >= self.min.y
            && point.y < self.max.y
            && point.z >= self.min.z
            && point.z < self.max.z
    }
}
