//! Integer block positions, continuous points, and the six block faces.
//!
//! Axis convention: `+y` is up, `-z` is north, `+x` is east. A block at
//! [`BlockPos`] `(x, y, z)` occupies the unit cube from `(x, y, z)` to
//! `(x + 1, y + 1, z + 1)`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Integer coordinates of a single block cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BlockPos {
    /// East-west coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// North-south coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Create a position from its three coordinates.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Return the position shifted by the given deltas.
    ///
    /// Saturates at the `i32` bounds instead of wrapping.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }

    /// Return the adjacent cell across `face`.
    pub const fn neighbor(self, face: Face) -> Self {
        let (dx, dy, dz) = face.offset();
        self.offset(dx, dy, dz)
    }

    /// Return the lower corner of the cell as a point.
    pub fn corner(self) -> Vec3 {
        Vec3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }

    /// Return the centre of the cell.
    pub fn center(self) -> Vec3 {
        self.corner().offset(0.5, 0.5, 0.5)
    }
}

impl core::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A continuous point or direction in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Vec3 {
    /// East-west component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
    /// North-south component.
    pub z: f64,
}

impl Vec3 {
    /// Create a point from its three components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Return the point shifted by the given deltas.
    pub const fn offset(self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Component-wise sum.
    pub const fn plus(self, other: Self) -> Self {
        self.offset(other.x, other.y, other.z)
    }

    /// Component-wise difference `self - other`.
    pub const fn minus(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Multiply every component by `factor`.
    pub const fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Dot product.
    pub fn dot(self, other: Self) -> f64 {
        self.z.mul_add(other.z, self.x.mul_add(other.x, self.y * other.y))
    }

    /// Squared euclidean distance to `other`.
    pub fn distance_squared(self, other: Self) -> f64 {
        let d = self.minus(other);
        d.dot(d)
    }

    /// Return the cell containing this point.
    #[allow(clippy::cast_possible_truncation)] // World coordinates stay far inside the i32 range.
    pub fn floored(self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }
}

/// One of the six faces of a block cell, named by the direction it points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Face {
    /// Points toward `-y`.
    Down,
    /// Points toward `+y`.
    Up,
    /// Points toward `-z`.
    North,
    /// Points toward `+z`.
    South,
    /// Points toward `-x`.
    West,
    /// Points toward `+x`.
    East,
}

impl Face {
    /// All faces, vertical first.
    pub const ALL: [Self; 6] = [
        Self::Down,
        Self::Up,
        Self::North,
        Self::South,
        Self::West,
        Self::East,
    ];

    /// The four horizontal faces.
    pub const HORIZONTAL: [Self; 4] = [Self::North, Self::South, Self::West, Self::East];

    /// Unit offset of the neighbouring cell across this face.
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Self::Down => (0, -1, 0),
            Self::Up => (0, 1, 0),
            Self::North => (0, 0, -1),
            Self::South => (0, 0, 1),
            Self::West => (-1, 0, 0),
            Self::East => (1, 0, 0),
        }
    }

    /// The face pointing the other way.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Down => Self::Up,
            Self::Up => Self::Down,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// Whether the face lies in the horizontal plane.
    pub const fn is_horizontal(self) -> bool {
        !matches!(self, Self::Down | Self::Up)
    }

    /// Unit normal vector.
    pub fn normal(self) -> Vec3 {
        let (x, y, z) = self.offset();
        Vec3::new(f64::from(x), f64::from(y), f64::from(z))
    }

    /// Lowercase name as used in block state properties (`"north"`, ...).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Up => "up",
            Self::North => "north",
            Self::South => "south",
            Self::West => "west",
            Self::East => "east",
        }
    }

    /// Parse a block state property value such as `"north"`.
    pub fn from_property(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|face| face.as_str() == value)
    }
}

impl core::fmt::Display for Face {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbor_follows_face_offset() {
        let origin = BlockPos::new(0, 64, 0);
        assert_eq!(origin.neighbor(Face::Down), BlockPos::new(0, 63, 0));
        assert_eq!(origin.neighbor(Face::North), BlockPos::new(0, 64, -1));
        assert_eq!(origin.neighbor(Face::East), BlockPos::new(1, 64, 0));
    }

    #[test]
    fn opposite_is_an_involution() {
        for face in Face::ALL {
            assert_eq!(face.opposite().opposite(), face);
            assert_ne!(face.opposite(), face);
        }
    }

    #[test]
    fn offset_saturates_at_bounds() {
        let edge = BlockPos::new(i32::MAX, 0, i32::MIN);
        assert_eq!(edge.offset(1, 0, -1), edge);
    }

    #[test]
    fn center_distance() {
        let pos = BlockPos::new(1, 0, 0);
        let d = pos.center().distance_squared(Vec3::new(0.5, 0.5, 0.5));
        assert!((d - 1.0).abs() < 1e-9);
    }

    #[test]
    fn floored_handles_negative_coordinates() {
        assert_eq!(Vec3::new(-0.5, 2.9, 3.0).floored(), BlockPos::new(-1, 2, 3));
    }

    #[test]
    fn face_property_roundtrip() {
        for face in Face::ALL {
            assert_eq!(Face::from_property(face.as_str()), Some(face));
        }
        assert_eq!(Face::from_property("sideways"), None);
    }
}
