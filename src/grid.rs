use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer coordinate of a cell in a regular voxel grid.
///
/// Ordering is lexicographic on (x, y, z), which is the order voxel records
/// are emitted in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct GridIndex {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl fmt::Display for GridIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for GridIndex {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self { x, y, z }
    }
}

impl GridIndex {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Cell containing `point` in a grid of cubes with edge `cell_size`
    /// anchored at the world origin. `None` when a coordinate is not finite
    /// or the cell lies outside the `i32` range.
    pub fn from_point(point: [f64; 3], cell_size: f64) -> Option<Self> {
        let axis = |p: f64| {
            let cell = (p / cell_size).floor();
            (cell.is_finite() && cell >= i32::MIN as f64 && cell <= i32::MAX as f64)
                .then_some(cell as i32)
        };
        Some(Self {
            x: axis(point[0])?,
            y: axis(point[1])?,
            z: axis(point[2])?,
        })
    }

    /// Enclosing cell of a grid `factor` times coarser (floor division).
    pub fn coarsen(self, factor: i32) -> Self {
        Self {
            x: self.x.div_euclid(factor),
            y: self.y.div_euclid(factor),
            z: self.z.div_euclid(factor),
        }
    }

    /// `self + (dx, dy, dz)`, or `None` past the edge of the `i32` grid.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
            z: self.z.checked_add(dz)?,
        })
    }

    pub fn neighbor(self, direction: Direction) -> Option<Self> {
        let (dx, dy, dz) = direction.offset();
        self.offset(dx, dy, dz)
    }

    pub fn to_f64(self) -> [f64; 3] {
        [self.x as f64, self.y as f64, self.z as f64]
    }
}

/// One of the six axis-aligned unit directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::PosX,
        Direction::NegX,
        Direction::PosY,
        Direction::NegY,
        Direction::PosZ,
        Direction::NegZ,
    ];

    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::PosX => (1, 0, 0),
            Direction::NegX => (-1, 0, 0),
            Direction::PosY => (0, 1, 0),
            Direction::NegY => (0, -1, 0),
            Direction::PosZ => (0, 0, 1),
            Direction::NegZ => (0, 0, -1),
        }
    }

    pub fn normal(self) -> [f64; 3] {
        let (x, y, z) = self.offset();
        [x as f64, y as f64, z as f64]
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::PosX => Direction::NegX,
            Direction::NegX => Direction::PosX,
            Direction::PosY => Direction::NegY,
            Direction::NegY => Direction::PosY,
            Direction::PosZ => Direction::NegZ,
            Direction::NegZ => Direction::PosZ,
        }
    }
}
