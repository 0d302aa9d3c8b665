//! Room Coordinates
//!
//! Signed room positions, the packed 64-bit room id shared with the
//! contract, the finer cell grid, and cardinal directions.
//!
//! ## Room id layout
//!
//! ```text
//!  63            32 31             0
//! ┌────────────────┬────────────────┐
//! │  y as u32      │  x as u32      │
//! └────────────────┴────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Packed room identifier.
pub type RoomId = u64;

/// Cells per room side in the cell-level model.
pub const CELLS_PER_ROOM: i32 = 3;

/// Pack a signed coordinate pair into a room id.
#[inline]
pub const fn encode(x: i32, y: i32) -> RoomId {
    (x as u32 as u64) | ((y as u32 as u64) << 32)
}

/// Unpack a room id into its signed coordinates.
#[inline]
pub const fn decode(id: RoomId) -> Position {
    Position {
        x: id as u32 as i32,
        y: (id >> 32) as u32 as i32,
    }
}

/// Coordinate parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    /// Key is not of the form `x,y`.
    #[error("malformed room key: {0:?}")]
    MalformedKey(String),

    /// A component is not a valid i32.
    #[error("invalid coordinate {0:?}")]
    InvalidNumber(String),
}

/// Room position in the infinite grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Column (east is positive).
    pub x: i32,
    /// Row (south is positive).
    pub y: i32,
}

impl Position {
    /// Create a position.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Packed room id.
    #[inline]
    pub const fn id(self) -> RoomId {
        encode(self.x, self.y)
    }

    /// Inverse of [`Position::id`].
    #[inline]
    pub const fn from_id(id: RoomId) -> Self {
        decode(id)
    }

    /// Canonical `x,y` string key.
    pub fn key(self) -> String {
        self.to_string()
    }

    /// Position shifted by a delta. Wraps at the i32 boundary like the
    /// contract's int32 arithmetic.
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.wrapping_add(dx), self.y.wrapping_add(dy))
    }

    /// Adjacent room in a direction.
    #[inline]
    pub const fn neighbor(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }

    /// Centre cell of this room.
    #[inline]
    pub const fn center_cell(self) -> CellPosition {
        CellPosition::new(self.x.wrapping_mul(CELLS_PER_ROOM), self.y.wrapping_mul(CELLS_PER_ROOM))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Position {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| CoordError::MalformedKey(s.to_string()))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| CoordError::InvalidNumber(part.to_string()))
        };
        Ok(Self::new(parse(x)?, parse(y)?))
    }
}

/// Cell inside the room grid. Each room spans a 3x3 block of cells
/// centred on `3 * room`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellPosition {
    /// Cell column.
    pub cx: i32,
    /// Cell row.
    pub cy: i32,
}

impl CellPosition {
    /// Create a cell position.
    #[inline]
    pub const fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }

    /// Cell shifted by a delta.
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.cx.wrapping_add(dx), self.cy.wrapping_add(dy))
    }
}

/// Room index of a cell coordinate: `floor((c + 1) / 3)`.
#[inline]
fn room_axis(c: i32) -> i32 {
    (c as i64 + 1).div_euclid(CELLS_PER_ROOM as i64) as i32
}

/// Anything that lives on a grid and belongs to exactly one room.
pub trait GridPosition: Copy {
    /// Raw grid coordinates, used for adjacency.
    fn grid_xy(&self) -> (i32, i32);

    /// Room containing this position.
    fn room(&self) -> Position;
}

impl GridPosition for Position {
    #[inline]
    fn grid_xy(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    #[inline]
    fn room(&self) -> Position {
        *self
    }
}

impl GridPosition for CellPosition {
    #[inline]
    fn grid_xy(&self) -> (i32, i32) {
        (self.cx, self.cy)
    }

    #[inline]
    fn room(&self) -> Position {
        Position::new(room_axis(self.cx), room_axis(self.cy))
    }
}

/// Cardinal direction. Discriminants match the contract's exit indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// y - 1
    North = 0,
    /// x + 1
    East = 1,
    /// y + 1
    South = 2,
    /// x - 1
    West = 3,
}

impl Direction {
    /// All directions in exit-index order.
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Exit index (0..4).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Direction from an exit index.
    #[inline]
    pub const fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Self::North),
            1 => Some(Self::East),
            2 => Some(Self::South),
            3 => Some(Self::West),
            _ => None,
        }
    }

    /// Facing direction.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Unit grid delta.
    #[inline]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

/// Direction of a unit axis-aligned step, `None` for anything else
/// (diagonal, distant or identical positions).
pub fn direction<P: GridPosition>(from: P, to: P) -> Option<Direction> {
    let (fx, fy) = from.grid_xy();
    let (tx, ty) = to.grid_xy();
    let dx = tx as i64 - fx as i64;
    let dy = ty as i64 - fy as i64;
    match (dx, dy) {
        (0, -1) => Some(Direction::North),
        (1, 0) => Some(Direction::East),
        (0, 1) => Some(Direction::South),
        (-1, 0) => Some(Direction::West),
        _ => None,
    }
}
