//! Shared protocol crate for mazerun.
//!
//! This crate contains:
//! - JSON event framing (`{"event": ..., "data": ...}`)
//! - Client and server message definitions
//! - Lenient coercion of client-supplied payload fields
//! - Shared data model types (maze grid, cells, weapons, player state)

pub mod coerce;
mod error;
pub mod packets;

use serde::{Deserialize, Serialize};

pub use error::ProtocolError;
pub use packets::{ClientMessage, ServerMessage};

/// World units per maze cell along both axes.
pub const CELL_SIZE: f32 = 4.0;
/// Full thickness of a rendered wall slab.
pub const WALL_THICKNESS: f32 = 0.2;
/// Height of a player's eye above the floor (the y of a player position).
pub const EYE_HEIGHT: f32 = 1.6;
/// Maximum health of a player.
pub const MAX_HEALTH: i32 = 100;

/// Connection id, also used as the player id on the wire.
pub type ConnId = u32;

/// Row/column address of a maze cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellPos {
    pub r: usize,
    pub c: usize,
}

impl CellPos {
    pub const fn new(r: usize, c: usize) -> Self {
        Self { r, c }
    }

    /// Manhattan distance between two cells.
    pub fn manhattan(self, other: CellPos) -> usize {
        self.r.abs_diff(other.r) + self.c.abs_diff(other.c)
    }

    /// World-space centre of the cell at eye height.
    pub fn center(self) -> glam::Vec3 {
        glam::Vec3::new(
            (self.c as f32 + 0.5) * CELL_SIZE,
            EYE_HEIGHT,
            (self.r as f32 + 0.5) * CELL_SIZE,
        )
    }

    /// Cell containing a world-space (x, z) point, if it is not negative.
    pub fn containing(x: f32, z: f32) -> Option<CellPos> {
        let c = (x / CELL_SIZE).floor();
        let r = (z / CELL_SIZE).floor();
        if c < 0.0 || r < 0.0 || !c.is_finite() || !r.is_finite() {
            return None;
        }
        Some(CellPos::new(r as usize, c as usize))
    }
}

/// One maze cell. Each flag is `true` when the wall on that side is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MazeCell {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

/// A rectangular grid of cells, row-major (`grid[r][c]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maze {
    pub grid: Vec<Vec<MazeCell>>,
    pub rows: usize,
    pub cols: usize,
}

impl Maze {
    /// A grid with every wall closed.
    pub fn closed(rows: usize, cols: usize) -> Self {
        Self {
            grid: vec![vec![MazeCell::default(); cols]; rows],
            rows,
            cols,
        }
    }

    #[inline]
    pub fn cell(&self, pos: CellPos) -> Option<&MazeCell> {
        self.grid.get(pos.r).and_then(|row| row.get(pos.c))
    }

    #[inline]
    pub fn cell_mut(&mut self, pos: CellPos) -> Option<&mut MazeCell> {
        self.grid.get_mut(pos.r).and_then(|row| row.get_mut(pos.c))
    }

    /// Total number of cells.
    pub fn area(&self) -> usize {
        self.rows * self.cols
    }

    /// The opposite corner from `(0, 0)`.
    pub fn far_corner(&self) -> CellPos {
        CellPos::new(self.rows.saturating_sub(1), self.cols.saturating_sub(1))
    }
}

/// Selectable weapons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weapon {
    #[default]
    Rifle,
    Pistol,
    Shotgun,
}

impl Weapon {
    /// Parse a weapon name, case-insensitively.
    pub fn parse(name: &str) -> Option<Weapon> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rifle" => Some(Weapon::Rifle),
            "pistol" => Some(Weapon::Pistol),
            "shotgun" => Some(Weapon::Shotgun),
            _ => None,
        }
    }
}

/// Room lifecycle state as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Playing,
}

/// Server-placed enemy, cached per player and level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub x: f32,
    pub z: f32,
    pub hp: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_center_and_containing_agree() {
        let cell = CellPos::new(3, 7);
        let center = cell.center();
        assert_eq!(CellPos::containing(center.x, center.z), Some(cell));
        assert_eq!(center.y, EYE_HEIGHT);
    }

    #[test]
    fn test_containing_rejects_negative() {
        assert_eq!(CellPos::containing(-0.01, 2.0), None);
        assert_eq!(CellPos::containing(2.0, -5.0), None);
    }

    #[test]
    fn test_manhattan() {
        assert_eq!(CellPos::new(0, 0).manhattan(CellPos::new(3, 4)), 7);
        assert_eq!(CellPos::new(5, 1).manhattan(CellPos::new(2, 6)), 8);
    }

    #[test]
    fn test_weapon_parse() {
        assert_eq!(Weapon::parse("Shotgun"), Some(Weapon::Shotgun));
        assert_eq!(Weapon::parse(" pistol "), Some(Weapon::Pistol));
        assert_eq!(Weapon::parse("railgun"), None);
    }
}
