//! Per-room player state.

use glam::Vec3;
use protocol::packets::{PlayerState, PlayerSummary};
use protocol::{CellPos, ConnId, MAX_HEALTH, Weapon};

/// A player seated in a room.
#[derive(Debug, Clone)]
pub struct Player {
    /// Current connection id (changes on reconnection).
    pub id: ConnId,
    /// Client-generated persistent token, if presented.
    pub token: Option<String>,
    pub name: String,
    /// Authoritative eye position.
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub health: i32,
    pub alive: bool,
    pub score: u32,
    pub deaths: u32,
    pub weapon: Weapon,
    pub sprinting: bool,
    /// Personal progression level.
    pub level: u32,
    /// Set while standing in an exit that has already been handled.
    pub exit_triggered: bool,
}

impl Player {
    pub fn new(id: ConnId, name: String, token: Option<String>) -> Self {
        Self {
            id,
            token,
            name,
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            health: MAX_HEALTH,
            alive: true,
            score: 0,
            deaths: 0,
            weapon: Weapon::default(),
            sprinting: false,
            level: 0,
            exit_triggered: false,
        }
    }

    /// Cell under the player.
    pub fn cell(&self) -> Option<CellPos> {
        CellPos::containing(self.position.x, self.position.z)
    }

    /// Put the player at a cell centre with full health.
    pub fn place_at(&mut self, cell: CellPos) {
        self.position = cell.center();
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.health = MAX_HEALTH;
        self.alive = true;
        self.sprinting = false;
        self.exit_triggered = false;
    }

    /// Subtract damage, returning `true` if this hit was fatal.
    pub fn take_damage(&mut self, damage: i32) -> bool {
        if !self.alive {
            return false;
        }
        self.health = (self.health - damage.max(0)).max(0);
        if self.health == 0 {
            self.alive = false;
            self.deaths += 1;
            true
        } else {
            false
        }
    }

    /// Clear match progress (after a win).
    pub fn reset_match(&mut self) {
        self.score = 0;
        self.deaths = 0;
        self.health = MAX_HEALTH;
        self.alive = true;
        self.level = 0;
        self.exit_triggered = false;
        self.sprinting = false;
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }

    pub fn state(&self) -> PlayerState {
        PlayerState {
            id: self.id,
            name: self.name.clone(),
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            yaw: self.yaw,
            pitch: self.pitch,
            health: self.health,
            alive: self.alive,
            score: self.score,
            deaths: self.deaths,
            weapon: self.weapon,
            sprinting: self.sprinting,
            level: self.level,
        }
    }
}
