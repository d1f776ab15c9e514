//! Server -> Client message building.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Point3;
use crate::{CellPos, ConnId, Enemy, Maze, ProtocolError, RoomStatus, Weapon};

/// Lobby view of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: String,
    pub name: String,
    pub players: usize,
    pub max_players: usize,
    pub state: RoomStatus,
    pub arena: bool,
    pub creator_id: ConnId,
}

/// Id and display name of a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: ConnId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoined {
    pub room_id: String,
    pub room: RoomInfo,
    pub players: Vec<PlayerSummary>,
    pub is_creator: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLeft {
    pub id: ConnId,
}

/// Authoritative state of one player, as broadcast every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: ConnId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub health: i32,
    pub alive: bool,
    pub score: u32,
    pub deaths: u32,
    pub weapon: Weapon,
    pub sprinting: bool,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStarted {
    pub maze: Maze,
    pub start_cell: CellPos,
    pub exit_cell: CellPos,
    pub level: u32,
    pub players: BTreeMap<ConnId, PlayerState>,
}

/// Sent to a single player when they cross into their next level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelAdvanced {
    pub maze: Maze,
    pub start_cell: CellPos,
    pub exit_cell: CellPos,
    pub level: u32,
    pub enemies: Vec<Enemy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMoved {
    pub id: ConnId,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub sprinting: bool,
}

/// Visual shot event; implies no damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerShot {
    pub id: ConnId,
    pub origin: Point3,
    pub direction: Point3,
    pub weapon: Weapon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDamaged {
    pub health: i32,
    pub attacker_id: ConnId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitConfirmed {
    pub target_id: ConnId,
    pub damage: i32,
    pub target_health: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerKilled {
    pub killer_id: ConnId,
    pub killer_name: String,
    pub target_id: ConnId,
    pub target_name: String,
    pub killer_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRespawned {
    pub id: ConnId,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// One scoreboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub id: ConnId,
    pub name: String,
    pub score: u32,
    pub deaths: u32,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameWon {
    pub boss_killer_id: ConnId,
    pub boss_killer_name: String,
    pub winner_id: ConnId,
    pub winner_name: String,
    pub winner_score: u32,
    pub scoreboard: Vec<ScoreEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub players: BTreeMap<ConnId, PlayerState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyUpdate {
    pub level: u32,
    pub enemies: Vec<Enemy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

/// Server -> client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    RoomList(Vec<RoomInfo>),
    RoomJoined(RoomJoined),
    PlayerJoined(PlayerSummary),
    PlayerLeft(PlayerLeft),
    RoomUpdated(RoomInfo),
    GameStarted(GameStarted),
    PlayerLevelAdvanced(LevelAdvanced),
    PlayerMoved(PlayerMoved),
    PlayerShot(PlayerShot),
    PlayerDamaged(PlayerDamaged),
    HitConfirmed(HitConfirmed),
    PlayerKilled(PlayerKilled),
    PlayerRespawned(PlayerRespawned),
    PositionCorrection(Point3),
    GameWon(GameWon),
    GameState(GameSnapshot),
    EnemyUpdate(EnemyUpdate),
    Error(ErrorMessage),
}

impl ServerMessage {
    /// Build an `error` message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorMessage {
            message: message.into(),
        })
    }

    /// Encode as a JSON text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Event name of this message.
    pub fn event(&self) -> &'static str {
        match self {
            ServerMessage::RoomList(_) => "roomList",
            ServerMessage::RoomJoined(_) => "roomJoined",
            ServerMessage::PlayerJoined(_) => "playerJoined",
            ServerMessage::PlayerLeft(_) => "playerLeft",
            ServerMessage::RoomUpdated(_) => "roomUpdated",
            ServerMessage::GameStarted(_) => "gameStarted",
            ServerMessage::PlayerLevelAdvanced(_) => "playerLevelAdvanced",
            ServerMessage::PlayerMoved(_) => "playerMoved",
            ServerMessage::PlayerShot(_) => "playerShot",
            ServerMessage::PlayerDamaged(_) => "playerDamaged",
            ServerMessage::HitConfirmed(_) => "hitConfirmed",
            ServerMessage::PlayerKilled(_) => "playerKilled",
            ServerMessage::PlayerRespawned(_) => "playerRespawned",
            ServerMessage::PositionCorrection(_) => "positionCorrection",
            ServerMessage::GameWon(_) => "gameWon",
            ServerMessage::GameState(_) => "gameState",
            ServerMessage::EnemyUpdate(_) => "enemyUpdate",
            ServerMessage::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_event_names_match_serialized_tag() {
        let messages = [
            ServerMessage::error("nope"),
            ServerMessage::PlayerLeft(PlayerLeft { id: 3 }),
            ServerMessage::PositionCorrection(Point3 { x: 1.0, y: 2.0, z: 3.0 }),
            ServerMessage::RoomList(Vec::new()),
        ];
        for msg in messages {
            let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
            assert_eq!(value["event"], msg.event());
        }
    }

    #[test]
    fn test_hit_confirmed_wire_shape() {
        let msg = ServerMessage::HitConfirmed(HitConfirmed {
            target_id: 7,
            damage: 25,
            target_health: 75,
        });
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"event": "hitConfirmed", "data": {"targetId": 7, "damage": 25, "targetHealth": 75}})
        );
    }

    #[test]
    fn test_game_state_keys_are_player_ids() {
        let mut players = BTreeMap::new();
        players.insert(
            12,
            PlayerState {
                id: 12,
                name: "ana".into(),
                x: 2.0,
                y: 1.6,
                z: 2.0,
                yaw: 0.0,
                pitch: 0.0,
                health: 100,
                alive: true,
                score: 0,
                deaths: 0,
                weapon: Weapon::Shotgun,
                sprinting: false,
                level: 0,
            },
        );
        let msg = ServerMessage::GameState(GameSnapshot { players });
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["data"]["players"]["12"]["weapon"], "shotgun");
        assert_eq!(value["data"]["players"]["12"]["alive"], true);
    }
}
