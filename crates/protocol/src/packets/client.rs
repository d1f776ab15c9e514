//! Client -> Server message parsing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::ProtocolError;
use crate::coerce::{self, de_bool, de_f32, de_opt_u32, de_string};

/// A lenient `{x, y, z}` input; missing or malformed components are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Vec3Input {
    #[serde(default, deserialize_with = "de_f32")]
    pub x: f32,
    #[serde(default, deserialize_with = "de_f32")]
    pub y: f32,
    #[serde(default, deserialize_with = "de_f32")]
    pub z: f32,
}

impl Vec3Input {
    pub fn to_vec3(self) -> glam::Vec3 {
        glam::Vec3::new(self.x, self.y, self.z)
    }
}

/// `createRoom` payload.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    #[serde(default, deserialize_with = "de_string")]
    pub name: String,
    #[serde(default, deserialize_with = "de_f32")]
    pub max_players: f32,
    #[serde(default, deserialize_with = "de_bool")]
    pub arena: bool,
}

/// `move` payload.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct MoveInput {
    #[serde(default, deserialize_with = "de_f32")]
    pub x: f32,
    #[serde(default, deserialize_with = "de_f32")]
    pub y: f32,
    #[serde(default, deserialize_with = "de_f32")]
    pub z: f32,
    #[serde(default, deserialize_with = "de_f32")]
    pub yaw: f32,
    #[serde(default, deserialize_with = "de_f32")]
    pub pitch: f32,
    #[serde(default, deserialize_with = "de_bool")]
    pub sprinting: bool,
}

impl MoveInput {
    pub fn position(&self) -> glam::Vec3 {
        glam::Vec3::new(self.x, self.y, self.z)
    }
}

/// `shoot` payload.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ShootInput {
    #[serde(default, deserialize_with = "de_vec3")]
    pub origin: Vec3Input,
    #[serde(default, deserialize_with = "de_vec3")]
    pub direction: Vec3Input,
    #[serde(default, deserialize_with = "de_string")]
    pub weapon: String,
}

/// `npcKill` payload. The enemy id is optional.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcKill {
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub enemy_id: Option<u32>,
}

/// Parsed client message.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    SetName(String),
    ListRooms,
    CreateRoom(CreateRoom),
    JoinRoom(String),
    LeaveRoom,
    UpdateWeapon(String),
    StartGame,
    Move(MoveInput),
    Shoot(ShootInput),
    PlayerReachedExit,
    NpcKill(NpcKill),
    BossKill,
}

impl ClientMessage {
    /// Parse a client message from a JSON text frame.
    ///
    /// Only the frame envelope can fail; payload fields are coerced.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut frame) = value else {
            return Err(ProtocolError::NotAnEvent);
        };
        let Some(Value::String(event)) = frame.remove("event") else {
            return Err(ProtocolError::NotAnEvent);
        };
        let data = frame.remove("data").unwrap_or(Value::Null);

        let message = match event.as_str() {
            "setName" => ClientMessage::SetName(scalar_or_field(&data, "name")),
            "listRooms" => ClientMessage::ListRooms,
            "createRoom" => ClientMessage::CreateRoom(payload(data)),
            "joinRoom" => ClientMessage::JoinRoom(scalar_or_field(&data, "roomId")),
            "leaveRoom" => ClientMessage::LeaveRoom,
            "updateWeapon" => ClientMessage::UpdateWeapon(scalar_or_field(&data, "weapon")),
            "startGame" => ClientMessage::StartGame,
            "move" => ClientMessage::Move(payload(data)),
            "shoot" => ClientMessage::Shoot(payload(data)),
            "playerReachedExit" => ClientMessage::PlayerReachedExit,
            "npcKill" => ClientMessage::NpcKill(payload(data)),
            "bossKill" => ClientMessage::BossKill,
            _ => return Err(ProtocolError::UnknownEvent(event)),
        };
        Ok(message)
    }

    /// Event name of this message.
    pub fn event(&self) -> &'static str {
        match self {
            ClientMessage::SetName(_) => "setName",
            ClientMessage::ListRooms => "listRooms",
            ClientMessage::CreateRoom(_) => "createRoom",
            ClientMessage::JoinRoom(_) => "joinRoom",
            ClientMessage::LeaveRoom => "leaveRoom",
            ClientMessage::UpdateWeapon(_) => "updateWeapon",
            ClientMessage::StartGame => "startGame",
            ClientMessage::Move(_) => "move",
            ClientMessage::Shoot(_) => "shoot",
            ClientMessage::PlayerReachedExit => "playerReachedExit",
            ClientMessage::NpcKill(_) => "npcKill",
            ClientMessage::BossKill => "bossKill",
        }
    }
}

/// Decode an object payload; anything else yields the default payload.
fn payload<T: DeserializeOwned + Default>(data: Value) -> T {
    if data.is_object() {
        serde_json::from_value(data).unwrap_or_default()
    } else {
        T::default()
    }
}

/// Single-argument events accept either the bare value or `{key: value}`.
fn scalar_or_field(data: &Value, key: &str) -> String {
    match data {
        Value::Object(map) => map.get(key).map(coerce::text).unwrap_or_default(),
        other => coerce::text(other),
    }
}

fn de_vec3<'de, D>(deserializer: D) -> Result<Vec3Input, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
